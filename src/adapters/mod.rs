// Adapters layer: concrete implementations of the domain ports.

pub mod storage;
pub mod yahoo;

pub use storage::LocalStorage;
pub use yahoo::YahooChartProvider;
