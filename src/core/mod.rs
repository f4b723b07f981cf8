pub mod etl;
pub mod pipeline;
pub mod transform;

pub use crate::domain::model::{DailyBar, DownloadTask, TransformResult};
pub use crate::domain::ports::{Pipeline, PriceProvider, Storage};
pub use crate::utils::error::Result;
