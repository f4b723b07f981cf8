// Domain layer: run model and the ports implemented by adapters.

pub mod model;
pub mod ports;
