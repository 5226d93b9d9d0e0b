pub mod config;
pub mod pool;
pub mod routing;
pub mod service;
pub mod telemetry;
