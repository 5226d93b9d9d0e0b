//! Telemetry wiring for the server binary.
//!
//! Structured logs go to stdout through `tracing-subscriber`. The filter
//! comes from `RUST_LOG`, defaulting to `info`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
