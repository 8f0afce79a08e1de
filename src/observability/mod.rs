//! # Observability
//!
//! - `logging`: `tracing-subscriber` setup
//! - `metrics`: Prometheus metrics collection

pub mod logging;
pub mod metrics;

use crate::config::SyncConfig;
use anyhow::Result;

pub use logging::init_tracing;
pub use metrics::register_metrics;

/// Install the tracing subscriber, then register metrics when they are enabled
pub fn init_observability(config: &SyncConfig) -> Result<()> {
    init_tracing(config)?;
    if config.enable_metrics {
        register_metrics()?;
    }
    Ok(())
}
