//! # Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence;
//! otherwise the configured level applies to this crate only.

use crate::config::SyncConfig;
use crate::constants::LOG_TARGET;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set, e.g. `gateway_sync=info`
pub fn default_directive(log_level: &str) -> String {
    format!("{LOG_TARGET}={}", log_level.trim().to_lowercase())
}

/// Install a text or JSON subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &SyncConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_lowercases_level() {
        assert_eq!(default_directive("DEBUG"), "gateway_sync=debug");
        assert_eq!(default_directive(" warn "), "gateway_sync=warn");
    }
}
