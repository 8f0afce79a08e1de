//! # Constants
//!
//! Shared constants used throughout the sync engine.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default manifest file name looked up at the root of a source directory
pub const DEFAULT_MANIFEST_FILE: &str = ".gateway-sync.json";

/// Prefix of synthetic identity keys handed to resources that carry no key
pub const TEMP_KEY_PREFIX: &str = "temp-";

/// Marker introducing a category token in a classic API name
pub const CATEGORY_MARKER: char = '#';

/// Prefix for internal IDs handed out by the in-memory publisher
pub const IN_MEMORY_INTERNAL_ID_PREFIX: &str = "int-";

/// Default log level when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Default log format (json, text)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Tracing target used as the fallback `EnvFilter` directive
pub const LOG_TARGET: &str = "gateway_sync";

/// Histogram buckets for whole-run duration (seconds)
pub const RUN_DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];
