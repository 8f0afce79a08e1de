//! # Sync Configuration
//!
//! Run-level settings loaded from environment variables.

use crate::constants::{DEFAULT_LOG_FORMAT, DEFAULT_LOG_LEVEL, DEFAULT_MANIFEST_FILE};
use crate::controller::orchestrator::SyncOptions;
use crate::controller::selector::SelectionCriteria;
use crate::controller::types::SyncMode;
use crate::resource::TargetProfile;
use tracing::warn;

/// Sync configuration
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Org written to every resource; empty means the target's default
    pub org_id: String,
    /// Target flavour (`standard` or `cloud`)
    pub target_profile: TargetProfile,
    /// Re-assert caller-chosen external IDs after create
    pub retain_external_ids: bool,
    /// Manifest file name relative to the source root
    pub manifest_file: String,
    /// Log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let target_profile = TargetProfile::default();
        Self {
            org_id: String::new(),
            target_profile,
            retain_external_ids: target_profile.retains_external_ids(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            enable_metrics: true,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let target_profile = env_var_or_default("GATEWAY_SYNC_TARGET", TargetProfile::default());
        Self {
            org_id: env_var_or_default_str("GATEWAY_SYNC_ORG_ID", ""),
            target_profile,
            // The default follows the profile: hosted targets reassign IDs
            retain_external_ids: env_var_or_default_bool(
                "GATEWAY_SYNC_RETAIN_EXTERNAL_IDS",
                target_profile.retains_external_ids(),
            ),
            manifest_file: env_var_or_default_str("GATEWAY_SYNC_MANIFEST_FILE", DEFAULT_MANIFEST_FILE),
            log_level: env_var_or_default_str("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            log_format: env_var_or_default_str("LOG_FORMAT", DEFAULT_LOG_FORMAT),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", true),
        }
    }

    /// Orchestrator options for one run
    pub fn sync_options(&self, mode: SyncMode, criteria: SelectionCriteria) -> SyncOptions {
        SyncOptions::new(mode)
            .with_org_id(self.org_id.clone())
            .with_profile(self.target_profile)
            .with_retain_external_ids(self.retain_external_ids)
            .with_metrics(self.enable_metrics)
            .with_criteria(criteria)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|e| {
            warn!(key, value = %value, error = ?e, "Invalid environment value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
