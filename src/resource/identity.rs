//! # Identity Keys
//!
//! Key strategies used to match a desired resource with a live one, and the
//! target profiles that decide their order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One way of deriving a lookup key from a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategy {
    /// Caller-chosen, portable identifier
    ExternalId,
    /// Identifier assigned by the target datastore
    InternalId,
    /// Non-empty API slug
    Slug,
    /// `route_path + "-" + domain`, only when the route path is set
    RouteDomain,
}

impl KeyStrategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStrategy::ExternalId => "external-id",
            KeyStrategy::InternalId => "internal-id",
            KeyStrategy::Slug => "slug",
            KeyStrategy::RouteDomain => "route-domain",
        }
    }
}

impl fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API order for a single-tenant target
pub const API_STRATEGIES: &[KeyStrategy] = &[
    KeyStrategy::ExternalId,
    KeyStrategy::InternalId,
    KeyStrategy::Slug,
    KeyStrategy::RouteDomain,
];

/// API order for a multi-tenant cloud target, where IDs are not unique across tenants
pub const CLOUD_API_STRATEGIES: &[KeyStrategy] = &[KeyStrategy::Slug];

/// Policy and asset order
pub const ID_STRATEGIES: &[KeyStrategy] = &[KeyStrategy::ExternalId, KeyStrategy::InternalId];

/// Tenancy model of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetProfile {
    /// Dedicated dashboard or gateway
    #[default]
    Standard,
    /// Multi-tenant hosted dashboard
    Cloud,
}

impl TargetProfile {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetProfile::Standard => "standard",
            TargetProfile::Cloud => "cloud",
        }
    }

    /// Whether creates should re-assert caller-chosen external IDs by default
    ///
    /// Cloud targets own their identifiers, so the rename is recorded instead.
    #[must_use]
    pub fn retains_external_ids(&self) -> bool {
        matches!(self, TargetProfile::Standard)
    }
}

impl fmt::Display for TargetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "" => Ok(TargetProfile::Standard),
            "cloud" => Ok(TargetProfile::Cloud),
            other => Err(format!("unknown target profile '{other}'")),
        }
    }
}
