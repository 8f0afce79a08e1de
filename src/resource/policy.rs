//! # Policy Resources
//!
//! Access policies grant rights on APIs. `access_rights` is keyed by the
//! external ID of the API it refers to, which makes it the one cross-entity
//! reference in the model: when a target renames an API on create, the keys
//! here must follow (see [`crate::controller::fixup`]).

use super::{ResourceKind, SyncResource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Per-API rate and quota limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiLimit {
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub per: f64,
    #[serde(default)]
    pub throttle_interval: f64,
    #[serde(default)]
    pub throttle_retry_limit: i64,
    #[serde(default)]
    pub max_query_depth: i64,
    #[serde(default)]
    pub quota_max: i64,
    #[serde(default)]
    pub quota_renews: i64,
    #[serde(default)]
    pub quota_remaining: i64,
    #[serde(default)]
    pub quota_renewal_rate: i64,
}

/// Rights granted on one API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessDefinition {
    #[serde(default)]
    pub api_id: String,
    #[serde(default)]
    pub api_name: String,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<ApiLimit>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyResource {
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub internal_id: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// API external ID to the rights granted on it
    #[serde(default)]
    pub access_rights: BTreeMap<String, AccessDefinition>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PolicyResource {
    pub fn references_api(&self, api_external_id: &str) -> bool {
        self.access_rights.contains_key(api_external_id)
    }

    /// Re-key every access right whose API ID `rename` maps to a new one.
    ///
    /// All keys move in one pass, so chained or swapped renames never
    /// overwrite each other. Returns the number of rights that moved.
    pub fn rename_api_references<'a, F>(&mut self, rename: F) -> usize
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        if !self.access_rights.keys().any(|api_id| rename(api_id).is_some()) {
            return 0;
        }
        let (renamed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.access_rights)
            .into_iter()
            .partition(|(api_id, _)| rename(api_id).is_some());
        // A renamed right replaces a stale one already held under its new ID
        let mut rights: BTreeMap<String, AccessDefinition> = kept.into_iter().collect();
        let moved = renamed.len();
        for (api_id, mut definition) in renamed {
            let Some(new) = rename(&api_id) else {
                continue;
            };
            if definition.api_id.is_empty() || definition.api_id == api_id {
                definition.api_id = new.to_string();
            }
            rights.insert(new.to_string(), definition);
        }
        self.access_rights = rights;
        moved
    }
}

impl SyncResource for PolicyResource {
    const KIND: ResourceKind = ResourceKind::Policy;

    fn external_id(&self) -> &str {
        &self.external_id
    }

    fn set_external_id(&mut self, id: &str) {
        self.external_id = id.to_string();
    }

    fn internal_id(&self) -> &str {
        &self.internal_id
    }

    fn set_internal_id(&mut self, id: &str) {
        self.internal_id = id.to_string();
    }

    fn org_id(&self) -> &str {
        &self.org_id
    }

    fn set_org_id(&mut self, org_id: &str) {
        self.org_id = org_id.to_string();
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}
