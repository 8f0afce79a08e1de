//! # Template Assets
//!
//! Named portal template blobs. The payload is opaque to the sync engine.

use super::{ResourceKind, SyncResource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateAsset {
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub internal_id: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub name: String,
    /// Template kind, e.g. `webhook` or `portal-page`
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl SyncResource for TemplateAsset {
    const KIND: ResourceKind = ResourceKind::Asset;

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
        &[]
    }
}
