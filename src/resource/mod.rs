//! # Resource Model
//!
//! The three kinds of records a run moves between a source and a target:
//!
//! - [`ApiResource`] - one API definition, classic or OpenAPI-wrapped
//! - [`PolicyResource`] - an access policy granting rights on APIs
//! - [`TemplateAsset`] - a named portal template blob
//!
//! Every component outside this module reads and writes identifiers only
//! through the [`SyncResource`] facade.

pub mod api;
pub mod asset;
pub mod identity;
pub mod policy;

pub use api::{ApiResource, ClassicApi, ExtensionInfo, ExtensionServer, GatewayExtension, OasApi};
pub use asset::TemplateAsset;
pub use identity::{KeyStrategy, TargetProfile};
pub use policy::{AccessDefinition, ApiLimit, PolicyResource};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a synced resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Api,
    Policy,
    Asset,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Api => "api",
            ResourceKind::Policy => "policy",
            ResourceKind::Asset => "asset",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity facade over every resource kind
///
/// Identifiers are plain strings; an empty string means "not set".
pub trait SyncResource: Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn external_id(&self) -> &str;
    fn set_external_id(&mut self, id: &str);
    fn internal_id(&self) -> &str;
    fn set_internal_id(&mut self, id: &str);
    fn org_id(&self) -> &str;
    fn set_org_id(&mut self, org_id: &str);
    fn display_name(&self) -> &str;
    fn tags(&self) -> &[String];

    /// Key of this resource under `strategy`, if it has one
    fn identity_key(&self, strategy: KeyStrategy) -> Option<String> {
        let key = match strategy {
            KeyStrategy::ExternalId => self.external_id(),
            KeyStrategy::InternalId => self.internal_id(),
            KeyStrategy::Slug | KeyStrategy::RouteDomain => return None,
        };
        non_empty(key)
    }

    /// Strategy order used when reconciling against a target of `profile`
    fn key_strategies(_profile: TargetProfile) -> &'static [KeyStrategy] {
        identity::ID_STRATEGIES
    }

    /// Every strategy this kind can be keyed by
    fn all_key_strategies() -> &'static [KeyStrategy] {
        identity::ID_STRATEGIES
    }

    /// Short label for logs: the best identifier available
    fn label(&self) -> String {
        [self.external_id(), self.internal_id(), self.display_name()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("<unidentified>")
            .to_string()
    }
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
