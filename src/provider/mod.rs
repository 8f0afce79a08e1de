//! # Provider Modules
//!
//! Collaborators the sync engine talks to.
//!
//! - [`Getter`] reads desired state from a source (directory, repository clone)
//! - [`Publisher`] reads and writes live state on a target
//! - [`DirectoryDumper`] exports a target's live state as a readable source
//!
//! Both exchange the crate's own resource records; translating to and from a
//! target's wire format is the implementation's job.

use crate::error::{SyncError, SyncResult};
use crate::resource::{ApiResource, PolicyResource, TemplateAsset};
use async_trait::async_trait;
use std::fmt;

pub mod directory;
pub mod dry_run;
pub mod dump;
pub mod manifest;
pub mod memory;
pub mod publishable;

pub use directory::DirectoryGetter;
pub use dry_run::DryRunPublisher;
pub use dump::{DanglingReference, DirectoryDumper, DumpReport};
pub use manifest::{ApiFileRef, AssetFileRef, Manifest, ManifestKind, OasOverrides, PolicyFileRef};
pub use memory::{InMemoryPublisher, PublisherCall, StaticGetter};
pub use publishable::Publishable;

/// Which side of the product a publisher talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPlane {
    /// Management API storing full state, policies and assets included
    ControlPlane,
    /// Runtime API storing API definitions only; changes need a reload
    DataPlane,
}

impl TargetPlane {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlane::ControlPlane => "control-plane",
            TargetPlane::DataPlane => "data-plane",
        }
    }

    pub fn supports_policies(&self) -> bool {
        matches!(self, TargetPlane::ControlPlane)
    }
}

impl fmt::Display for TargetPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of desired state
///
/// Each fetch must be idempotent for the same manifest. The orchestrator
/// calls each method at most once per run.
#[async_trait]
pub trait Getter: Send + Sync {
    async fn fetch_manifest(&self) -> SyncResult<Manifest>;

    async fn fetch_api_resources(&self, manifest: &Manifest) -> SyncResult<Vec<ApiResource>>;

    async fn fetch_policies(&self, manifest: &Manifest) -> SyncResult<Vec<PolicyResource>>;

    async fn fetch_assets(&self, manifest: &Manifest) -> SyncResult<Vec<TemplateAsset>>;
}

/// Target of a sync
///
/// `create_*` and `update_*` return the stored records in input order. Policy
/// and asset calls default to [`SyncError::UnsupportedOperation`], which is
/// what a data-plane target keeps.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    fn plane(&self) -> TargetPlane;

    /// Org of the target's first configured user, if it has one
    async fn default_org_id(&self) -> SyncResult<Option<String>>;

    async fn list_apis(&self) -> SyncResult<Vec<ApiResource>>;

    async fn create_apis(&self, apis: Vec<ApiResource>) -> SyncResult<Vec<ApiResource>>;

    async fn update_apis(&self, apis: Vec<ApiResource>) -> SyncResult<Vec<ApiResource>>;

    async fn delete_api(&self, internal_id: &str) -> SyncResult<()>;

    async fn list_policies(&self) -> SyncResult<Vec<PolicyResource>> {
        Err(SyncError::unsupported("list policies", self.name()))
    }

    async fn create_policies(
        &self,
        _policies: Vec<PolicyResource>,
    ) -> SyncResult<Vec<PolicyResource>> {
        Err(SyncError::unsupported("create policies", self.name()))
    }

    async fn update_policies(
        &self,
        _policies: Vec<PolicyResource>,
    ) -> SyncResult<Vec<PolicyResource>> {
        Err(SyncError::unsupported("update policies", self.name()))
    }

    async fn delete_policy(&self, _internal_id: &str) -> SyncResult<()> {
        Err(SyncError::unsupported("delete policy", self.name()))
    }

    async fn list_assets(&self) -> SyncResult<Vec<TemplateAsset>> {
        Err(SyncError::unsupported("list assets", self.name()))
    }

    async fn create_assets(&self, _assets: Vec<TemplateAsset>) -> SyncResult<Vec<TemplateAsset>> {
        Err(SyncError::unsupported("create assets", self.name()))
    }

    async fn update_assets(&self, _assets: Vec<TemplateAsset>) -> SyncResult<Vec<TemplateAsset>> {
        Err(SyncError::unsupported("update assets", self.name()))
    }

    async fn delete_asset(&self, _internal_id: &str) -> SyncResult<()> {
        Err(SyncError::unsupported("delete asset", self.name()))
    }

    /// Make applied changes live. A no-op on control-plane targets.
    async fn reload(&self) -> SyncResult<()>;
}
