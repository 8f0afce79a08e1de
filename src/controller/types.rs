//! # Types
//!
//! Core types shared by the orchestrator and the reconciliation steps.

use crate::resource::{ApiResource, PolicyResource, TemplateAsset};
use serde::Serialize;
use std::fmt;

/// How a run treats the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Full reconcile: creates, updates and deletes
    Sync,
    /// Direct create only, every candidate must be new
    Publish,
    /// Direct update only, every candidate must already exist
    Update,
}

impl SyncMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Sync => "sync",
            SyncMode::Publish => "publish",
            SyncMode::Update => "update",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run stages, in the only order a run may visit them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStage {
    Fetched,
    Filtered,
    OrgEnforced,
    Reconciled,
    Applied,
    Reloaded,
}

impl SyncStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::Fetched => "fetched",
            SyncStage::Filtered => "filtered",
            SyncStage::OrgEnforced => "org-enforced",
            SyncStage::Reconciled => "reconciled",
            SyncStage::Applied => "applied",
            SyncStage::Reloaded => "reloaded",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single kind of collaborator call, used for error reports and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Fetch,
    Select,
    ResolveOrg,
    List,
    Reconcile,
    Create,
    Update,
    Delete,
    Reload,
}

impl Operation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Fetch => "fetch",
            Operation::Select => "select",
            Operation::ResolveOrg => "resolve-org",
            Operation::List => "list",
            Operation::Reconcile => "reconcile",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Reload => "reload",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of one run, as produced by a Getter
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    pub apis: Vec<ApiResource>,
    pub policies: Vec<PolicyResource>,
    pub assets: Vec<TemplateAsset>,
}

impl DesiredState {
    pub fn is_empty(&self) -> bool {
        self.apis.is_empty() && self.policies.is_empty() && self.assets.is_empty()
    }
}
