//! # Directory Dumper
//!
//! Exports live state from a control-plane target into a directory that a
//! [`DirectoryGetter`](super::DirectoryGetter) reads back: one JSON file per
//! resource and a manifest listing them.
//!
//! File names follow the resource shape and identifier: `api-<id>.json` for
//! classic APIs, `oas-<id>.json` for OAS APIs, `policy-<id>.json` and
//! `asset-<id>.json`. When some but not all APIs are OAS, the manifest keeps
//! the classic type and marks the OAS entries individually.
//!
//! Selection criteria narrow APIs and policies the way a selective sync does.
//! Assets are exported only by an unfiltered dump. References that point out
//! of the export are reported as [`DanglingReference`]s and logged; they do
//! not stop it.

use super::manifest::{ApiFileRef, AssetFileRef, Manifest, ManifestKind, PolicyFileRef};
use super::Publisher;
use crate::constants::DEFAULT_MANIFEST_FILE;
use crate::controller::selector::{select, Requirement, SelectionCriteria};
use crate::error::{SyncError, SyncResult};
use crate::resource::{ApiResource, PolicyResource, SyncResource};
use anyhow::Context;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A reference from an exported resource to one left out of the export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DanglingReference {
    /// A policy grants rights on an API that was not exported
    PolicyApi { policy: String, api: String },
    /// An API binds an OpenID Connect client to a policy that was not exported
    OidcPolicy { api: String, policy: String },
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DanglingReference::PolicyApi { policy, api } => {
                write!(f, "policy '{policy}' grants access to API '{api}' which was not exported")
            }
            DanglingReference::OidcPolicy { api, policy } => {
                write!(f, "API '{api}' maps an OIDC client to policy '{policy}' which was not exported")
            }
        }
    }
}

/// What a dump wrote
#[derive(Debug, Clone)]
pub struct DumpReport {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub dangling: Vec<DanglingReference>,
}

#[derive(Debug, Clone)]
pub struct DirectoryDumper {
    root: PathBuf,
    manifest_file: String,
}

impl DirectoryDumper {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
        }
    }

    /// Write the manifest under a name other than the default
    #[must_use]
    pub fn with_manifest_file(mut self, manifest_file: impl Into<String>) -> Self {
        self.manifest_file = manifest_file.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Export the live state of `publisher` selected by `criteria`
    ///
    /// Fails with `SelectionEmpty` when a criterion value matches nothing,
    /// before any file is written.
    pub async fn dump(
        &self,
        publisher: &dyn Publisher,
        criteria: &SelectionCriteria,
    ) -> SyncResult<DumpReport> {
        if !publisher.plane().supports_policies() {
            return Err(SyncError::unsupported("dump", publisher.name()));
        }

        let apis = publisher.list_apis().await?;
        let policies = publisher.list_policies().await?;
        let assets = if criteria.is_empty() {
            publisher.list_assets().await?
        } else {
            Vec::new()
        };
        let selection = select(apis, policies, criteria, Requirement::Required).await?;
        let apis = selection.apis;
        let policies: Vec<PolicyResource> =
            selection.policies.into_iter().map(with_retained_id).collect();

        let dangling = dangling_references(&apis, &policies);
        for reference in &dangling {
            warn!(%reference, "Export references a resource that was left out");
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create dump directory: {}", self.root.display()))?;

        let all_oas = !apis.is_empty() && apis.iter().all(ApiResource::is_oas);
        let mut manifest = Manifest {
            kind: if all_oas {
                ManifestKind::Oas
            } else {
                ManifestKind::Classic
            },
            ..Default::default()
        };

        for (position, api) in apis.iter().enumerate() {
            let prefix = if api.is_oas() { "oas" } else { "api" };
            let file = file_name(prefix, api, position);
            self.write_json(&file, api).await?;
            manifest.apis.push(ApiFileRef {
                file,
                kind: (api.is_oas() && !all_oas).then_some(ManifestKind::Oas),
                ..Default::default()
            });
        }
        for (position, policy) in policies.iter().enumerate() {
            let file = file_name("policy", policy, position);
            self.write_json(&file, policy).await?;
            manifest.policies.push(PolicyFileRef {
                file,
                ..Default::default()
            });
        }
        for (position, asset) in assets.iter().enumerate() {
            let file = file_name("asset", asset, position);
            self.write_json(&file, asset).await?;
            manifest.assets.push(AssetFileRef { file });
        }

        self.write_json(&self.manifest_file, &manifest).await?;
        let manifest_path = self.root.join(&self.manifest_file);
        info!(
            apis = manifest.apis.len(),
            policies = manifest.policies.len(),
            assets = manifest.assets.len(),
            dangling = dangling.len(),
            "Dumped {} to {}",
            publisher.name(),
            self.root.display()
        );

        Ok(DumpReport {
            manifest,
            manifest_path,
            dangling,
        })
    }

    async fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> SyncResult<()> {
        let path = self.root.join(file);
        let content = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize: {file}"))?;
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write: {}", path.display()))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Stored policies without an external ID are exported under their internal one
fn with_retained_id(mut policy: PolicyResource) -> PolicyResource {
    if policy.external_id.is_empty() {
        policy.external_id = policy.internal_id.clone();
    }
    policy
}

fn file_name<T: SyncResource>(prefix: &str, resource: &T, position: usize) -> String {
    let id = [resource.external_id(), resource.internal_id()]
        .into_iter()
        .find(|id| !id.is_empty());
    let stem: String = match id {
        Some(id) => id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect(),
        None => position.to_string(),
    };
    format!("{prefix}-{stem}.json")
}

fn has_id<T: SyncResource>(resources: &[T], id: &str) -> bool {
    resources
        .iter()
        .any(|r| r.external_id() == id || r.internal_id() == id)
}

/// References from the exported resources to ones outside the export
pub fn dangling_references(
    apis: &[ApiResource],
    policies: &[PolicyResource],
) -> Vec<DanglingReference> {
    let mut dangling = Vec::new();
    for policy in policies {
        for api_id in policy.access_rights.keys() {
            if !has_id(apis, api_id) {
                dangling.push(DanglingReference::PolicyApi {
                    policy: policy.label(),
                    api: api_id.clone(),
                });
            }
        }
    }
    for api in apis {
        for policy_id in api.oidc_policy_ids() {
            if !has_id(policies, &policy_id) {
                dangling.push(DanglingReference::OidcPolicy {
                    api: api.label(),
                    policy: policy_id,
                });
            }
        }
    }
    dangling
}
