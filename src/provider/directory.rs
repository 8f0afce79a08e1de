//! # Directory Getter
//!
//! Reads desired state from a checked-out directory: a manifest at the root
//! and the JSON or YAML files it lists. Only the listed files are read.

use super::manifest::{Manifest, ManifestKind};
use super::Getter;
use crate::constants::DEFAULT_MANIFEST_FILE;
use crate::error::{SyncError, SyncResult};
use crate::resource::{ApiResource, PolicyResource, TemplateAsset};
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct DirectoryGetter {
    root: PathBuf,
    manifest_file: String,
}

impl DirectoryGetter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
        }
    }

    /// Use a manifest file name other than the default
    #[must_use]
    pub fn with_manifest_file(mut self, manifest_file: impl Into<String>) -> Self {
        self.manifest_file = manifest_file.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a manifest reference inside the root directory
    fn resolve(&self, file: &str) -> SyncResult<PathBuf> {
        let relative = Path::new(file);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(SyncError::integrity(format!(
                "file reference '{file}' must be a relative path inside the source"
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn read_document(&self, file: &str) -> SyncResult<Value> {
        let path = self.resolve(file)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SyncError::integrity(format!(
                    "referenced file '{file}' does not exist"
                )));
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read: {}", path.display()))
                    .into());
            }
        };
        debug!("Read source file: {}", path.display());
        parse_document(&path, &content)
    }

    async fn read_as<T: DeserializeOwned>(&self, file: &str) -> SyncResult<T> {
        let value = self.read_document(file).await?;
        serde_json::from_value(value)
            .with_context(|| format!("Failed to parse: {file}"))
            .map_err(SyncError::from)
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

fn parse_document(path: &Path, content: &str) -> SyncResult<Value> {
    let parsed = if is_yaml(path) {
        serde_yaml::from_str::<Value>(content).context("Failed to parse YAML")
    } else {
        serde_json::from_str::<Value>(content).context("Failed to parse JSON")
    };
    parsed
        .with_context(|| format!("Invalid document: {}", path.display()))
        .map_err(SyncError::from)
}

#[async_trait]
impl Getter for DirectoryGetter {
    async fn fetch_manifest(&self) -> SyncResult<Manifest> {
        let value = self.read_document(&self.manifest_file).await?;
        let manifest: Manifest = serde_json::from_value(value)
            .with_context(|| format!("Failed to parse manifest: {}", self.manifest_file))?;
        manifest.validate()?;
        info!(
            apis = manifest.apis.len(),
            policies = manifest.policies.len(),
            assets = manifest.assets.len(),
            "Loaded manifest from {}",
            self.root.display()
        );
        Ok(manifest)
    }

    async fn fetch_api_resources(&self, manifest: &Manifest) -> SyncResult<Vec<ApiResource>> {
        let mut apis = Vec::with_capacity(manifest.apis.len());
        for entry in &manifest.apis {
            let value = self.read_document(&entry.file).await?;
            let kind = entry.kind_or(manifest.kind);
            let parsed = match kind {
                ManifestKind::Classic => ApiResource::classic_from_value(value),
                ManifestKind::Oas => ApiResource::oas_from_value(value),
            };
            let mut api = parsed.with_context(|| format!("Failed to parse API: {}", entry.file))?;
            entry.apply_overrides(&mut api);
            if kind == ManifestKind::Oas {
                entry.apply_oas_overrides(&mut api);
            }
            apis.push(api);
        }
        Ok(apis)
    }

    async fn fetch_policies(&self, manifest: &Manifest) -> SyncResult<Vec<PolicyResource>> {
        let mut policies = Vec::with_capacity(manifest.policies.len());
        for entry in &manifest.policies {
            let mut policy: PolicyResource = self.read_as(&entry.file).await?;
            entry.apply_overrides(&mut policy);
            policies.push(policy);
        }
        Ok(policies)
    }

    async fn fetch_assets(&self, manifest: &Manifest) -> SyncResult<Vec<TemplateAsset>> {
        let mut assets = Vec::with_capacity(manifest.assets.len());
        for entry in &manifest.assets {
            assets.push(self.read_as(&entry.file).await?);
        }
        Ok(assets)
    }
}
