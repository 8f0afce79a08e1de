//! # Dry-Run Publisher
//!
//! A target that stores nothing. Each call is logged and echoed back, and the
//! live state is always empty, so a sync against it reports what a first
//! deployment would create.

use super::{Publisher, TargetPlane};
use crate::error::{SyncError, SyncResult};
use crate::resource::{ApiResource, PolicyResource, SyncResource, TemplateAsset};
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DryRunPublisher {
    plane: TargetPlane,
    default_org: Option<String>,
}

impl Default for DryRunPublisher {
    fn default() -> Self {
        Self {
            plane: TargetPlane::ControlPlane,
            default_org: None,
        }
    }
}

impl DryRunPublisher {
    pub fn new(plane: TargetPlane) -> Self {
        Self {
            plane,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_default_org(mut self, org_id: impl Into<String>) -> Self {
        self.default_org = Some(org_id.into());
        self
    }

    /// Policies and assets exist on control planes only
    fn ensure_control_plane(&self, operation: &str) -> SyncResult<()> {
        if self.plane.supports_policies() {
            Ok(())
        } else {
            Err(SyncError::unsupported(operation, self.name()))
        }
    }

    fn echo<T: SyncResource>(&self, operation: &str, items: Vec<T>) -> Vec<T> {
        for item in &items {
            info!(
                publisher = self.name(),
                kind = %T::KIND,
                resource = %item.label(),
                "[dry-run] would {operation}"
            );
        }
        items
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn plane(&self) -> TargetPlane {
        self.plane
    }

    async fn default_org_id(&self) -> SyncResult<Option<String>> {
        Ok(self.default_org.clone())
    }

    async fn list_apis(&self) -> SyncResult<Vec<ApiResource>> {
        Ok(Vec::new())
    }

    async fn create_apis(&self, apis: Vec<ApiResource>) -> SyncResult<Vec<ApiResource>> {
        Ok(self.echo("create", apis))
    }

    async fn update_apis(&self, apis: Vec<ApiResource>) -> SyncResult<Vec<ApiResource>> {
        Ok(self.echo("update", apis))
    }

    async fn delete_api(&self, internal_id: &str) -> SyncResult<()> {
        info!(internal_id, "[dry-run] would delete api");
        Ok(())
    }

    async fn list_policies(&self) -> SyncResult<Vec<PolicyResource>> {
        self.ensure_control_plane("list policies")?;
        Ok(Vec::new())
    }

    async fn create_policies(
        &self,
        policies: Vec<PolicyResource>,
    ) -> SyncResult<Vec<PolicyResource>> {
        self.ensure_control_plane("create policies")?;
        Ok(self.echo("create", policies))
    }

    async fn update_policies(
        &self,
        policies: Vec<PolicyResource>,
    ) -> SyncResult<Vec<PolicyResource>> {
        self.ensure_control_plane("update policies")?;
        Ok(self.echo("update", policies))
    }

    async fn delete_policy(&self, internal_id: &str) -> SyncResult<()> {
        self.ensure_control_plane("delete policy")?;
        info!(internal_id, "[dry-run] would delete policy");
        Ok(())
    }

    async fn list_assets(&self) -> SyncResult<Vec<TemplateAsset>> {
        self.ensure_control_plane("list assets")?;
        Ok(Vec::new())
    }

    async fn create_assets(&self, assets: Vec<TemplateAsset>) -> SyncResult<Vec<TemplateAsset>> {
        self.ensure_control_plane("create assets")?;
        Ok(self.echo("create", assets))
    }

    async fn update_assets(&self, assets: Vec<TemplateAsset>) -> SyncResult<Vec<TemplateAsset>> {
        self.ensure_control_plane("update assets")?;
        Ok(self.echo("update", assets))
    }

    async fn delete_asset(&self, internal_id: &str) -> SyncResult<()> {
        self.ensure_control_plane("delete asset")?;
        info!(internal_id, "[dry-run] would delete asset");
        Ok(())
    }

    async fn reload(&self) -> SyncResult<()> {
        info!("[dry-run] would reload {}", self.plane);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{SyncMode, SyncOptions, SyncOrchestrator, SyncStage};
    use crate::provider::StaticGetter;
    use crate::resource::ClassicApi;
    use std::sync::Arc;

    fn getter() -> Arc<StaticGetter> {
        Arc::new(StaticGetter::new(
            vec![ApiResource::Classic(ClassicApi {
                external_id: "a1".to_string(),
                ..Default::default()
            })],
            vec![PolicyResource {
                external_id: "p1".to_string(),
                ..Default::default()
            }],
            Vec::new(),
        ))
    }

    #[tokio::test]
    async fn test_sync_reports_a_first_deployment() {
        let publisher = DryRunPublisher::default().with_default_org("org1");
        let orchestrator = SyncOrchestrator::new(
            getter(),
            Arc::new(publisher),
            SyncOptions::new(SyncMode::Sync),
        );

        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.org_id, "org1");
        assert_eq!(report.apis.created, 1);
        assert_eq!(report.policies.created, 1);
        assert_eq!(report.apis.deleted, 0);
    }

    #[tokio::test]
    async fn test_data_plane_dry_run_still_reaches_reload() {
        let orchestrator = SyncOrchestrator::new(
            getter(),
            Arc::new(DryRunPublisher::new(TargetPlane::DataPlane)),
            SyncOptions::new(SyncMode::Publish),
        );

        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.stages.last(), Some(&SyncStage::Reloaded));
        assert_eq!(report.policies.created, 0);
    }

    #[tokio::test]
    async fn test_data_plane_refuses_policy_and_asset_calls() {
        let publisher = DryRunPublisher::new(TargetPlane::DataPlane);

        let err = publisher
            .create_policies(vec![PolicyResource::default()])
            .await
            .unwrap_err();
        match err {
            SyncError::UnsupportedOperation { operation, target } => {
                assert_eq!(operation, "create policies");
                assert_eq!(target, "dry-run");
            }
            other => panic!("expected UnsupportedOperation, got {other:?}"),
        }
        assert!(publisher.list_assets().await.is_err());
        assert!(publisher.delete_policy("int-1").await.is_err());
        assert!(publisher.list_apis().await.is_ok());
    }
}
