//! # Publishable
//!
//! Routes the generic apply steps to the per-kind [`Publisher`] methods.

use super::Publisher;
use crate::error::SyncResult;
use crate::resource::{ApiResource, PolicyResource, SyncResource, TemplateAsset};
use async_trait::async_trait;

#[async_trait]
pub trait Publishable: SyncResource {
    async fn list(publisher: &dyn Publisher) -> SyncResult<Vec<Self>>;

    async fn create(publisher: &dyn Publisher, items: Vec<Self>) -> SyncResult<Vec<Self>>;

    async fn update(publisher: &dyn Publisher, items: Vec<Self>) -> SyncResult<Vec<Self>>;

    async fn delete(publisher: &dyn Publisher, internal_id: &str) -> SyncResult<()>;
}

#[async_trait]
impl Publishable for ApiResource {
    async fn list(publisher: &dyn Publisher) -> SyncResult<Vec<Self>> {
        publisher.list_apis().await
    }

    async fn create(publisher: &dyn Publisher, items: Vec<Self>) -> SyncResult<Vec<Self>> {
        publisher.create_apis(items).await
    }

    async fn update(publisher: &dyn Publisher, items: Vec<Self>) -> SyncResult<Vec<Self>> {
        publisher.update_apis(items).await
    }

    async fn delete(publisher: &dyn Publisher, internal_id: &str) -> SyncResult<()> {
        publisher.delete_api(internal_id).await
    }
}

#[async_trait]
impl Publishable for PolicyResource {
    async fn list(publisher: &dyn Publisher) -> SyncResult<Vec<Self>> {
        publisher.list_policies().await
    }

    async fn create(publisher: &dyn Publisher, items: Vec<Self>) -> SyncResult<Vec<Self>> {
        publisher.create_policies(items).await
    }

    async fn update(publisher: &dyn Publisher, items: Vec<Self>) -> SyncResult<Vec<Self>> {
        publisher.update_policies(items).await
    }

    async fn delete(publisher: &dyn Publisher, internal_id: &str) -> SyncResult<()> {
        publisher.delete_policy(internal_id).await
    }
}

#[async_trait]
impl Publishable for TemplateAsset {
    async fn list(publisher: &dyn Publisher) -> SyncResult<Vec<Self>> {
        publisher.list_assets().await
    }

    async fn create(publisher: &dyn Publisher, items: Vec<Self>) -> SyncResult<Vec<Self>> {
        publisher.create_assets(items).await
    }

    async fn update(publisher: &dyn Publisher, items: Vec<Self>) -> SyncResult<Vec<Self>> {
        publisher.update_assets(items).await
    }

    async fn delete(publisher: &dyn Publisher, internal_id: &str) -> SyncResult<()> {
        publisher.delete_asset(internal_id).await
    }
}
