//! # Targeted Delete
//!
//! Removes APIs and policies named by ID from a target, outside of any sync
//! run. IDs match external or internal IDs, like selection does. Every ID is
//! resolved against live state before the first delete, so an unknown ID
//! fails the call with nothing removed.
//!
//! Policies go first, so no policy is left granting rights on a deleted API
//! if the API deletes fail. A data-plane target is reloaded once after its
//! APIs are gone.

use super::orchestrator::at;
use super::selector::{select, Requirement, SelectionCriteria};
use super::types::{Operation, SyncStage};
use crate::error::SyncResult;
use crate::provider::{Publishable, Publisher, TargetPlane};
use crate::resource::{ApiResource, PolicyResource, SyncResource};
use tracing::{debug, info, warn};

/// Labels of what a targeted delete removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub apis: Vec<String>,
    pub policies: Vec<String>,
    pub reloaded: bool,
}

impl DeleteReport {
    pub fn is_empty(&self) -> bool {
        self.apis.is_empty() && self.policies.is_empty()
    }
}

async fn list_if_wanted<T: Publishable>(
    publisher: &dyn Publisher,
    ids: &[String],
) -> SyncResult<Vec<T>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    T::list(publisher)
        .await
        .map_err(at(SyncStage::Reconciled, Operation::List, Some(T::KIND)))
}

async fn delete_all<T: Publishable>(publisher: &dyn Publisher, items: &[T]) -> SyncResult<Vec<String>> {
    let mut deleted = Vec::with_capacity(items.len());
    for item in items {
        debug!(kind = %T::KIND, internal_id = item.internal_id(), "Deleting");
        T::delete(publisher, item.internal_id())
            .await
            .map_err(at(SyncStage::Applied, Operation::Delete, Some(T::KIND)))?;
        deleted.push(item.label());
    }
    Ok(deleted)
}

/// Delete the APIs and policies whose external or internal ID is listed
pub async fn delete_by_id(
    publisher: &dyn Publisher,
    api_ids: &[String],
    policy_ids: &[String],
) -> SyncResult<DeleteReport> {
    if api_ids.is_empty() && policy_ids.is_empty() {
        warn!("No API or policy IDs given, nothing to delete");
        return Ok(DeleteReport::default());
    }

    let apis: Vec<ApiResource> = list_if_wanted(publisher, api_ids).await?;
    let policies: Vec<PolicyResource> = list_if_wanted(publisher, policy_ids).await?;
    let criteria = SelectionCriteria::default()
        .with_api_ids(api_ids.iter().cloned())
        .with_policy_ids(policy_ids.iter().cloned());
    let selection = select(apis, policies, &criteria, Requirement::Required)
        .await
        .map_err(at(SyncStage::Filtered, Operation::Select, None))?;

    let mut report = DeleteReport {
        policies: delete_all(publisher, &selection.policies).await?,
        ..Default::default()
    };
    report.apis = delete_all(publisher, &selection.apis).await?;

    if publisher.plane() == TargetPlane::DataPlane && !report.apis.is_empty() {
        publisher
            .reload()
            .await
            .map_err(at(SyncStage::Reloaded, Operation::Reload, None))?;
        report.reloaded = true;
    }

    info!(
        publisher = publisher.name(),
        apis = report.apis.len(),
        policies = report.policies.len(),
        reloaded = report.reloaded,
        "Deleted resources by ID"
    );
    Ok(report)
}
