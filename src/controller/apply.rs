//! # Apply
//!
//! Sends a [`ReconcilePlan`] to a publisher: every delete, then one batch
//! update, then one batch create. Calls are strictly sequential.
//!
//! ## Pinned external IDs
//!
//! A target may hand back a different external ID than the one it was given
//! on create. With `retain_external_ids` the original ID is re-asserted by an
//! immediate follow-up update. Without it the new ID is kept and the change
//! is recorded in the returned [`IdRenames`].

use super::fixup::IdRenames;
use super::reconciler::ReconcilePlan;
use super::types::{Operation, SyncStage};
use crate::error::{SyncError, SyncResult};
use crate::provider::{Publishable, Publisher};
use crate::resource::SyncResource;
use tracing::{debug, info};

/// Records returned by a batch create, plus any renames it caused
#[derive(Debug, Clone)]
pub struct CreateOutcome<T> {
    pub records: Vec<T>,
    pub renames: IdRenames,
    /// Number of follow-up updates issued to restore pinned IDs
    pub reasserted: usize,
}

/// Result of applying a plan for one kind
#[derive(Debug, Clone)]
pub struct AppliedKind<T> {
    pub created: Vec<T>,
    pub updated: Vec<T>,
    pub deleted: usize,
    pub renames: IdRenames,
}

impl<T> Default for AppliedKind<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            deleted: 0,
            renames: IdRenames::default(),
        }
    }
}

fn check_batch_len<T: SyncResource>(operation: Operation, sent: usize, returned: usize) -> SyncResult<()> {
    if sent == returned {
        return Ok(());
    }
    Err(anyhow::anyhow!(
        "publisher returned {returned} {} records for a {operation} of {sent}",
        T::KIND
    )
    .into())
}

/// Create `items`, re-asserting caller-chosen external IDs the target replaced
pub async fn create_with_pinned_ids<T: Publishable>(
    publisher: &dyn Publisher,
    items: Vec<T>,
    retain_external_ids: bool,
) -> SyncResult<CreateOutcome<T>> {
    let mut outcome = CreateOutcome {
        records: Vec::new(),
        renames: IdRenames::new(),
        reasserted: 0,
    };
    if items.is_empty() {
        return Ok(outcome);
    }

    let requested: Vec<String> = items.iter().map(|i| i.external_id().to_string()).collect();
    let mut created = T::create(publisher, items).await?;
    check_batch_len::<T>(Operation::Create, requested.len(), created.len())?;

    let mut pinned: Vec<(usize, T)> = Vec::new();
    for (position, (original, record)) in requested.iter().zip(&created).enumerate() {
        if original.is_empty() || record.external_id() == original {
            continue;
        }
        if retain_external_ids {
            let mut restored = record.clone();
            restored.set_external_id(original);
            pinned.push((position, restored));
        } else {
            info!(
                kind = %T::KIND,
                old_id = %original,
                new_id = record.external_id(),
                "Target assigned a new external ID"
            );
            outcome.renames.record(original.clone(), record.external_id());
        }
    }

    if !pinned.is_empty() {
        let (positions, restored): (Vec<usize>, Vec<T>) = pinned.into_iter().unzip();
        debug!(kind = %T::KIND, count = restored.len(), "Re-asserting pinned external IDs");
        let sent = restored.len();
        let updated = T::update(publisher, restored).await?;
        check_batch_len::<T>(Operation::Update, sent, updated.len())?;
        outcome.reasserted = sent;
        for (position, record) in positions.into_iter().zip(updated) {
            created[position] = record;
        }
    }

    outcome.records = created;
    Ok(outcome)
}

/// Apply one kind's plan: deletes, then updates, then creates
pub async fn apply_plan<T: Publishable>(
    publisher: &dyn Publisher,
    plan: ReconcilePlan<T>,
    retain_external_ids: bool,
) -> SyncResult<AppliedKind<T>> {
    let kind = T::KIND;
    let step = |operation, err| SyncError::at_step(SyncStage::Applied, operation, Some(kind), err);
    let mut applied = AppliedKind::default();

    for internal_id in &plan.deletes {
        debug!(kind = %kind, internal_id = %internal_id, "Deleting");
        T::delete(publisher, internal_id)
            .await
            .map_err(|e| step(Operation::Delete, e))?;
        applied.deleted += 1;
    }

    if !plan.updates.is_empty() {
        let sent = plan.updates.len();
        let updated = T::update(publisher, plan.updates)
            .await
            .map_err(|e| step(Operation::Update, e))?;
        check_batch_len::<T>(Operation::Update, sent, updated.len())
            .map_err(|e| step(Operation::Update, e))?;
        applied.updated = updated;
    }

    if !plan.creates.is_empty() {
        let outcome = create_with_pinned_ids(publisher, plan.creates, retain_external_ids)
            .await
            .map_err(|e| step(Operation::Create, e))?;
        applied.created = outcome.records;
        applied.renames = outcome.renames;
    }

    info!(
        kind = %kind,
        deleted = applied.deleted,
        updated = applied.updated.len(),
        created = applied.created.len(),
        "Applied changes"
    );
    Ok(applied)
}
