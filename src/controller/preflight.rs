//! # Pre-flight Checks
//!
//! Uniqueness guards for direct (non-reconciling) creates and updates.
//!
//! A direct create is checked against every key strategy its kind supports,
//! whatever the target profile, and against earlier candidates of the same
//! batch. A direct update must resolve to a live resource through one of
//! those keys.

use super::index::{IdentityIndex, TempKeyGenerator};
use crate::error::{SyncError, SyncResult};
use crate::resource::{KeyStrategy, SyncResource};
use std::collections::HashSet;

/// Fail with [`SyncError::AlreadyExists`] if `candidate` collides with `live`
pub fn ensure_creatable<T: SyncResource>(candidate: &T, live: &[T]) -> SyncResult<()> {
    ensure_batch_creatable(std::slice::from_ref(candidate), live)
}

/// Check a batch of create candidates against live state and each other
pub fn ensure_batch_creatable<T: SyncResource>(candidates: &[T], live: &[T]) -> SyncResult<()> {
    let strategies = T::all_key_strategies();
    let live_index = IdentityIndex::build(live, strategies, &mut TempKeyGenerator::new());
    let mut batch_keys: HashSet<(KeyStrategy, String)> = HashSet::new();

    for candidate in candidates {
        for strategy in strategies {
            let Some(key) = candidate.identity_key(*strategy) else {
                continue;
            };
            if live_index.lookup(*strategy, &key).is_some()
                || !batch_keys.insert((*strategy, key.clone()))
            {
                return Err(SyncError::AlreadyExists {
                    kind: T::KIND,
                    key: format!("{strategy} '{key}'"),
                });
            }
        }
    }
    Ok(())
}

/// Find the live resource `candidate` updates and copy its identifiers over.
///
/// The live internal ID always wins; the external ID is only filled in when
/// the candidate has none. Fails with [`SyncError::NotFound`] if no key matches.
pub fn resolve_update_target<T: SyncResource>(candidate: &mut T, live: &[T]) -> SyncResult<usize> {
    let strategies = T::all_key_strategies();
    let live_index = IdentityIndex::build(live, strategies, &mut TempKeyGenerator::new());

    let position = strategies
        .iter()
        .find_map(|strategy| {
            let key = candidate.identity_key(*strategy)?;
            live_index.lookup(*strategy, &key)
        })
        .ok_or_else(|| SyncError::NotFound {
            kind: T::KIND,
            id: candidate.label(),
        })?;

    let target = &live[position];
    candidate.set_internal_id(target.internal_id());
    if candidate.external_id().is_empty() {
        candidate.set_external_id(target.external_id());
    }
    Ok(position)
}

/// Resolve every candidate of a batch, failing on the first one without a target
pub fn resolve_update_targets<T: SyncResource>(candidates: &mut [T], live: &[T]) -> SyncResult<()> {
    for candidate in candidates.iter_mut() {
        resolve_update_target(candidate, live)?;
    }
    Ok(())
}
