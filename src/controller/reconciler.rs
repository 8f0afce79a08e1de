//! # Reconciler
//!
//! Three-way diff between desired and live state for one resource kind.
//!
//! Every live resource ends up either matched (its desired counterpart is an
//! update) or deleted; every desired resource ends up either updated or
//! created. Matching walks the key strategies in order and takes the first
//! live resource that has not been claimed yet.
//!
//! The plan is applied deletes first, then updates, then creates, so that a
//! replacement never trips over an identifier still held by the resource it
//! replaces.

use super::fixup::IdRenames;
use super::index::{IdentityIndex, TempKeyGenerator};
use crate::error::{SyncError, SyncResult};
use crate::resource::{KeyStrategy, SyncResource};
use tracing::{debug, warn};

/// Create/update/delete sets for one resource kind
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan<T> {
    pub creates: Vec<T>,
    pub updates: Vec<T>,
    /// Internal IDs of live resources to remove
    pub deletes: Vec<String>,
    /// Desired external IDs replaced by the ID of the live resource they matched
    pub adopted: IdRenames,
}

impl<T> Default for ReconcilePlan<T> {
    fn default() -> Self {
        Self {
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
            adopted: IdRenames::default(),
        }
    }
}

impl<T> ReconcilePlan<T> {
    /// Plan that only creates
    pub fn creating(creates: Vec<T>) -> Self {
        Self {
            creates,
            ..Self::default()
        }
    }

    /// Plan that only updates
    pub fn updating(updates: Vec<T>) -> Self {
        Self {
            updates,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Fail if two desired records share a key under any strategy.
///
/// The index keeps the first holder of each key, so any later record that
/// resolves to a different position is a duplicate.
fn ensure_unique_desired<T: SyncResource>(
    desired: &[T],
    index: &IdentityIndex,
    strategies: &[KeyStrategy],
) -> SyncResult<()> {
    for (position, resource) in desired.iter().enumerate() {
        for strategy in strategies {
            let Some(key) = resource.identity_key(*strategy) else {
                continue;
            };
            if let Some(first) = index.lookup(*strategy, &key).filter(|first| *first != position) {
                return Err(SyncError::integrity(format!(
                    "{} '{}' has the same {strategy} '{key}' as {} '{}'",
                    T::KIND,
                    resource.label(),
                    T::KIND,
                    desired[first].label()
                )));
            }
        }
    }
    Ok(())
}

/// Diff `desired` against `actual`.
///
/// Matched desired records take the live record's internal and external ID;
/// every other field stays as desired. Desired records that share an
/// identity key fail with [`SyncError::ManifestIntegrity`].
pub fn reconcile<T: SyncResource>(
    desired: Vec<T>,
    actual: &[T],
    strategies: &[KeyStrategy],
    temp_keys: &mut TempKeyGenerator,
) -> SyncResult<ReconcilePlan<T>> {
    let actual_index = IdentityIndex::build(actual, strategies, temp_keys);
    let desired_index = IdentityIndex::build(&desired, strategies, temp_keys);
    ensure_unique_desired(&desired, &desired_index, strategies)?;

    let mut claimed = vec![false; actual.len()];
    let mut plan = ReconcilePlan::default();

    for (position, mut resource) in desired.into_iter().enumerate() {
        if desired_index.is_synthetic(position) {
            plan.creates.push(resource);
            continue;
        }

        let matched = strategies.iter().find_map(|strategy| {
            let key = resource.identity_key(*strategy)?;
            let live = actual_index.lookup(*strategy, &key)?;
            (!claimed[live]).then_some((live, *strategy))
        });

        match matched {
            Some((live, strategy)) => {
                claimed[live] = true;
                let current = &actual[live];
                debug!(
                    kind = %T::KIND,
                    resource = %resource.label(),
                    internal_id = current.internal_id(),
                    strategy = %strategy,
                    "Matched live resource"
                );
                let desired_id = resource.external_id();
                if !desired_id.is_empty() && desired_id != current.external_id() {
                    plan.adopted.record(desired_id, current.external_id());
                }
                resource.set_internal_id(current.internal_id());
                resource.set_external_id(current.external_id());
                plan.updates.push(resource);
            }
            None => plan.creates.push(resource),
        }
    }

    for (live, resource) in actual.iter().enumerate() {
        if claimed[live] {
            continue;
        }
        if resource.internal_id().is_empty() {
            warn!(
                kind = %T::KIND,
                resource = %resource.label(),
                "Live resource has no internal ID and cannot be deleted"
            );
            continue;
        }
        plan.deletes.push(resource.internal_id().to_string());
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::identity::{API_STRATEGIES, CLOUD_API_STRATEGIES, ID_STRATEGIES};
    use crate::resource::{ApiResource, ClassicApi, PolicyResource};

    fn api(external_id: &str, internal_id: &str, slug: &str) -> ApiResource {
        ApiResource::Classic(ClassicApi {
            external_id: external_id.to_string(),
            internal_id: internal_id.to_string(),
            slug: slug.to_string(),
            ..Default::default()
        })
    }

    fn run(desired: Vec<ApiResource>, actual: &[ApiResource]) -> ReconcilePlan<ApiResource> {
        reconcile(desired, actual, API_STRATEGIES, &mut TempKeyGenerator::new()).unwrap()
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn test_matching_external_id_becomes_update() {
            let plan = run(
                vec![api("a1", "", "orders")],
                &[api("a1", "db1", "orders")],
            );
            assert!(plan.creates.is_empty());
            assert!(plan.deletes.is_empty());
            assert_eq!(plan.updates, vec![api("a1", "db1", "orders")]);
        }

        #[test]
        fn test_unmatched_sides_become_create_and_delete() {
            let plan = run(vec![api("a2", "", "")], &[api("a1", "db1", "")]);
            assert_eq!(plan.creates, vec![api("a2", "", "")]);
            assert_eq!(plan.deletes, vec!["db1".to_string()]);
            assert!(plan.updates.is_empty());
        }

        #[test]
        fn test_slug_match_adopts_live_ids() {
            let mut desired = ClassicApi {
                slug: "orders".to_string(),
                name: "Orders v2".to_string(),
                ..Default::default()
            };
            desired.external_id = "local".to_string();
            let plan = run(
                vec![ApiResource::Classic(desired)],
                &[api("remote", "db7", "orders")],
            );
            assert_eq!(plan.updates.len(), 1);
            let updated = &plan.updates[0];
            assert_eq!(updated.external_id(), "remote");
            assert_eq!(updated.internal_id(), "db7");
            assert_eq!(updated.display_name(), "Orders v2");
            assert_eq!(plan.adopted.get("local"), Some("remote"));
        }

        #[test]
        fn test_cloud_profile_matches_on_slug_only() {
            let plan = reconcile(
                vec![api("a1", "", "")],
                &[api("a1", "db1", "")],
                CLOUD_API_STRATEGIES,
                &mut TempKeyGenerator::new(),
            )
            .unwrap();
            assert_eq!(plan.creates.len(), 1);
            assert_eq!(plan.deletes, vec!["db1".to_string()]);
        }
    }

    mod property_tests {
        use super::*;

        #[test]
        fn test_second_pass_is_noop() {
            let desired = vec![
                api("a1", "", "orders"),
                api("a2", "", ""),
                api("", "", "catalog"),
            ];
            let actual = vec![api("a1", "db1", "orders"), api("gone", "db9", "")];

            let first = run(desired.clone(), &actual);

            // Live state after applying the first plan
            let mut applied: Vec<ApiResource> = first.updates.clone();
            for (n, mut created) in first.creates.clone().into_iter().enumerate() {
                created.set_internal_id(&format!("new{n}"));
                applied.push(created);
            }

            let second = run(desired.clone(), &applied);
            assert!(second.creates.is_empty());
            assert!(second.deletes.is_empty());
            assert_eq!(second.updates.len(), desired.len());
            for (update, wanted) in second.updates.iter().zip(&desired) {
                assert_eq!(update.slug(), wanted.slug());
                if !wanted.external_id().is_empty() {
                    assert_eq!(update.external_id(), wanted.external_id());
                }
            }
        }

        #[test]
        fn test_every_resource_lands_in_exactly_one_set() {
            let desired = vec![
                api("a1", "", ""),
                api("a2", "", "s2"),
                api("a3", "", ""),
                api("", "db4", ""),
            ];
            let actual = vec![
                api("a1", "db1", ""),
                api("x", "db2", "s2"),
                api("y", "db3", ""),
                api("z", "db4", ""),
                api("w", "db5", ""),
            ];
            let plan = run(desired.clone(), &actual);

            assert_eq!(plan.creates.len() + plan.updates.len(), desired.len());

            let mut matched: Vec<&str> = plan.updates.iter().map(|u| u.internal_id()).collect();
            matched.extend(plan.deletes.iter().map(String::as_str));
            matched.sort_unstable();
            let mut live: Vec<&str> = actual.iter().map(|a| a.internal_id()).collect();
            live.sort_unstable();
            assert_eq!(matched, live);
        }

        #[test]
        fn test_keyless_desired_always_creates() {
            let desired = vec![api("", "", ""), api("", "", "")];
            let actual = vec![api("", "db1", ""), api("a1", "db2", "")];
            let plan = run(desired, &actual);

            assert_eq!(plan.creates.len(), 2);
            assert!(plan.updates.is_empty());
            assert_eq!(plan.deletes.len(), 2);
        }

        #[test]
        fn test_duplicate_desired_keys_are_rejected() {
            let desired = vec![api("a1", "", "x"), api("a1", "", "y")];
            let actual = vec![api("a1", "db1", ""), api("z", "db2", "")];
            let err = reconcile(desired, &actual, API_STRATEGIES, &mut TempKeyGenerator::new())
                .unwrap_err();
            match err {
                SyncError::ManifestIntegrity { reason } => {
                    assert!(reason.contains("external-id 'a1'"), "reason was {reason}");
                }
                other => panic!("expected ManifestIntegrity, got {other:?}"),
            }
        }

        #[test]
        fn test_shared_slug_is_a_duplicate_too() {
            let desired = vec![api("a1", "", "orders"), api("a2", "", "orders")];
            let result = reconcile(desired, &[], API_STRATEGIES, &mut TempKeyGenerator::new());
            assert!(matches!(result, Err(SyncError::ManifestIntegrity { .. })));
        }

        #[test]
        fn test_one_live_resource_is_claimed_once() {
            let desired = vec![api("a1", "", ""), api("", "", "orders")];
            let actual = vec![api("a1", "db1", "orders")];
            let plan = run(desired, &actual);
            assert_eq!(plan.updates.len(), 1);
            assert_eq!(plan.creates.len(), 1);
            assert!(plan.deletes.is_empty());
        }
    }

    #[test]
    fn test_policies_reconcile_on_ids() {
        let desired = vec![PolicyResource {
            external_id: "p1".to_string(),
            name: "gold".to_string(),
            ..Default::default()
        }];
        let actual = vec![PolicyResource {
            external_id: "p1".to_string(),
            internal_id: "dbp1".to_string(),
            name: "silver".to_string(),
            ..Default::default()
        }];
        let plan =
            reconcile(desired, &actual, ID_STRATEGIES, &mut TempKeyGenerator::new()).unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].internal_id, "dbp1");
        assert_eq!(plan.updates[0].name, "gold");
    }
}
