//! # Cross-Reference Fixup
//!
//! When a target renames APIs on create, the renames are collected in an
//! [`IdRenames`] table and threaded into [`fixup_access_rights`] before any
//! policy referencing those APIs is sent.

use crate::resource::PolicyResource;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Old to new external IDs assigned by the target during one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdRenames {
    entries: BTreeMap<String, String>,
}

impl IdRenames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.entries.insert(old.into(), new.into());
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.entries.get(old).map(String::as_str)
    }

    pub fn merge(&mut self, other: IdRenames) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(old, new)| (old.as_str(), new.as_str()))
    }
}

/// Rewrite access-rights keys of `policies` from old to new API IDs.
///
/// Limits and every other field of the moved definitions are left as they
/// were. Returns the number of policies that changed.
pub fn fixup_access_rights(policies: &mut [PolicyResource], renames: &IdRenames) -> usize {
    if renames.is_empty() {
        return 0;
    }
    let mut changed = 0;
    for policy in policies.iter_mut() {
        let moved = policy.rename_api_references(|api_id| renames.get(api_id));
        if moved > 0 {
            debug!(
                policy = %policy.external_id,
                rights = moved,
                "Rewrote access rights references"
            );
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{AccessDefinition, ApiLimit};

    fn policy(refs: &[&str]) -> PolicyResource {
        let mut policy = PolicyResource {
            external_id: "P".to_string(),
            ..Default::default()
        };
        for api_id in refs {
            policy.access_rights.insert(
                (*api_id).to_string(),
                AccessDefinition {
                    api_id: (*api_id).to_string(),
                    limit: Some(ApiLimit {
                        rate: 10.0,
                        per: 1.0,
                        quota_max: 500,
                        quota_renewal_rate: 3600,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            );
        }
        policy
    }

    #[test]
    fn test_renamed_reference_keeps_limits() {
        let mut policies = vec![policy(&["old1", "keep"])];
        let before = policies[0].access_rights["old1"].limit.clone();
        let mut renames = IdRenames::new();
        renames.record("old1", "new1");

        assert_eq!(fixup_access_rights(&mut policies, &renames), 1);

        let rights = &policies[0].access_rights;
        assert!(!rights.contains_key("old1"));
        assert_eq!(rights["new1"].limit, before);
        assert_eq!(rights["new1"].api_id, "new1");
        assert!(rights.contains_key("keep"));
    }

    #[test]
    fn test_unrelated_policies_are_untouched() {
        let mut policies = vec![policy(&["a"]), policy(&["old1"])];
        let mut renames = IdRenames::new();
        renames.record("old1", "new1");

        assert_eq!(fixup_access_rights(&mut policies, &renames), 1);
        assert!(policies[0].references_api("a"));
    }

    #[test]
    fn test_chained_renames_are_applied_at_once() {
        let mut policies = vec![policy(&["a", "b"])];
        if let Some(limit) = policies[0].access_rights.get_mut("b").and_then(|r| r.limit.as_mut()) {
            limit.rate = 2.0;
        }
        let mut renames = IdRenames::new();
        renames.record("a", "b");
        renames.record("b", "c");

        assert_eq!(fixup_access_rights(&mut policies, &renames), 1);

        let rights: Vec<(&str, &str, f64)> = policies[0]
            .access_rights
            .iter()
            .map(|(key, right)| {
                let rate = right.limit.as_ref().map_or(0.0, |limit| limit.rate);
                (key.as_str(), right.api_id.as_str(), rate)
            })
            .collect();
        assert_eq!(rights, vec![("b", "b", 10.0), ("c", "c", 2.0)]);
    }

    #[test]
    fn test_swapped_renames_are_applied_at_once() {
        let mut policies = vec![policy(&["x", "y"])];
        if let Some(limit) = policies[0].access_rights.get_mut("x").and_then(|r| r.limit.as_mut()) {
            limit.quota_max = 1;
        }
        let mut renames = IdRenames::new();
        renames.record("x", "y");
        renames.record("y", "x");

        fixup_access_rights(&mut policies, &renames);

        let rights = &policies[0].access_rights;
        assert_eq!(rights.len(), 2);
        assert_eq!(rights["y"].limit.as_ref().map(|l| l.quota_max), Some(1));
        assert_eq!(rights["x"].limit.as_ref().map(|l| l.quota_max), Some(500));
        assert_eq!(rights["x"].api_id, "x");
    }

    #[test]
    fn test_merge_and_lookup() {
        let mut first = IdRenames::new();
        first.record("a", "b");
        let mut second = IdRenames::new();
        second.record("c", "d");
        first.merge(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.get("c"), Some("d"));
        assert_eq!(first.get("b"), None);
    }
}
