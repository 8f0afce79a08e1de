//! # Identity Index
//!
//! Lookup maps from identity key to position in a resource slice, one map per
//! key strategy. Built fresh for each reconciliation and dropped with it.
//!
//! Resources that yield no key under any strategy get a synthetic key from a
//! run-scoped [`TempKeyGenerator`]. Synthetic keys live apart from the real
//! key maps, so they can never match anything on the other side.

use crate::constants::TEMP_KEY_PREFIX;
use crate::resource::{KeyStrategy, SyncResource};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Synthetic key handed to a resource that has no identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempKey(u64);

impl fmt::Display for TempKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TEMP_KEY_PREFIX}{}", self.0)
    }
}

/// Deterministic source of [`TempKey`]s, unique within one run
#[derive(Debug, Default)]
pub struct TempKeyGenerator {
    next: u64,
}

impl TempKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_key(&mut self) -> TempKey {
        self.next += 1;
        TempKey(self.next)
    }

    /// Number of keys handed out so far
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[derive(Debug)]
pub struct IdentityIndex {
    strategies: Vec<KeyStrategy>,
    maps: HashMap<KeyStrategy, HashMap<String, usize>>,
    synthetic: HashMap<usize, TempKey>,
}

impl IdentityIndex {
    /// Index `resources` under each of `strategies`, in order.
    ///
    /// The first resource to claim a key keeps it; later duplicates are only
    /// reachable through their other keys.
    pub fn build<T: SyncResource>(
        resources: &[T],
        strategies: &[KeyStrategy],
        temp_keys: &mut TempKeyGenerator,
    ) -> Self {
        let mut maps: HashMap<KeyStrategy, HashMap<String, usize>> = strategies
            .iter()
            .map(|strategy| (*strategy, HashMap::new()))
            .collect();
        let mut synthetic = HashMap::new();

        for (position, resource) in resources.iter().enumerate() {
            let mut keyed = false;
            for strategy in strategies {
                let Some(key) = resource.identity_key(*strategy) else {
                    continue;
                };
                keyed = true;
                if let Some(map) = maps.get_mut(strategy) {
                    map.entry(key).or_insert(position);
                }
            }
            if !keyed {
                let temp = temp_keys.next_key();
                debug!(
                    kind = %T::KIND,
                    name = resource.display_name(),
                    key = %temp,
                    "Resource has no identity key, assigned synthetic key"
                );
                synthetic.insert(position, temp);
            }
        }

        Self {
            strategies: strategies.to_vec(),
            maps,
            synthetic,
        }
    }

    pub fn strategies(&self) -> &[KeyStrategy] {
        &self.strategies
    }

    /// Position of the resource holding `key` under `strategy`
    pub fn lookup(&self, strategy: KeyStrategy, key: &str) -> Option<usize> {
        self.maps.get(&strategy)?.get(key).copied()
    }

    /// Synthetic key of the resource at `position`, if it was given one
    pub fn synthetic_key(&self, position: usize) -> Option<TempKey> {
        self.synthetic.get(&position).copied()
    }

    pub fn is_synthetic(&self, position: usize) -> bool {
        self.synthetic.contains_key(&position)
    }

    /// Number of distinct keys under `strategy`
    pub fn key_count(&self, strategy: KeyStrategy) -> usize {
        self.maps.get(&strategy).map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::identity::API_STRATEGIES;
    use crate::resource::{ApiResource, ClassicApi};

    fn api(external_id: &str, internal_id: &str, slug: &str) -> ApiResource {
        ApiResource::Classic(ClassicApi {
            external_id: external_id.to_string(),
            internal_id: internal_id.to_string(),
            slug: slug.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_temp_keys_are_sequential_and_prefixed() {
        let mut keys = TempKeyGenerator::new();
        assert_eq!(keys.next_key().to_string(), "temp-1");
        assert_eq!(keys.next_key().to_string(), "temp-2");
        assert_eq!(keys.issued(), 2);
    }

    #[test]
    fn test_build_indexes_every_strategy() {
        let apis = vec![api("a1", "db1", "orders"), api("a2", "", "")];
        let index = IdentityIndex::build(&apis, API_STRATEGIES, &mut TempKeyGenerator::new());

        assert_eq!(index.lookup(KeyStrategy::ExternalId, "a2"), Some(1));
        assert_eq!(index.lookup(KeyStrategy::InternalId, "db1"), Some(0));
        assert_eq!(index.lookup(KeyStrategy::Slug, "orders"), Some(0));
        assert_eq!(index.key_count(KeyStrategy::Slug), 1);
        assert_eq!(index.key_count(KeyStrategy::RouteDomain), 0);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let apis = vec![api("a1", "db1", "orders"), api("a2", "db2", "orders")];
        let index = IdentityIndex::build(&apis, API_STRATEGIES, &mut TempKeyGenerator::new());
        assert_eq!(index.lookup(KeyStrategy::Slug, "orders"), Some(0));
    }

    #[test]
    fn test_keyless_resource_gets_synthetic_key() {
        let apis = vec![api("", "", ""), api("a1", "", "")];
        let mut keys = TempKeyGenerator::new();
        let index = IdentityIndex::build(&apis, API_STRATEGIES, &mut keys);

        assert!(index.is_synthetic(0));
        assert!(!index.is_synthetic(1));
        assert_eq!(index.synthetic_key(0).map(|k| k.to_string()), Some("temp-1".to_string()));
        assert_eq!(index.lookup(KeyStrategy::ExternalId, "temp-1"), None);
    }

    #[test]
    fn test_keys_outside_strategy_list_are_ignored() {
        let apis = vec![api("a1", "", "")];
        let index = IdentityIndex::build(
            &apis,
            &[KeyStrategy::Slug],
            &mut TempKeyGenerator::new(),
        );
        assert!(index.is_synthetic(0));
        assert_eq!(index.lookup(KeyStrategy::ExternalId, "a1"), None);
    }
}
