//! # Selector
//!
//! Narrows desired state to the resources named by ID, tag or category.
//!
//! Each criterion type is evaluated per resource kind by its own task. All
//! tasks are spawned before any result is read and joined before `select`
//! returns. A task computes its full match set first and commits it to the
//! shared accumulator in a single locked step.
//!
//! With no criteria the input passes through unchanged. With criteria, a kind
//! keeps only the resources some criterion matched, in input order and
//! de-duplicated by identifier.

use crate::error::{SyncError, SyncResult};
use crate::resource::{ApiResource, PolicyResource, SyncResource};
use futures::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Filters for a selective run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// External or internal IDs of APIs to keep
    pub api_ids: Vec<String>,
    /// External or internal IDs of policies to keep
    pub policy_ids: Vec<String>,
    /// Tags matched against APIs and policies alike
    pub tags: Vec<String>,
    /// API categories (`#category` name tokens)
    pub categories: Vec<String>,
}

impl SelectionCriteria {
    pub fn is_empty(&self) -> bool {
        self.api_ids.is_empty()
            && self.policy_ids.is_empty()
            && self.tags.is_empty()
            && self.categories.is_empty()
    }

    #[must_use]
    pub fn with_api_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.api_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_policy_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(categories.into_iter().map(Into::into));
        self
    }
}

/// Whether criteria values that match nothing fail the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Every value must match something, otherwise `SelectionEmpty`
    Required,
    /// Unmatched values are ignored (used to narrow live state)
    Lenient,
}

/// Selected resources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub apis: Vec<ApiResource>,
    pub policies: Vec<PolicyResource>,
}

/// One criterion type applied to one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Worker {
    ApiIds,
    PolicyIds,
    ApiTags,
    PolicyTags,
    Categories,
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Worker::ApiIds => "api id",
            Worker::PolicyIds => "policy id",
            Worker::ApiTags | Worker::PolicyTags => "tag",
            Worker::Categories => "category",
        })
    }
}

/// Matches of one worker: positions hit, and the criterion values that hit
#[derive(Debug, Default)]
struct Matches {
    positions: BTreeSet<usize>,
    values: HashSet<String>,
}

#[derive(Debug, Default)]
struct Accumulator {
    api_hits: BTreeSet<usize>,
    policy_hits: BTreeSet<usize>,
    matched_api_ids: HashSet<String>,
    matched_policy_ids: HashSet<String>,
    matched_tags: HashSet<String>,
    matched_categories: HashSet<String>,
}

impl Accumulator {
    fn commit(&mut self, worker: Worker, matches: Matches) {
        let (hits, values) = match worker {
            Worker::ApiIds => (&mut self.api_hits, &mut self.matched_api_ids),
            Worker::PolicyIds => (&mut self.policy_hits, &mut self.matched_policy_ids),
            Worker::ApiTags => (&mut self.api_hits, &mut self.matched_tags),
            Worker::PolicyTags => (&mut self.policy_hits, &mut self.matched_tags),
            Worker::Categories => (&mut self.api_hits, &mut self.matched_categories),
        };
        hits.extend(matches.positions);
        values.extend(matches.values);
    }
}

fn match_ids<T: SyncResource>(resources: &[T], ids: &[String]) -> Matches {
    let mut matches = Matches::default();
    for (position, resource) in resources.iter().enumerate() {
        for id in ids {
            if !id.is_empty() && (resource.external_id() == id || resource.internal_id() == id) {
                matches.positions.insert(position);
                matches.values.insert(id.clone());
            }
        }
    }
    matches
}

fn match_tags<T: SyncResource>(resources: &[T], tags: &[String]) -> Matches {
    let mut matches = Matches::default();
    for (position, resource) in resources.iter().enumerate() {
        for tag in tags {
            if resource.tags().iter().any(|t| t == tag) {
                matches.positions.insert(position);
                matches.values.insert(tag.clone());
            }
        }
    }
    matches
}

fn match_categories(apis: &[ApiResource], categories: &[String]) -> Matches {
    let mut matches = Matches::default();
    for (position, api) in apis.iter().enumerate() {
        for category in categories {
            if api.has_category(category) {
                matches.positions.insert(position);
                matches.values.insert(category.clone());
            }
        }
    }
    matches
}

/// Keep positions in `hits`, in input order, dropping identifier duplicates
fn collect_hits<T: SyncResource>(resources: &[T], hits: &BTreeSet<usize>) -> Vec<T> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    hits.iter()
        .filter_map(|position| resources.get(*position))
        .filter(|resource| {
            let identity = (
                resource.external_id().to_string(),
                resource.internal_id().to_string(),
            );
            // Resources with no identifier at all are never duplicates of each other
            identity == (String::new(), String::new()) || seen.insert(identity)
        })
        .cloned()
        .collect()
}

fn first_unmatched(wanted: &[String], matched: &HashSet<String>) -> Option<String> {
    wanted.iter().find(|value| !matched.contains(*value)).cloned()
}

/// Apply `criteria` to the desired APIs and policies
pub async fn select(
    apis: Vec<ApiResource>,
    policies: Vec<PolicyResource>,
    criteria: &SelectionCriteria,
    requirement: Requirement,
) -> SyncResult<Selection> {
    if criteria.is_empty() {
        return Ok(Selection { apis, policies });
    }

    let apis = Arc::new(apis);
    let policies = Arc::new(policies);
    let criteria = Arc::new(criteria.clone());
    let accumulator = Arc::new(Mutex::new(Accumulator::default()));

    let mut workers = Vec::new();
    if !criteria.api_ids.is_empty() {
        workers.push(Worker::ApiIds);
    }
    if !criteria.policy_ids.is_empty() {
        workers.push(Worker::PolicyIds);
    }
    if !criteria.tags.is_empty() {
        workers.push(Worker::ApiTags);
        workers.push(Worker::PolicyTags);
    }
    if !criteria.categories.is_empty() {
        workers.push(Worker::Categories);
    }

    let handles: Vec<_> = workers
        .into_iter()
        .map(|worker| {
            let apis = Arc::clone(&apis);
            let policies = Arc::clone(&policies);
            let criteria = Arc::clone(&criteria);
            let accumulator = Arc::clone(&accumulator);
            tokio::spawn(async move {
                let matches = match worker {
                    Worker::ApiIds => match_ids(&apis, &criteria.api_ids),
                    Worker::PolicyIds => match_ids(&policies, &criteria.policy_ids),
                    Worker::ApiTags => match_tags(&apis, &criteria.tags),
                    Worker::PolicyTags => match_tags(&policies, &criteria.tags),
                    Worker::Categories => match_categories(&apis, &criteria.categories),
                };
                debug!(
                    criterion = %worker,
                    matched = matches.positions.len(),
                    "Selection worker finished"
                );
                accumulator
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .commit(worker, matches);
            })
        })
        .collect();

    for joined in join_all(handles).await {
        joined.map_err(|e| anyhow::anyhow!("selection worker failed: {e}"))?;
    }

    let accumulator = accumulator.lock().unwrap_or_else(PoisonError::into_inner);

    if requirement == Requirement::Required {
        let unmatched = [
            (Worker::ApiIds, &criteria.api_ids, &accumulator.matched_api_ids),
            (
                Worker::PolicyIds,
                &criteria.policy_ids,
                &accumulator.matched_policy_ids,
            ),
            (Worker::ApiTags, &criteria.tags, &accumulator.matched_tags),
            (
                Worker::Categories,
                &criteria.categories,
                &accumulator.matched_categories,
            ),
        ]
        .into_iter()
        .find_map(|(worker, wanted, matched)| {
            first_unmatched(wanted, matched).map(|value| (worker, value))
        });

        if let Some((worker, value)) = unmatched {
            return Err(SyncError::SelectionEmpty {
                criterion: worker.to_string(),
                value,
            });
        }
    }

    let selection = Selection {
        apis: collect_hits(&apis, &accumulator.api_hits),
        policies: collect_hits(&policies, &accumulator.policy_hits),
    };
    info!(
        apis = selection.apis.len(),
        policies = selection.policies.len(),
        "Selected resources"
    );
    Ok(selection)
}
