//! # In-Memory Collaborators
//!
//! A stateful in-memory target and a static source, used to embed the engine
//! without a real product behind it and as the backend of the test suite.
//!
//! [`InMemoryPublisher`] behaves like a real target where it matters to the
//! engine: it hands out fresh internal IDs on create, can reset external IDs
//! of classic APIs the way a hosted dashboard does, rejects duplicates, and
//! refuses policies and assets when configured as a data plane. Every call is
//! recorded so that tests can assert on ordering.

use super::manifest::Manifest;
use super::{Getter, Publisher, TargetPlane};
use crate::constants::IN_MEMORY_INTERNAL_ID_PREFIX;
use crate::controller::types::Operation;
use crate::error::{SyncError, SyncResult};
use crate::resource::{ApiResource, PolicyResource, ResourceKind, SyncResource, TemplateAsset};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One recorded publisher call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherCall {
    pub operation: Operation,
    pub kind: Option<ResourceKind>,
    /// External IDs for create/update, the internal ID for delete
    pub ids: Vec<String>,
}

impl fmt::Display for PublisherCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if let Some(kind) = self.kind {
            write!(f, " {kind}")?;
        }
        if !self.ids.is_empty() {
            write!(f, " [{}]", self.ids.join(","))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    apis: Vec<ApiResource>,
    policies: Vec<PolicyResource>,
    assets: Vec<TemplateAsset>,
    next_id: u64,
    calls: Vec<PublisherCall>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{IN_MEMORY_INTERNAL_ID_PREFIX}{}", self.next_id)
    }

    fn record(&mut self, operation: Operation, kind: Option<ResourceKind>, ids: Vec<String>) {
        self.calls.push(PublisherCall {
            operation,
            kind,
            ids,
        });
    }
}

#[derive(Debug)]
pub struct InMemoryPublisher {
    name: String,
    plane: TargetPlane,
    default_org: Option<String>,
    reset_external_ids: bool,
    state: Mutex<MemoryState>,
}

impl InMemoryPublisher {
    /// A dashboard-like target
    pub fn control_plane() -> Self {
        Self::new("memory-dashboard", TargetPlane::ControlPlane)
    }

    /// A gateway-like target: APIs only, reload required
    pub fn data_plane() -> Self {
        Self::new("memory-gateway", TargetPlane::DataPlane)
    }

    fn new(name: &str, plane: TargetPlane) -> Self {
        Self {
            name: name.to_string(),
            plane,
            default_org: None,
            reset_external_ids: false,
            state: Mutex::new(MemoryState::default()),
        }
    }

    #[must_use]
    pub fn with_default_org(mut self, org_id: impl Into<String>) -> Self {
        self.default_org = Some(org_id.into());
        self
    }

    /// Give classic APIs a target-chosen external ID on create
    #[must_use]
    pub fn with_reset_external_ids(mut self, reset: bool) -> Self {
        self.reset_external_ids = reset;
        self
    }

    /// Seed live APIs; missing internal IDs are assigned
    #[must_use]
    pub fn with_apis(self, apis: Vec<ApiResource>) -> Self {
        {
            let mut state = self.lock();
            for mut api in apis {
                if api.internal_id().is_empty() {
                    let id = state.allocate_id();
                    api.set_internal_id(&id);
                }
                state.apis.push(api);
            }
        }
        self
    }

    #[must_use]
    pub fn with_policies(self, policies: Vec<PolicyResource>) -> Self {
        {
            let mut state = self.lock();
            for mut policy in policies {
                if policy.internal_id.is_empty() {
                    policy.internal_id = state.allocate_id();
                }
                state.policies.push(policy);
            }
        }
        self
    }

    #[must_use]
    pub fn with_assets(self, assets: Vec<TemplateAsset>) -> Self {
        {
            let mut state = self.lock();
            for mut asset in assets {
                if asset.internal_id.is_empty() {
                    asset.internal_id = state.allocate_id();
                }
                state.assets.push(asset);
            }
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_control_plane(&self, operation: &str) -> SyncResult<()> {
        if self.plane.supports_policies() {
            Ok(())
        } else {
            Err(SyncError::unsupported(operation, &self.name))
        }
    }

    pub fn apis(&self) -> Vec<ApiResource> {
        self.lock().apis.clone()
    }

    pub fn policies(&self) -> Vec<PolicyResource> {
        self.lock().policies.clone()
    }

    pub fn assets(&self) -> Vec<TemplateAsset> {
        self.lock().assets.clone()
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<PublisherCall> {
        self.lock().calls.clone()
    }

    /// Calls that changed state (everything but list and org lookups)
    pub fn mutations(&self) -> Vec<PublisherCall> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c.operation,
                    Operation::Create | Operation::Update | Operation::Delete | Operation::Reload
                )
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

fn external_ids<T: SyncResource>(items: &[T]) -> Vec<String> {
    items.iter().map(|i| i.external_id().to_string()).collect()
}

/// Store freshly created records, assigning internal IDs
fn insert_all<T: SyncResource>(
    store: &mut Vec<T>,
    items: Vec<T>,
    mut next_id: impl FnMut() -> String,
    mut assign_external: impl FnMut(&mut T, &str),
) -> SyncResult<Vec<T>> {
    let mut created = Vec::with_capacity(items.len());
    for mut item in items {
        let id = next_id();
        item.set_internal_id(&id);
        assign_external(&mut item, &id);
        if !item.external_id().is_empty()
            && store.iter().any(|s| s.external_id() == item.external_id())
        {
            return Err(anyhow::anyhow!(
                "{} '{}' conflicts with an existing record",
                T::KIND,
                item.external_id()
            )
            .into());
        }
        store.push(item.clone());
        created.push(item);
    }
    Ok(created)
}

/// Replace stored records matched by internal ID, falling back to external ID
fn replace_all<T: SyncResource>(store: &mut [T], items: Vec<T>) -> SyncResult<Vec<T>> {
    let mut updated = Vec::with_capacity(items.len());
    for mut item in items {
        let position = store
            .iter()
            .position(|s| !item.internal_id().is_empty() && s.internal_id() == item.internal_id())
            .or_else(|| {
                store.iter().position(|s| {
                    !item.external_id().is_empty() && s.external_id() == item.external_id()
                })
            })
            .ok_or_else(|| SyncError::NotFound {
                kind: T::KIND,
                id: item.label(),
            })?;
        item.set_internal_id(store[position].internal_id());
        store[position] = item.clone();
        updated.push(item);
    }
    Ok(updated)
}

fn remove<T: SyncResource>(store: &mut Vec<T>, internal_id: &str) -> SyncResult<()> {
    let position = store
        .iter()
        .position(|s| s.internal_id() == internal_id)
        .ok_or_else(|| SyncError::NotFound {
            kind: T::KIND,
            id: internal_id.to_string(),
        })?;
    store.remove(position);
    Ok(())
}

#[async_trait]
impl Publisher for InMemoryPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn plane(&self) -> TargetPlane {
        self.plane
    }

    async fn default_org_id(&self) -> SyncResult<Option<String>> {
        self.lock().record(Operation::ResolveOrg, None, Vec::new());
        Ok(self.default_org.clone())
    }

    async fn list_apis(&self) -> SyncResult<Vec<ApiResource>> {
        let mut state = self.lock();
        state.record(Operation::List, Some(ResourceKind::Api), Vec::new());
        Ok(state.apis.clone())
    }

    async fn create_apis(&self, apis: Vec<ApiResource>) -> SyncResult<Vec<ApiResource>> {
        let reset = self.reset_external_ids;
        let mut guard = self.lock();
        let state = &mut *guard;
        state.record(Operation::Create, Some(ResourceKind::Api), external_ids(&apis));
        let counter = &mut state.next_id;
        insert_all(
            &mut state.apis,
            apis,
            || {
                *counter += 1;
                format!("{IN_MEMORY_INTERNAL_ID_PREFIX}{counter}")
            },
            |api, id| {
                if api.external_id().is_empty() || (reset && !api.is_oas()) {
                    api.set_external_id(&format!("gen-{id}"));
                }
            },
        )
    }

    async fn update_apis(&self, apis: Vec<ApiResource>) -> SyncResult<Vec<ApiResource>> {
        let mut state = self.lock();
        state.record(Operation::Update, Some(ResourceKind::Api), external_ids(&apis));
        replace_all(&mut state.apis, apis)
    }

    async fn delete_api(&self, internal_id: &str) -> SyncResult<()> {
        let mut state = self.lock();
        state.record(
            Operation::Delete,
            Some(ResourceKind::Api),
            vec![internal_id.to_string()],
        );
        remove(&mut state.apis, internal_id)
    }

    async fn list_policies(&self) -> SyncResult<Vec<PolicyResource>> {
        self.ensure_control_plane("list policies")?;
        let mut state = self.lock();
        state.record(Operation::List, Some(ResourceKind::Policy), Vec::new());
        Ok(state.policies.clone())
    }

    async fn create_policies(
        &self,
        policies: Vec<PolicyResource>,
    ) -> SyncResult<Vec<PolicyResource>> {
        self.ensure_control_plane("create policies")?;
        let mut guard = self.lock();
        let state = &mut *guard;
        state.record(
            Operation::Create,
            Some(ResourceKind::Policy),
            external_ids(&policies),
        );
        let counter = &mut state.next_id;
        insert_all(
            &mut state.policies,
            policies,
            || {
                *counter += 1;
                format!("{IN_MEMORY_INTERNAL_ID_PREFIX}{counter}")
            },
            |_, _| {},
        )
    }

    async fn update_policies(
        &self,
        policies: Vec<PolicyResource>,
    ) -> SyncResult<Vec<PolicyResource>> {
        self.ensure_control_plane("update policies")?;
        let mut state = self.lock();
        state.record(
            Operation::Update,
            Some(ResourceKind::Policy),
            external_ids(&policies),
        );
        replace_all(&mut state.policies, policies)
    }

    async fn delete_policy(&self, internal_id: &str) -> SyncResult<()> {
        self.ensure_control_plane("delete policy")?;
        let mut state = self.lock();
        state.record(
            Operation::Delete,
            Some(ResourceKind::Policy),
            vec![internal_id.to_string()],
        );
        remove(&mut state.policies, internal_id)
    }

    async fn list_assets(&self) -> SyncResult<Vec<TemplateAsset>> {
        self.ensure_control_plane("list assets")?;
        let mut state = self.lock();
        state.record(Operation::List, Some(ResourceKind::Asset), Vec::new());
        Ok(state.assets.clone())
    }

    async fn create_assets(&self, assets: Vec<TemplateAsset>) -> SyncResult<Vec<TemplateAsset>> {
        self.ensure_control_plane("create assets")?;
        let mut guard = self.lock();
        let state = &mut *guard;
        state.record(
            Operation::Create,
            Some(ResourceKind::Asset),
            external_ids(&assets),
        );
        let counter = &mut state.next_id;
        insert_all(
            &mut state.assets,
            assets,
            || {
                *counter += 1;
                format!("{IN_MEMORY_INTERNAL_ID_PREFIX}{counter}")
            },
            |_, _| {},
        )
    }

    async fn update_assets(&self, assets: Vec<TemplateAsset>) -> SyncResult<Vec<TemplateAsset>> {
        self.ensure_control_plane("update assets")?;
        let mut state = self.lock();
        state.record(
            Operation::Update,
            Some(ResourceKind::Asset),
            external_ids(&assets),
        );
        replace_all(&mut state.assets, assets)
    }

    async fn delete_asset(&self, internal_id: &str) -> SyncResult<()> {
        self.ensure_control_plane("delete asset")?;
        let mut state = self.lock();
        state.record(
            Operation::Delete,
            Some(ResourceKind::Asset),
            vec![internal_id.to_string()],
        );
        remove(&mut state.assets, internal_id)
    }

    async fn reload(&self) -> SyncResult<()> {
        self.lock().record(Operation::Reload, None, Vec::new());
        Ok(())
    }
}

/// Fixed desired state, for tests and for callers that build resources themselves
#[derive(Debug, Default)]
pub struct StaticGetter {
    manifest: Manifest,
    apis: Vec<ApiResource>,
    policies: Vec<PolicyResource>,
    assets: Vec<TemplateAsset>,
    fetches: AtomicUsize,
}

impl StaticGetter {
    pub fn new(
        apis: Vec<ApiResource>,
        policies: Vec<PolicyResource>,
        assets: Vec<TemplateAsset>,
    ) -> Self {
        Self {
            apis,
            policies,
            assets,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Number of fetch calls served, across all methods
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Getter for StaticGetter {
    async fn fetch_manifest(&self) -> SyncResult<Manifest> {
        self.count();
        Ok(self.manifest.clone())
    }

    async fn fetch_api_resources(&self, _manifest: &Manifest) -> SyncResult<Vec<ApiResource>> {
        self.count();
        Ok(self.apis.clone())
    }

    async fn fetch_policies(&self, _manifest: &Manifest) -> SyncResult<Vec<PolicyResource>> {
        self.count();
        Ok(self.policies.clone())
    }

    async fn fetch_assets(&self, _manifest: &Manifest) -> SyncResult<Vec<TemplateAsset>> {
        self.count();
        Ok(self.assets.clone())
    }
}
