//! # Sync Orchestrator
//!
//! Drives one run through its stages:
//!
//! ```text
//! Fetched -> Filtered -> OrgEnforced -> Reconciled -> Applied -> (Reloaded)
//! ```
//!
//! ## Modes
//!
//! - `Sync`: three-way reconcile against live state. Kinds are applied
//!   policies, then APIs, then assets.
//! - `Publish`: every candidate must be new. APIs, then assets, then policies.
//! - `Update`: every candidate must already exist. Same kind order as publish.
//!
//! The getter is read once, before anything else. Nothing is written to the
//! target until every candidate has an org and every preflight check passed.
//! After that the first failing call aborts the run; calls that already went
//! through stay applied.
//!
//! Data-plane targets take API definitions only and end every run with a
//! single checked reload.

use super::apply::{apply_plan, AppliedKind};
use super::fixup::{fixup_access_rights, IdRenames};
use super::index::TempKeyGenerator;
use super::org::{verify_org_ids, OrgEnforcer};
use super::preflight::{ensure_batch_creatable, resolve_update_targets};
use super::reconciler::{reconcile, ReconcilePlan};
use super::selector::{select, Requirement, SelectionCriteria};
use super::types::{DesiredState, Operation, SyncMode, SyncStage};
use crate::error::{SyncError, SyncResult};
use crate::observability::metrics;
use crate::provider::{Getter, Publishable, Publisher, TargetPlane};
use crate::resource::{
    ApiResource, PolicyResource, ResourceKind, SyncResource, TargetProfile, TemplateAsset,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Options for one run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Org override; empty means the target's default org
    pub org_id: String,
    pub criteria: SelectionCriteria,
    pub profile: TargetProfile,
    /// Re-assert caller-chosen external IDs the target replaced on create
    pub retain_external_ids: bool,
    /// Record Prometheus metrics for this run
    pub record_metrics: bool,
}

impl SyncOptions {
    pub fn new(mode: SyncMode) -> Self {
        let profile = TargetProfile::default();
        Self {
            mode,
            org_id: String::new(),
            criteria: SelectionCriteria::default(),
            profile,
            retain_external_ids: profile.retains_external_ids(),
            record_metrics: true,
        }
    }

    #[must_use]
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = org_id.into();
        self
    }

    #[must_use]
    pub fn with_criteria(mut self, criteria: SelectionCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Also resets `retain_external_ids` to the profile's default
    #[must_use]
    pub fn with_profile(mut self, profile: TargetProfile) -> Self {
        self.profile = profile;
        self.retain_external_ids = profile.retains_external_ids();
        self
    }

    #[must_use]
    pub fn with_retain_external_ids(mut self, retain: bool) -> Self {
        self.retain_external_ids = retain;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.record_metrics = enabled;
        self
    }
}

/// Forward-only record of the stages a run has reached
#[derive(Debug, Clone, Default)]
pub struct StageTracker {
    reached: Vec<SyncStage>,
}

impl StageTracker {
    pub fn current(&self) -> Option<SyncStage> {
        self.reached.last().copied()
    }

    /// Move to `next`. Stages may be skipped but never revisited.
    pub fn advance(&mut self, next: SyncStage) -> SyncResult<()> {
        if let Some(current) = self.current() {
            if next <= current {
                return Err(anyhow::anyhow!("stage {next} cannot follow {current}").into());
            }
        }
        debug!(stage = %next, "Stage reached");
        self.reached.push(next);
        Ok(())
    }

    pub fn reached(&self) -> &[SyncStage] {
        &self.reached
    }

    pub fn into_stages(self) -> Vec<SyncStage> {
        self.reached
    }
}

/// Resources written for one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl KindSummary {
    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

impl<T> From<&AppliedKind<T>> for KindSummary {
    fn from(applied: &AppliedKind<T>) -> Self {
        Self {
            created: applied.created.len(),
            updated: applied.updated.len(),
            deleted: applied.deleted,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub mode: SyncMode,
    /// Publisher name
    pub target: String,
    /// Org enforced on desired resources; empty when none was available
    pub org_id: String,
    pub stages: Vec<SyncStage>,
    pub apis: KindSummary,
    pub policies: KindSummary,
    pub assets: KindSummary,
    /// API external IDs that changed during the run, old to new
    pub renames: IdRenames,
    /// Policies updated a second time to follow renamed APIs
    pub policy_fixups: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// True when the run wrote nothing
    pub fn is_noop(&self) -> bool {
        self.apis.is_empty() && self.policies.is_empty() && self.assets.is_empty()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[derive(Default)]
struct RunPlans {
    apis: ReconcilePlan<ApiResource>,
    policies: ReconcilePlan<PolicyResource>,
    assets: ReconcilePlan<TemplateAsset>,
}

/// Wrap errors with the step that produced them
pub(crate) fn at(
    stage: SyncStage,
    operation: Operation,
    kind: Option<ResourceKind>,
) -> impl Fn(SyncError) -> SyncError {
    move |err| SyncError::at_step(stage, operation, kind, err)
}

/// Runs syncs from one source to one target
pub struct SyncOrchestrator {
    getter: Arc<dyn Getter>,
    publisher: Arc<dyn Publisher>,
    options: SyncOptions,
}

impl fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("publisher", &self.publisher.name())
            .field("plane", &self.publisher.plane())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    pub fn new(getter: Arc<dyn Getter>, publisher: Arc<dyn Publisher>, options: SyncOptions) -> Self {
        Self {
            getter,
            publisher,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Execute one run
    pub async fn run(&self) -> SyncResult<SyncReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "sync",
            %run_id,
            mode = %self.options.mode,
            publisher = self.publisher.name()
        );
        let timer = Instant::now();

        let result = self.execute(run_id).instrument(span.clone()).await;

        if self.options.record_metrics {
            metrics::record_run(self.options.mode, timer.elapsed().as_secs_f64(), result.is_ok());
        }
        if let Err(err) = &result {
            span.in_scope(|| {
                error!(error = %err, remediation = err.remediation(), "Sync run failed");
            });
        }
        result
    }

    async fn execute(&self, run_id: Uuid) -> SyncResult<SyncReport> {
        let started_at = Utc::now();
        let mode = self.options.mode;
        let plane = self.publisher.plane();
        let mut tracker = StageTracker::default();
        let mut temp_keys = TempKeyGenerator::new();
        info!("Starting {mode} run against {} ({plane})", self.publisher.name());

        let desired = self.fetch().await?;
        tracker.advance(SyncStage::Fetched)?;

        let mut desired = self.filter(desired).await?;
        tracker.advance(SyncStage::Filtered)?;

        let org_id = self.enforce_org(&mut desired).await?;
        tracker.advance(SyncStage::OrgEnforced)?;

        let plans = match mode {
            SyncMode::Sync => self.plan_sync(desired, &mut temp_keys).await?,
            SyncMode::Publish => self.plan_publish(desired).await?,
            SyncMode::Update => self.plan_update(desired).await?,
        };
        tracker.advance(SyncStage::Reconciled)?;

        let mut report = SyncReport {
            run_id,
            mode,
            target: self.publisher.name().to_string(),
            org_id,
            stages: Vec::new(),
            apis: KindSummary::default(),
            policies: KindSummary::default(),
            assets: KindSummary::default(),
            renames: plans.apis.adopted.clone(),
            policy_fixups: 0,
            started_at,
            finished_at: started_at,
        };
        match mode {
            SyncMode::Sync => self.apply_sync(plans, &mut report).await?,
            SyncMode::Publish | SyncMode::Update => self.apply_direct(plans, &mut report).await?,
        }
        tracker.advance(SyncStage::Applied)?;

        if plane == TargetPlane::DataPlane {
            self.publisher
                .reload()
                .await
                .map_err(at(SyncStage::Reloaded, Operation::Reload, None))?;
            tracker.advance(SyncStage::Reloaded)?;
        }

        report.stages = tracker.into_stages();
        report.finished_at = Utc::now();
        info!(
            apis = ?report.apis,
            policies = ?report.policies,
            assets = ?report.assets,
            renames = report.renames.len(),
            "Sync run finished"
        );
        Ok(report)
    }

    async fn fetch(&self) -> SyncResult<DesiredState> {
        let manifest = self
            .getter
            .fetch_manifest()
            .await
            .map_err(at(SyncStage::Fetched, Operation::Fetch, None))?;

        let apis = self
            .getter
            .fetch_api_resources(&manifest)
            .await
            .map_err(at(SyncStage::Fetched, Operation::Fetch, Some(ResourceKind::Api)))?;
        let mut desired = DesiredState {
            apis,
            ..Default::default()
        };

        if self.publisher.plane().supports_policies() {
            desired.policies = self
                .getter
                .fetch_policies(&manifest)
                .await
                .map_err(at(SyncStage::Fetched, Operation::Fetch, Some(ResourceKind::Policy)))?;
            desired.assets = self
                .getter
                .fetch_assets(&manifest)
                .await
                .map_err(at(SyncStage::Fetched, Operation::Fetch, Some(ResourceKind::Asset)))?;
        } else if !manifest.policies.is_empty() || !manifest.assets.is_empty() {
            warn!(
                policies = manifest.policies.len(),
                assets = manifest.assets.len(),
                "{} is a data plane, skipping policies and assets",
                self.publisher.name()
            );
        }

        info!(
            apis = desired.apis.len(),
            policies = desired.policies.len(),
            assets = desired.assets.len(),
            "Fetched desired state"
        );
        Ok(desired)
    }

    async fn filter(&self, desired: DesiredState) -> SyncResult<DesiredState> {
        let criteria = &self.options.criteria;
        if criteria.is_empty() {
            return Ok(desired);
        }

        let DesiredState {
            apis,
            policies,
            assets,
        } = desired;
        if !assets.is_empty() {
            warn!(count = assets.len(), "Assets cannot be selected, skipping them for this run");
        }

        let selection = select(apis, policies, criteria, Requirement::Required)
            .await
            .map_err(at(SyncStage::Filtered, Operation::Select, None))?;
        Ok(DesiredState {
            apis: selection.apis,
            policies: selection.policies,
            assets: Vec::new(),
        })
    }

    async fn enforce_org(&self, desired: &mut DesiredState) -> SyncResult<String> {
        let enforcer = OrgEnforcer::new(self.options.org_id.clone());
        let org_id = enforcer
            .enforce(self.publisher.as_ref(), desired)
            .await
            .map_err(at(SyncStage::OrgEnforced, Operation::ResolveOrg, None))?;

        // Gateways accept org-less definitions, dashboards do not
        if self.publisher.plane() == TargetPlane::ControlPlane {
            verify_org_ids(desired).map_err(at(SyncStage::OrgEnforced, Operation::ResolveOrg, None))?;
        }
        Ok(org_id)
    }

    async fn list_live<T: Publishable>(&self) -> SyncResult<Vec<T>> {
        T::list(self.publisher.as_ref())
            .await
            .map_err(at(SyncStage::Reconciled, Operation::List, Some(T::KIND)))
    }

    async fn plan_sync(
        &self,
        desired: DesiredState,
        temp_keys: &mut TempKeyGenerator,
    ) -> SyncResult<RunPlans> {
        let profile = self.options.profile;
        let criteria = &self.options.criteria;
        let full_plane = self.publisher.plane().supports_policies();

        let live_apis: Vec<ApiResource> = self.list_live().await?;
        let live_policies: Vec<PolicyResource> = if full_plane {
            self.list_live().await?
        } else {
            Vec::new()
        };
        // A selective run only owns the live resources its criteria match
        let live = select(live_apis, live_policies, criteria, Requirement::Lenient)
            .await
            .map_err(at(SyncStage::Reconciled, Operation::Select, None))?;

        let apis = reconcile(
            desired.apis,
            &live.apis,
            ApiResource::key_strategies(profile),
            temp_keys,
        )
        .map_err(at(SyncStage::Reconciled, Operation::Reconcile, Some(ResourceKind::Api)))?;
        let mut policies = reconcile(
            desired.policies,
            &live.policies,
            PolicyResource::key_strategies(profile),
            temp_keys,
        )
        .map_err(at(SyncStage::Reconciled, Operation::Reconcile, Some(ResourceKind::Policy)))?;
        let assets = if full_plane && criteria.is_empty() {
            let live_assets: Vec<TemplateAsset> = self.list_live().await?;
            reconcile(
                desired.assets,
                &live_assets,
                TemplateAsset::key_strategies(profile),
                temp_keys,
            )
            .map_err(at(SyncStage::Reconciled, Operation::Reconcile, Some(ResourceKind::Asset)))?
        } else {
            ReconcilePlan::default()
        };

        // Policies are sent before APIs, so adopted IDs are fixed up front
        let fixed = fixup_access_rights(&mut policies.updates, &apis.adopted)
            + fixup_access_rights(&mut policies.creates, &apis.adopted);
        if fixed > 0 {
            debug!(policies = fixed, "Pointed policies at adopted API IDs");
        }

        info!(
            api_creates = apis.creates.len(),
            api_updates = apis.updates.len(),
            api_deletes = apis.deletes.len(),
            policy_creates = policies.creates.len(),
            policy_updates = policies.updates.len(),
            policy_deletes = policies.deletes.len(),
            asset_changes = assets.creates.len() + assets.updates.len() + assets.deletes.len(),
            "Reconciled desired against live state"
        );
        Ok(RunPlans {
            apis,
            policies,
            assets,
        })
    }

    async fn preflight_creates<T: Publishable>(&self, candidates: Vec<T>) -> SyncResult<ReconcilePlan<T>> {
        if candidates.is_empty() {
            return Ok(ReconcilePlan::default());
        }
        let live: Vec<T> = self.list_live().await?;
        ensure_batch_creatable(&candidates, &live)
            .map_err(at(SyncStage::Reconciled, Operation::Create, Some(T::KIND)))?;
        Ok(ReconcilePlan::creating(candidates))
    }

    async fn preflight_updates<T: Publishable>(
        &self,
        mut candidates: Vec<T>,
    ) -> SyncResult<ReconcilePlan<T>> {
        if candidates.is_empty() {
            return Ok(ReconcilePlan::default());
        }
        let live: Vec<T> = self.list_live().await?;
        resolve_update_targets(&mut candidates, &live)
            .map_err(at(SyncStage::Reconciled, Operation::Update, Some(T::KIND)))?;
        Ok(ReconcilePlan::updating(candidates))
    }

    async fn plan_publish(&self, desired: DesiredState) -> SyncResult<RunPlans> {
        Ok(RunPlans {
            apis: self.preflight_creates(desired.apis).await?,
            policies: self.preflight_creates(desired.policies).await?,
            assets: self.preflight_creates(desired.assets).await?,
        })
    }

    async fn plan_update(&self, desired: DesiredState) -> SyncResult<RunPlans> {
        Ok(RunPlans {
            apis: self.preflight_updates(desired.apis).await?,
            policies: self.preflight_updates(desired.policies).await?,
            assets: self.preflight_updates(desired.assets).await?,
        })
    }

    async fn apply_kind<T: Publishable>(&self, plan: ReconcilePlan<T>) -> SyncResult<AppliedKind<T>> {
        if plan.is_empty() {
            debug!(kind = %T::KIND, "Nothing to apply");
            return Ok(AppliedKind::default());
        }
        let applied = apply_plan(self.publisher.as_ref(), plan, self.options.retain_external_ids).await?;
        self.record_operations(T::KIND, Operation::Delete, applied.deleted);
        self.record_operations(T::KIND, Operation::Update, applied.updated.len());
        self.record_operations(T::KIND, Operation::Create, applied.created.len());
        Ok(applied)
    }

    fn record_operations(&self, kind: ResourceKind, operation: Operation, count: usize) {
        if self.options.record_metrics {
            metrics::record_operations(kind, operation, count);
        }
    }

    async fn apply_sync(&self, plans: RunPlans, report: &mut SyncReport) -> SyncResult<()> {
        let policies = self.apply_kind(plans.policies).await?;
        let apis = self.apply_kind(plans.apis).await?;

        if !apis.renames.is_empty() {
            let mut stale: Vec<PolicyResource> = policies
                .updated
                .iter()
                .chain(&policies.created)
                .filter(|p| apis.renames.iter().any(|(old, _)| p.references_api(old)))
                .cloned()
                .collect();
            let fixed = fixup_access_rights(&mut stale, &apis.renames);
            if fixed > 0 {
                info!(policies = fixed, "Updating policies that reference renamed APIs");
                PolicyResource::update(self.publisher.as_ref(), stale)
                    .await
                    .map_err(at(SyncStage::Applied, Operation::Update, Some(ResourceKind::Policy)))?;
                self.record_operations(ResourceKind::Policy, Operation::Update, fixed);
                report.policy_fixups = fixed;
            }
        }

        let assets = self.apply_kind(plans.assets).await?;

        report.policies = KindSummary::from(&policies);
        report.apis = KindSummary::from(&apis);
        report.assets = KindSummary::from(&assets);
        report.renames.merge(apis.renames);
        Ok(())
    }

    async fn apply_direct(&self, plans: RunPlans, report: &mut SyncReport) -> SyncResult<()> {
        let apis = self.apply_kind(plans.apis).await?;
        let assets = self.apply_kind(plans.assets).await?;

        let mut policy_plan = plans.policies;
        let fixed = fixup_access_rights(&mut policy_plan.creates, &apis.renames)
            + fixup_access_rights(&mut policy_plan.updates, &apis.renames);
        if fixed > 0 {
            info!(policies = fixed, "Pointed policies at renamed APIs before sending them");
        }
        let policies = self.apply_kind(policy_plan).await?;

        report.apis = KindSummary::from(&apis);
        report.assets = KindSummary::from(&assets);
        report.policies = KindSummary::from(&policies);
        report.renames.merge(apis.renames);
        Ok(())
    }
}
