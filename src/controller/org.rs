//! # Org Enforcer
//!
//! Every desired resource is written to a single org. An explicit override
//! always wins; without one the target's default org is looked up once per
//! run and reused for the rest of it.

use super::types::DesiredState;
use crate::error::{SyncError, SyncResult};
use crate::provider::Publisher;
use crate::resource::SyncResource;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Overwrite the org of every resource. An empty `org_id` leaves them untouched.
pub fn enforce_org<T: SyncResource>(resources: &mut [T], org_id: &str) -> usize {
    if org_id.is_empty() {
        return 0;
    }
    for resource in resources.iter_mut() {
        resource.set_org_id(org_id);
    }
    resources.len()
}

/// Run-scoped org resolution and enforcement
#[derive(Debug, Default)]
pub struct OrgEnforcer {
    override_org: String,
    resolved: OnceCell<String>,
}

impl OrgEnforcer {
    pub fn new(override_org: impl Into<String>) -> Self {
        Self {
            override_org: override_org.into(),
            resolved: OnceCell::new(),
        }
    }

    /// The org to enforce for this run; empty when none is known.
    ///
    /// The publisher is asked at most once, and only without an override.
    pub async fn resolve(&self, publisher: &dyn Publisher) -> SyncResult<&str> {
        if !self.override_org.is_empty() {
            return Ok(self.override_org.as_str());
        }
        let org = self
            .resolved
            .get_or_try_init(|| async {
                let org = publisher.default_org_id().await?.unwrap_or_default();
                debug!(org_id = %org, "Resolved default org from {}", publisher.name());
                Ok::<_, SyncError>(org)
            })
            .await?;
        Ok(org.as_str())
    }

    /// Rewrite the org of all desired resources
    pub async fn enforce(
        &self,
        publisher: &dyn Publisher,
        desired: &mut DesiredState,
    ) -> SyncResult<String> {
        let org = self.resolve(publisher).await?.to_string();
        let rewritten = enforce_org(&mut desired.apis, &org)
            + enforce_org(&mut desired.policies, &org)
            + enforce_org(&mut desired.assets, &org);
        if rewritten > 0 {
            info!(org_id = %org, resources = rewritten, "Enforced org on desired resources");
        }
        Ok(org)
    }
}

/// Fail if any resource still has no org
pub fn verify_org_ids(desired: &DesiredState) -> SyncResult<()> {
    fn first_missing<T: SyncResource>(resources: &[T]) -> Option<String> {
        resources
            .iter()
            .find(|r| r.org_id().is_empty())
            .map(|r| format!("{} '{}'", T::KIND, r.label()))
    }

    let missing = first_missing(&desired.apis)
        .or_else(|| first_missing(&desired.policies))
        .or_else(|| first_missing(&desired.assets));
    match missing {
        Some(resource) => Err(SyncError::integrity(format!(
            "{resource} has no org ID and no org override or target default is available"
        ))),
        None => Ok(()),
    }
}
