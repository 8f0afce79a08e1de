//! # Sync Errors
//!
//! Error taxonomy shared by the reconciliation core and its collaborators.
//!
//! `AlreadyExists` and `NotFound` are part of the public contract: callers
//! (and tests) match on them by name to decide whether to retry a direct
//! create as an update or the other way round. Transport failures raised by
//! a [`Getter`](crate::provider::Getter) or [`Publisher`](crate::provider::Publisher)
//! travel through [`SyncError::Backend`] untouched.

use crate::controller::types::{Operation, SyncStage};
use crate::resource::ResourceKind;
use thiserror::Error;

/// Result alias used across the crate
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A create candidate collides with a live resource on some identity key
    #[error("{kind} with {key} already exists, use update instead")]
    AlreadyExists { kind: ResourceKind, key: String },

    /// An update candidate matches no live resource on any identity key
    #[error("{kind} '{id}' not found, use create instead")]
    NotFound { kind: ResourceKind, id: String },

    /// The target does not support this capability (e.g. policies on a gateway)
    #[error("{operation} is not supported by target '{target}'")]
    UnsupportedOperation { operation: String, target: String },

    /// A required selection criterion matched nothing
    #[error("selection by {criterion} '{value}' matched no resources")]
    SelectionEmpty { criterion: String, value: String },

    /// The desired state is not fit to be sent to the target
    #[error("manifest integrity error: {reason}")]
    ManifestIntegrity { reason: String },

    /// Getter or Publisher failure, passed through as-is
    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    /// A run aborted at a specific step
    #[error("sync aborted at {stage} ({}): {source}", step_label(*.operation, *.kind))]
    Step {
        stage: SyncStage,
        operation: Operation,
        kind: Option<ResourceKind>,
        #[source]
        source: Box<SyncError>,
    },
}

fn step_label(operation: Operation, kind: Option<ResourceKind>) -> String {
    match kind {
        Some(kind) => format!("{operation} {kind}"),
        None => operation.to_string(),
    }
}

impl SyncError {
    /// Wrap an error with the step of the run that produced it
    pub fn at_step(
        stage: SyncStage,
        operation: Operation,
        kind: Option<ResourceKind>,
        source: SyncError,
    ) -> Self {
        Self::Step {
            stage,
            operation,
            kind,
            source: Box::new(source),
        }
    }

    /// Shorthand for an unsupported capability on a named target
    pub fn unsupported(operation: impl Into<String>, target: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            target: target.into(),
        }
    }

    pub fn integrity(reason: impl Into<String>) -> Self {
        Self::ManifestIntegrity {
            reason: reason.into(),
        }
    }

    /// The innermost error, skipping any step wrappers
    pub fn root_cause(&self) -> &SyncError {
        match self {
            Self::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True when the caller can recover by switching between create and update
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::AlreadyExists { .. } | Self::NotFound { .. }
        )
    }

    /// Operator-facing hint for how to get past this error
    pub fn remediation(&self) -> &'static str {
        match self.root_cause() {
            Self::AlreadyExists { .. } => "Run an update (or a full sync) instead of a create",
            Self::NotFound { .. } => "Run a create (or a full sync) instead of an update",
            Self::UnsupportedOperation { .. } => {
                "Target the control plane for policies and assets"
            }
            Self::SelectionEmpty { .. } => "Check the IDs, tags or categories passed as filters",
            Self::ManifestIntegrity { .. } => {
                "Fix the manifest or provide an org ID override before syncing"
            }
            Self::Backend(_) | Self::Step { .. } => {
                "Inspect the target; already applied changes are not rolled back"
            }
        }
    }
}
