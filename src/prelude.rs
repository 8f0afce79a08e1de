//! # Prelude
//!
//! Re-exports commonly used types for convenience.
//!
//! ```rust
//! use gateway_sync::prelude::*;
//! ```

// Running a sync
pub use crate::config::SyncConfig;
pub use crate::controller::{
    delete_by_id, DeleteReport, KindSummary, SelectionCriteria, SyncMode, SyncOptions,
    SyncOrchestrator, SyncReport, SyncStage,
};
pub use crate::error::{SyncError, SyncResult};

// Collaborators
pub use crate::provider::{
    DirectoryDumper, DirectoryGetter, DryRunPublisher, DumpReport, Getter, InMemoryPublisher,
    Manifest, Publisher, StaticGetter, TargetPlane,
};

// Resource model
pub use crate::resource::{
    ApiResource, PolicyResource, ResourceKind, SyncResource, TargetProfile, TemplateAsset,
};
