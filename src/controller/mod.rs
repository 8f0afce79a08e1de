//! # Controller
//!
//! The sync engine.
//!
//! - `types`: modes, stages and operations
//! - `index`: identity index and temporary keys
//! - `selector`: concurrent selection by ID, tag and category
//! - `org`: org resolution and enforcement
//! - `reconciler`: desired/live diff
//! - `preflight`: existence checks for publish and update runs
//! - `fixup`: policy access-rights rewrites after API renames
//! - `apply`: sends a plan to a publisher
//! - `delete`: removes APIs and policies by ID outside of a run
//! - `orchestrator`: drives a run through its stages

pub mod apply;
pub mod delete;
pub mod fixup;
pub mod index;
pub mod orchestrator;
pub mod org;
pub mod preflight;
pub mod reconciler;
pub mod selector;
pub mod types;

pub use delete::{delete_by_id, DeleteReport};
pub use orchestrator::{KindSummary, StageTracker, SyncOptions, SyncOrchestrator, SyncReport};
pub use selector::{Requirement, SelectionCriteria};
pub use types::{DesiredState, Operation, SyncMode, SyncStage};
