//! Gateway Sync
//!
//! Reconciles version-controlled API definitions, access policies and portal
//! assets against a live API gateway or its management dashboard.
//!
//! ## Quick Start
//!
//! ```rust
//! use gateway_sync::prelude::*;
//! use std::sync::Arc;
//!
//! async fn sync_repository() -> SyncResult<SyncReport> {
//!     let config = SyncConfig::from_env();
//!     gateway_sync::observability::init_observability(&config)?;
//!     let getter = Arc::new(DirectoryGetter::new("./gateway").with_manifest_file(config.manifest_file.clone()));
//!     let publisher = Arc::new(InMemoryPublisher::control_plane().with_default_org("org1"));
//!     let options = config.sync_options(SyncMode::Sync, SelectionCriteria::default());
//!     SyncOrchestrator::new(getter, publisher, options).run().await
//! }
//! ```
//!
//! A run reads desired state once from a [`provider::Getter`], optionally
//! narrows it, stamps the org, diffs it against what the
//! [`provider::Publisher`] reports, and applies the difference.
//!
//! Outside of runs, [`provider::DirectoryDumper`] exports a target's live
//! state as a directory a later run can read, and
//! [`controller::delete_by_id`] removes APIs and policies by ID.

pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod resource;
