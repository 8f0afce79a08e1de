//! # Configuration
//!
//! - `sync`: run settings loaded from environment variables

pub mod sync;

pub use sync::SyncConfig;
