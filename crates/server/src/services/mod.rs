//! Business logic that spans more than one repository or collaborator.

pub mod fabric_sync;

pub use fabric_sync::{FabricSync, SyncError, SyncSummary, spawn_startup_sync};
