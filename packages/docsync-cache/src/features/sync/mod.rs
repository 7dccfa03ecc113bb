//! Sync engine - reconciles cached entries with the filesystem

mod engine;

pub use engine::{SyncEngine, SyncSummary};
