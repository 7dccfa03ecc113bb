//! Features of the integrity cache
//!
//! - `store`: the key/value and metadata maps behind one lock
//! - `integrity`: decides whether an entry still matches its file
//! - `sync`: re-reads stale entries and evicts orphans
//! - `transaction`: all-or-nothing write batches
//! - `file_watcher`: filesystem events into the store
//! - `report`: read-only integrity audit

pub mod file_watcher;
pub mod integrity;
pub mod report;
pub mod store;
pub mod sync;
pub mod transaction;
