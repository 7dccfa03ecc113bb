//! docsync-cache - integrity-aware in-memory document cache
//!
//! Caches the content of on-disk documents keyed by path and keeps every
//! entry honest about whether it still matches its backing file.
//!
//! ## Architecture
//!
//! ```text
//! IntegrityCache (facade)
//!   ├── CacheStore ── IntegrityChecker   mtime + SHA-256 decision rules
//!   │     └── SyncEngine                 re-read stale, evict orphaned
//!   ├── TransactionManager               all-or-nothing write batches
//!   ├── ReportGenerator                  read-only integrity audit
//!   └── FileWatcher (notify)             deletes evict, edits mark stale
//! ```
//!
//! One reentrant lock guards the value and metadata maps. Every public store
//! operation, sync pass and transaction holds it for its whole duration.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docsync_cache::{CacheConfig, IntegrityCache};
//!
//! let cache = IntegrityCache::new(CacheConfig::default(), &prometheus::Registry::new())?;
//! cache.set_with_integrity_check("/srv/docs/a.md", "# A")?;
//!
//! // Someone edits /srv/docs/a.md ...
//! let fresh = cache.get("/srv/docs/a.md"); // re-read from disk
//! ```

pub mod cache;
pub mod config;
pub mod errors;
pub mod features;
pub mod metrics;
pub mod shared;

pub use cache::{ChangeCallback, IntegrityCache};
pub use config::{CacheConfig, ConfigError, Validatable};
pub use errors::{CacheError, CacheResult};
pub use features::file_watcher::{ChangeEvent, ChangeType, FileEventHandler, FileWatcher, WatchConfig};
pub use features::integrity::{IntegrityChecker, SyncStatus};
pub use features::report::{EntryReport, IntegrityReport, ReportGenerator};
pub use features::store::CacheStore;
pub use features::sync::{SyncEngine, SyncSummary};
pub use features::transaction::{Transaction, TransactionManager};
pub use metrics::CacheMetrics;
pub use shared::{CacheValue, ContentHash, EntryMetadata};
