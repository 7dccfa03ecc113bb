//! File Watcher - notify-based filesystem monitoring
//!
//! Translates OS-level events under a set of root directories into
//! [`ChangeEvent`]s and hands them to a [`FileEventHandler`] on one dedicated
//! thread.

pub mod infrastructure;
pub mod ports;

pub use infrastructure::FileWatcher;
pub use ports::{ChangeEvent, ChangeType, FileEventHandler, WatchConfig};
