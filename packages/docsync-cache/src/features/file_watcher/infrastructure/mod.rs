//! notify-backed watcher implementation

mod file_watcher;

pub use file_watcher::FileWatcher;
