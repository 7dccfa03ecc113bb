//! FileWatcher - notify-backed filesystem monitoring
//!
//! Implements cross-platform file watching using the `notify` crate with:
//! - Multiple root directories on one watcher
//! - Debouncing of repeated events
//! - Extension filtering and glob pattern ignore lists
//! - A single processor thread delivering events to a `FileEventHandler`

use crate::errors::{CacheError, CacheResult};
use crate::features::file_watcher::ports::{ChangeEvent, ChangeType, FileEventHandler, WatchConfig};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// FileWatcher - Cross-platform file system event monitor
///
/// # Example
/// ```ignore
/// let config = WatchConfig::for_roots(["/srv/docs"]);
/// let mut watcher = FileWatcher::new(config, Arc::new(MyHandler::default()))?;
/// watcher.start()?;
/// // ...
/// watcher.stop()?;
/// ```
pub struct FileWatcher {
    config: WatchConfig,
    handler: Arc<dyn FileEventHandler>,
    watcher: Option<RecommendedWatcher>,
    event_tx: Option<Sender<Event>>,
    event_rx: Option<Receiver<Event>>,
    processor_thread: Option<thread::JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl FileWatcher {
    /// Create a new FileWatcher
    ///
    /// # Errors
    /// Returns error if any root path does not exist or is not a directory
    pub fn new(config: WatchConfig, handler: Arc<dyn FileEventHandler>) -> CacheResult<Self> {
        for root in &config.root_paths {
            if !root.exists() {
                return Err(CacheError::watcher(format!(
                    "Root path does not exist: {}",
                    root.display()
                )));
            }
            if !root.is_dir() {
                return Err(CacheError::watcher(format!(
                    "Root path is not a directory: {}",
                    root.display()
                )));
            }
        }

        let (event_tx, event_rx) = channel();

        Ok(Self {
            config,
            handler,
            watcher: None,
            event_tx: Some(event_tx),
            event_rx: Some(event_rx),
            processor_thread: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.config.root_paths
    }

    /// Start watching for file changes
    ///
    /// Spawns the event processor thread
    pub fn start(&mut self) -> CacheResult<()> {
        if self.is_running() {
            return Err(CacheError::watcher("Watcher already running"));
        }

        // Recreate channel if needed (restart after stop)
        if self.event_rx.is_none() {
            let (tx, rx) = channel();
            self.event_tx = Some(tx);
            self.event_rx = Some(rx);
        }

        let event_tx = self
            .event_tx
            .as_ref()
            .ok_or_else(|| CacheError::watcher("Event transmitter not available"))?
            .clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => {
                    tracing::warn!("File watcher error: {}", e);
                }
            },
            NotifyConfig::default(),
        )?;

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        for root in &self.config.root_paths {
            watcher.watch(root, mode)?;
            tracing::debug!("Watching {} ({:?})", root.display(), mode);
        }

        self.watcher = Some(watcher);

        let event_rx = self
            .event_rx
            .take()
            .ok_or_else(|| CacheError::watcher("Event receiver not available"))?;

        let handler = Arc::clone(&self.handler);
        let config = self.config.clone();
        let running = Arc::clone(&self.running);

        running.store(true, Ordering::SeqCst);

        let processor_thread = thread::Builder::new()
            .name("docsync-watcher".to_string())
            .spawn(move || {
                Self::process_events(event_rx, handler, config, running);
            })?;

        self.processor_thread = Some(processor_thread);
        tracing::info!(
            "File watcher started on {} root(s)",
            self.config.root_paths.len()
        );

        Ok(())
    }

    /// Stop watching for file changes
    ///
    /// Returns only after the processor thread has exited, so no handler call
    /// can happen afterwards. Called from a handler, it cannot wait for its own
    /// thread; that handler call is the last one.
    pub fn stop(&mut self) -> CacheResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        // Drop watcher to stop receiving events
        self.watcher = None;
        self.event_tx = None;

        if let Some(thread) = self.processor_thread.take() {
            if thread.thread().id() == thread::current().id() {
                // Stopped from inside a handler: the loop exits once the handler returns
                tracing::debug!("File watcher stopped from its own processor thread");
            } else {
                thread
                    .join()
                    .map_err(|_| CacheError::watcher("Failed to join processor thread"))?;
            }
        }

        tracing::info!("File watcher stopped");
        Ok(())
    }

    /// Event processing loop with debouncing
    fn process_events(
        event_rx: Receiver<Event>,
        handler: Arc<dyn FileEventHandler>,
        config: WatchConfig,
        running: Arc<AtomicBool>,
    ) {
        // path -> (last emitted type, last seen)
        let mut debounce_map: HashMap<PathBuf, (ChangeType, Instant)> = HashMap::new();
        let debounce = config.debounce_duration();

        while running.load(Ordering::SeqCst) {
            match event_rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    for change in Self::convert_event(&event, &config) {
                        let now = Instant::now();

                        if let Some((last_type, last_seen)) = debounce_map.get(&change.path) {
                            if *last_type == change.change_type
                                && now.duration_since(*last_seen) < debounce
                            {
                                debounce_map.insert(change.path.clone(), (change.change_type, now));
                                continue;
                            }
                        }

                        debounce_map.insert(change.path.clone(), (change.change_type, now));

                        if !running.load(Ordering::SeqCst) {
                            return;
                        }

                        if let Err(e) = handler.handle_event(&change) {
                            handler.handle_error(format!("Event handling error: {}", e));
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    debounce_map
                        .retain(|_, (_, last_seen)| now.duration_since(*last_seen) < debounce * 2);
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Convert a notify Event into zero or more ChangeEvents
    ///
    /// Renames become a delete of the old path and a create of the new one.
    fn convert_event(event: &Event, config: &WatchConfig) -> Vec<ChangeEvent> {
        let raw: Vec<(PathBuf, ChangeType)> = match event.kind {
            EventKind::Create(_) => Self::tag(&event.paths, ChangeType::Created),
            EventKind::Remove(_) => Self::tag(&event.paths, ChangeType::Deleted),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                Self::tag(&event.paths, ChangeType::Deleted)
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                Self::tag(&event.paths, ChangeType::Created)
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => vec![
                (event.paths[0].clone(), ChangeType::Deleted),
                (event.paths[1].clone(), ChangeType::Created),
            ],
            EventKind::Modify(ModifyKind::Data(_)) => Self::tag(&event.paths, ChangeType::Modified),
            // Generic modify / any: decide by what is on disk now
            EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Any => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        ChangeType::Modified
                    } else {
                        ChangeType::Deleted
                    };
                    (p.clone(), kind)
                })
                .collect(),
            _ => Vec::new(), // metadata, access, etc.
        };

        raw.into_iter()
            .filter(|(path, _)| Self::accepts(path, config))
            .map(|(path, kind)| ChangeEvent::new(path, kind))
            .collect()
    }

    fn tag(paths: &[PathBuf], kind: ChangeType) -> Vec<(PathBuf, ChangeType)> {
        paths.iter().map(|p| (p.clone(), kind)).collect()
    }

    /// Apply ignore patterns, then the extension whitelist
    fn accepts(path: &Path, config: &WatchConfig) -> bool {
        if Self::should_ignore(path, &config.ignore_patterns) {
            return false;
        }

        if config.extensions.is_empty() {
            return true;
        }

        // Deleted files are checked by name only
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => config
                .extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    /// Check if path should be ignored based on glob patterns
    fn should_ignore(path: &Path, ignore_patterns: &[String]) -> bool {
        let path_str = match path.to_str() {
            Some(s) => s,
            None => return false,
        };

        for pattern in ignore_patterns {
            if pattern.contains("**") {
                // **/name/** matches any path with a `name` component
                for part in pattern.split("**") {
                    let part_trimmed = part.trim_matches('/');
                    if part_trimmed.is_empty() {
                        continue;
                    }
                    if path_str.contains(&format!("/{}/", part_trimmed))
                        || path_str.ends_with(&format!("/{}", part_trimmed))
                        || path_str.starts_with(&format!("{}/", part_trimmed))
                    {
                        return true;
                    }
                }
            } else if path_str.contains(pattern.as_str()) {
                return true;
            }
        }

        false
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!("Failed to stop file watcher on drop: {}", e);
        }
    }
}
