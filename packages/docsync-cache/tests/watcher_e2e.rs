//! Watcher end-to-end: real filesystem events flowing into the cache
//!
//! These tests sleep/poll past the debounce window.

mod common;

use common::*;
use docsync_cache::{CacheConfig, CacheValue, ChangeType, WatchConfig};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(3);

fn watched_cache(tree: &DocTree) -> docsync_cache::IntegrityCache {
    let watch = WatchConfig {
        extensions: vec!["md".to_string(), "json".to_string()],
        debounce_ms: 50,
        ..WatchConfig::for_roots([tree.root()])
    };
    cache_with(CacheConfig::default().with_watch(watch))
}

#[test]
fn test_external_edit_marks_entry_stale() {
    let tree = DocTree::new();
    let key = tree.write("a.md", "v1");
    let cache = watched_cache(&tree);
    cache.set(&key, "v1").unwrap();

    tree.write("a.md", "v2 from an editor");

    assert!(wait_until(TIMEOUT, || cache
        .metadata(&key)
        .map_or(false, |m| !m.synchronized && m.last_fs_change.is_some())));

    // Staleness flip does not re-read; get does
    assert_eq!(cache.get(&key), Some(CacheValue::from("v2 from an editor")));
    assert!(cache.is_synchronized(&key));
}

#[test]
fn test_external_delete_evicts_entry() {
    let tree = DocTree::new();
    let key = tree.write("a.md", "doomed");
    let cache = watched_cache(&tree);
    cache.set(&key, "doomed").unwrap();

    tree.remove("a.md");

    assert!(wait_until(TIMEOUT, || !cache.contains_key(&key)));
    assert!(cache.metrics().evictions.get() >= 1);
}

#[test]
fn test_callbacks_see_filtered_events() {
    let tree = DocTree::new();
    let cache = watched_cache(&tree);

    let seen: Arc<Mutex<Vec<(PathBuf, ChangeType)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    cache.add_change_callback(move |path, change_type| {
        sink.lock().push((path.to_path_buf(), change_type));
        Ok(())
    });

    tree.write("notes.md", "# Notes");
    tree.write("ignored.txt", "not watched");
    tree.write(".git/HEAD", "ref: refs/heads/main");

    let notes = tree.path("notes.md");
    assert!(wait_until(TIMEOUT, || seen
        .lock()
        .iter()
        .any(|(path, _)| *path == notes)));

    thread::sleep(Duration::from_millis(200));
    let seen = seen.lock();
    assert!(seen.iter().all(|(path, _)| path.extension().map_or(false, |e| e == "md")));
    assert!(seen.iter().all(|(path, _)| !path.to_string_lossy().contains("/.git/")));
}

#[test]
fn test_failing_callback_does_not_stop_the_watcher() {
    let tree = DocTree::new();
    let cache = watched_cache(&tree);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    cache.add_change_callback(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        panic!("observer bug");
    });

    tree.write("one.md", "1");
    assert!(wait_until(TIMEOUT, || calls.load(Ordering::SeqCst) >= 1));

    tree.write("two.md", "2");
    assert!(wait_until(TIMEOUT, || calls.load(Ordering::SeqCst) >= 2));
    assert!(cache.is_watching());
}

#[test]
fn test_no_callbacks_after_cleanup() {
    let tree = DocTree::new();
    let cache = watched_cache(&tree);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    cache.add_change_callback(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    cache.cleanup();
    let after_cleanup = calls.load(Ordering::SeqCst);

    tree.write("late.md", "too late");
    thread::sleep(Duration::from_millis(300));

    assert_eq!(calls.load(Ordering::SeqCst), after_cleanup);
    assert!(!cache.is_watching());
}
