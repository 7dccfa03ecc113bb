//! Test fixtures: temporary document trees and caches

use docsync_cache::{CacheConfig, IntegrityCache};
use prometheus::Registry;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// A throwaway directory of documents, addressed by file name
pub struct DocTree {
    dir: TempDir,
}

impl DocTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Cache key for `name`: its absolute path
    pub fn key(&self, name: &str) -> String {
        self.path(name).to_string_lossy().into_owned()
    }

    /// Write `content` to `name` and return the file's key
    pub fn write(&self, name: &str, content: &str) -> String {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write fixture");
        self.key(name)
    }

    pub fn append(&self, name: &str, content: &str) {
        let mut file = OpenOptions::new()
            .append(true)
            .open(self.path(name))
            .expect("open fixture for append");
        file.write_all(content.as_bytes()).expect("append fixture");
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.path(name)).expect("remove fixture");
    }
}

/// Default cache on a private metrics registry
pub fn new_cache() -> IntegrityCache {
    IntegrityCache::new(CacheConfig::default(), &Registry::new()).expect("build cache")
}

pub fn cache_with(config: CacheConfig) -> IntegrityCache {
    IntegrityCache::new(config, &Registry::new()).expect("build cache")
}

/// Markdown fixture with `n` sections
pub fn fixture_markdown(title: &str, n: usize) -> String {
    let sections: String = (0..n)
        .map(|i| format!("\n## Section {i}\n\nBody of section {i}.\n"))
        .collect();
    format!("# {title}\n{sections}")
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}
