//! docsync-audit - load a document tree into the cache and audit it
//!
//! # Usage
//!
//! ```bash
//! # Load every markdown file under docs/ and print the integrity report
//! cargo run --bin docsync-audit -- scan --root docs --ext md
//!
//! # Watch docs/ for 60 seconds, logging changes, then print the report
//! RUST_LOG=docsync_cache=debug cargo run --bin docsync-audit -- watch --root docs --seconds 60
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsync_cache::{CacheConfig, CacheValue, IntegrityCache, WatchConfig};
use prometheus::Registry;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use walkdir::{DirEntry, WalkDir};

#[derive(Parser)]
#[command(name = "docsync-audit")]
#[command(about = "Integrity audit for the docsync document cache", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every matching file under a root and print the integrity report
    Scan {
        /// Root directory
        #[arg(short, long)]
        root: PathBuf,

        /// File extensions to load (repeatable). Defaults to the configured watch extensions.
        #[arg(long = "ext")]
        extensions: Vec<String>,
    },

    /// Load a root, watch it for changes, then print the integrity report
    Watch {
        /// Root directory
        #[arg(short, long)]
        root: PathBuf,

        /// File extensions to load and watch (repeatable)
        #[arg(long = "ext")]
        extensions: Vec<String>,

        /// How long to watch
        #[arg(long, default_value = "30")]
        seconds: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan { root, extensions } => scan(config, root, extensions),
        Commands::Watch {
            root,
            extensions,
            seconds,
        } => watch(config, root, extensions, seconds),
    }
}

fn load_config(path: Option<&Path>) -> Result<CacheConfig> {
    match path {
        Some(path) => CacheConfig::from_yaml(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(CacheConfig::default()),
    }
}

fn scan(mut config: CacheConfig, root: PathBuf, extensions: Vec<String>) -> Result<()> {
    if !extensions.is_empty() {
        config.watch.extensions = extensions;
    }
    let filter = config.watch.clone();
    config.watch.enabled = false;

    let cache = IntegrityCache::new(config, &Registry::new()).context("Failed to build cache")?;
    let loaded = load_tree(&cache, &root, &filter)?;
    tracing::info!("Loaded {} file(s) from {}", loaded, root.display());

    print_report(&cache)
}

fn watch(mut config: CacheConfig, root: PathBuf, extensions: Vec<String>, seconds: u64) -> Result<()> {
    if !extensions.is_empty() {
        config.watch.extensions = extensions;
    }
    config.watch.enabled = false;
    config.watch.root_paths = vec![root.clone()];
    let watch_config = WatchConfig {
        enabled: true,
        ..config.watch.clone()
    };

    let cache = IntegrityCache::new(config, &Registry::new()).context("Failed to build cache")?;
    let loaded = load_tree(&cache, &root, &watch_config)?;
    tracing::info!("Loaded {} file(s) from {}", loaded, root.display());

    cache.add_change_callback(|path, change_type| {
        tracing::info!("{:>8} {}", change_type, path.display());
        Ok(())
    });
    cache
        .start_watching(watch_config)
        .with_context(|| format!("Failed to watch {}", root.display()))?;

    tracing::info!("Watching {} for {}s", root.display(), seconds);
    std::thread::sleep(Duration::from_secs(seconds));
    cache.stop_watching()?;

    print_report(&cache)
}

/// Cache every accepted file under `root`, then reconcile once so each entry
/// records the bytes actually on disk
fn load_tree(cache: &IntegrityCache, root: &Path, filter: &WatchConfig) -> Result<usize> {
    let ignored = ignored_dir_names(&filter.ignore_patterns);
    let mut loaded = 0;

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e, &ignored));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), &filter.extensions) {
            continue;
        }

        let path = entry.path();
        let value = match std::fs::read(path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(CacheValue::from_file_bytes(path, &bytes)?))
        {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let key = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .into_owned();
        cache.set(&key, value)?;
        loaded += 1;
    }

    let summary = cache.sync_with_filesystem(None);
    tracing::debug!("Initial sync: {:?}", summary);
    Ok(loaded)
}

/// `**/.git/**` → `.git`
fn ignored_dir_names(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .map(|p| p.trim_start_matches("**/").trim_end_matches("/**").to_string())
        .filter(|p| !p.is_empty() && !p.contains('*'))
        .collect()
}

fn is_ignored_dir(entry: &DirEntry, ignored: &[String]) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| ignored.iter().any(|i| i == name))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| {
            extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}

fn print_report(cache: &IntegrityCache) -> Result<()> {
    let report = cache.get_integrity_report();
    println!("{}", report.to_json_pretty()?);
    tracing::info!(
        "{} item(s): {} synchronized, {} unsynchronized, {} missing file(s)",
        report.total_items,
        report.synchronized_items,
        report.unsynchronized_items,
        report.missing_files
    );
    Ok(())
}
