//! Prometheus metrics for the integrity cache

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

/// Cache metrics
#[derive(Clone)]
pub struct CacheMetrics {
    pub hits: IntCounter,
    pub misses: IntCounter,
    pub sync_refreshes: IntCounter,
    pub sync_failures: IntCounter,
    pub evictions: IntCounter,
    pub integrity_violations: IntCounter,
    pub commits: IntCounter,
    pub rollbacks: IntCounter,
    pub watcher_events: IntCounter,
    pub over_capacity: IntCounter,
    pub entries: IntGauge,
    pub bytes: IntGauge,
}

impl CacheMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            hits: register_int_counter_with_registry!(
                Opts::new("docsync_cache_hits_total", "Cache hits"),
                registry
            )?,
            misses: register_int_counter_with_registry!(
                Opts::new("docsync_cache_misses_total", "Cache misses"),
                registry
            )?,
            sync_refreshes: register_int_counter_with_registry!(
                Opts::new(
                    "docsync_cache_sync_refreshes_total",
                    "Stale entries re-read from disk"
                ),
                registry
            )?,
            sync_failures: register_int_counter_with_registry!(
                Opts::new(
                    "docsync_cache_sync_failures_total",
                    "Re-reads that failed and left the entry stale"
                ),
                registry
            )?,
            evictions: register_int_counter_with_registry!(
                Opts::new(
                    "docsync_cache_evictions_total",
                    "Entries evicted because the backing file disappeared"
                ),
                registry
            )?,
            integrity_violations: register_int_counter_with_registry!(
                Opts::new(
                    "docsync_cache_integrity_violations_total",
                    "Conditional writes rejected over stale entries"
                ),
                registry
            )?,
            commits: register_int_counter_with_registry!(
                Opts::new("docsync_cache_commits_total", "Committed transactions"),
                registry
            )?,
            rollbacks: register_int_counter_with_registry!(
                Opts::new("docsync_cache_rollbacks_total", "Rolled back transactions"),
                registry
            )?,
            watcher_events: register_int_counter_with_registry!(
                Opts::new(
                    "docsync_cache_watcher_events_total",
                    "Filesystem events applied to the cache"
                ),
                registry
            )?,
            over_capacity: register_int_counter_with_registry!(
                Opts::new(
                    "docsync_cache_over_capacity_total",
                    "Writes that left the cache above its capacity hint"
                ),
                registry
            )?,
            entries: register_int_gauge_with_registry!(
                Opts::new("docsync_cache_entries", "Cache entry count"),
                registry
            )?,
            bytes: register_int_gauge_with_registry!(
                Opts::new("docsync_cache_bytes", "Estimated cached bytes"),
                registry
            )?,
        })
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.get() as f64;
        let total = hits + self.misses.get() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}
