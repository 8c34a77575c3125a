use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

/// Cache composition counters. Observability only.
#[derive(Debug)]
pub struct Stats {
    start: Instant,
    pub(crate) queries: AtomicU64,
    pub(crate) direct_hits: AtomicU64,
    pub(crate) ancestor_hits: AtomicU64,
    pub(crate) ancestor_shortcuts: AtomicU64,
    pub(crate) exact_zoom: AtomicU64,
    pub(crate) classify_calls: AtomicU64,
    pub(crate) full_scans: AtomicU64,
    pub(crate) partition_scans: AtomicU64,
    pub(crate) partition_misses: AtomicU64,
    pub(crate) filtered_bbox: AtomicU64,
    pub(crate) filtered_geom: AtomicU64,
    pub(crate) matched_geom: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub queries: u64,
    pub direct_hits: u64,
    pub ancestor_hits: u64,
    pub ancestor_shortcuts: u64,
    pub exact_zoom: u64,
    pub classify_calls: u64,
    pub full_scans: u64,
    pub partition_scans: u64,
    pub partition_misses: u64,
    pub filtered_bbox: u64,
    pub filtered_geom: u64,
    pub matched_geom: u64,
}

impl StatsSnapshot {
    /// Counters accumulated between `earlier` and `self`.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            queries: self.queries.saturating_sub(earlier.queries),
            direct_hits: self.direct_hits.saturating_sub(earlier.direct_hits),
            ancestor_hits: self.ancestor_hits.saturating_sub(earlier.ancestor_hits),
            ancestor_shortcuts: self
                .ancestor_shortcuts
                .saturating_sub(earlier.ancestor_shortcuts),
            exact_zoom: self.exact_zoom.saturating_sub(earlier.exact_zoom),
            classify_calls: self.classify_calls.saturating_sub(earlier.classify_calls),
            full_scans: self.full_scans.saturating_sub(earlier.full_scans),
            partition_scans: self.partition_scans.saturating_sub(earlier.partition_scans),
            partition_misses: self.partition_misses.saturating_sub(earlier.partition_misses),
            filtered_bbox: self.filtered_bbox.saturating_sub(earlier.filtered_bbox),
            filtered_geom: self.filtered_geom.saturating_sub(earlier.filtered_geom),
            matched_geom: self.matched_geom.saturating_sub(earlier.matched_geom),
        }
    }

    pub fn log(&self, label: &str, elapsed: Duration, unambiguous: usize, cached: usize) {
        let s = self;
        info!(
            "{} - {:?} - queries: {}/{} - hits: {}/{} - shortcuts: {}/{} - scans: {}/{} (miss {}) - filtered: {}/{} - matched: {} - cache: {}/{}",
            label,
            elapsed,
            s.queries,
            s.classify_calls,
            s.ancestor_hits,
            s.direct_hits,
            s.ancestor_shortcuts,
            s.exact_zoom,
            s.full_scans,
            s.partition_scans,
            s.partition_misses,
            s.filtered_bbox,
            s.filtered_geom,
            s.matched_geom,
            unambiguous,
            cached
        );
    }
}

/// Per-scan counters, folded into [`Stats`] once per classification.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ScanCounts {
    pub filtered_bbox: u64,
    pub filtered_geom: u64,
    pub matched_geom: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            queries: AtomicU64::new(0),
            direct_hits: AtomicU64::new(0),
            ancestor_hits: AtomicU64::new(0),
            ancestor_shortcuts: AtomicU64::new(0),
            exact_zoom: AtomicU64::new(0),
            classify_calls: AtomicU64::new(0),
            full_scans: AtomicU64::new(0),
            partition_scans: AtomicU64::new(0),
            partition_misses: AtomicU64::new(0),
            filtered_bbox: AtomicU64::new(0),
            filtered_geom: AtomicU64::new(0),
            matched_geom: AtomicU64::new(0),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self, counts: ScanCounts) {
        self.filtered_bbox
            .fetch_add(counts.filtered_bbox, Ordering::Relaxed);
        self.filtered_geom
            .fetch_add(counts.filtered_geom, Ordering::Relaxed);
        self.matched_geom
            .fetch_add(counts.matched_geom, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            queries: load(&self.queries),
            direct_hits: load(&self.direct_hits),
            ancestor_hits: load(&self.ancestor_hits),
            ancestor_shortcuts: load(&self.ancestor_shortcuts),
            exact_zoom: load(&self.exact_zoom),
            classify_calls: load(&self.classify_calls),
            full_scans: load(&self.full_scans),
            partition_scans: load(&self.partition_scans),
            partition_misses: load(&self.partition_misses),
            filtered_bbox: load(&self.filtered_bbox),
            filtered_geom: load(&self.filtered_geom),
            matched_geom: load(&self.matched_geom),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Cumulative counters since the resolver was built.
    pub fn log(&self, label: &str, unambiguous: usize, cached: usize) {
        self.snapshot()
            .log(label, self.elapsed(), unambiguous, cached);
    }
}
