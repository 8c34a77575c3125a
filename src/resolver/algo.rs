use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use dashmap::DashMap;
use geo_types::Rect;

use crate::geometry::{self, Region};
use crate::partition::Partition;
use crate::resolver::stats::{ScanCounts, Stats, StatsSnapshot};
use crate::resolver::types::{ResolverOptions, is_unambiguous, join_label};
use crate::tile::TileCoord;

/// Hierarchical tile-to-country cache.
///
/// Regions and partition are read-only once the resolver is built; the label
/// cache only ever grows. Concurrent `resolve` calls for the same tile may
/// both classify it, which is harmless because classification is
/// deterministic.
#[derive(Debug)]
pub struct Resolver {
    regions: Vec<Region>,
    partition: Partition,
    cache: DashMap<String, String>,
    min_cache_zoom: u8,
    stats: Stats,
}

impl Resolver {
    pub fn new(regions: Vec<Region>, partition: Partition, options: ResolverOptions) -> Self {
        Self {
            regions,
            partition,
            cache: DashMap::new(),
            min_cache_zoom: options.min_cache_zoom,
            stats: Stats::new(),
        }
    }

    pub fn min_cache_zoom(&self) -> u8 {
        self.min_cache_zoom
    }

    pub fn set_min_cache_zoom(&mut self, zoom: u8) {
        self.min_cache_zoom = zoom;
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn resolve(&self, tile: &TileCoord) -> String {
        self.resolve_from(tile, self.min_cache_zoom)
    }

    /// Walks ancestors from `min_zoom` towards `tile`, memoizing each one, and
    /// returns the first unambiguous ancestor label. Falls back to classifying
    /// `tile` itself.
    pub fn resolve_from(&self, tile: &TileCoord, min_zoom: u8) -> String {
        Stats::bump(&self.stats.queries);
        let key = tile.path();
        if let Some(label) = self.cached_path(&key) {
            Stats::bump(&self.stats.direct_hits);
            return label;
        }

        for zoom in min_zoom..tile.zoom {
            let ancestor = tile.ancestor(zoom);
            let ancestor_key = ancestor.path();
            let (label, was_cached) = match self.cached_path(&ancestor_key) {
                Some(label) => (label, true),
                None => {
                    let label = self.classify(&ancestor);
                    self.cache.insert(ancestor_key, label.clone());
                    (label, false)
                }
            };
            if is_unambiguous(&label) {
                Stats::bump(&self.stats.ancestor_shortcuts);
                if was_cached {
                    Stats::bump(&self.stats.ancestor_hits);
                }
                self.cache.insert(key, label.clone());
                return label;
            }
        }

        Stats::bump(&self.stats.exact_zoom);
        let label = self.classify(tile);
        self.cache.insert(key, label.clone());
        label
    }

    /// Direct geometry test for one tile; never touches the cache.
    pub fn classify(&self, tile: &TileCoord) -> String {
        Stats::bump(&self.stats.classify_calls);
        let rect = tile.rect();
        if tile.zoom < self.partition.zoom() {
            Stats::bump(&self.stats.full_scans);
            return self.scan(&self.regions, &rect);
        }
        match self.partition.cell(tile) {
            Some(candidates) => {
                Stats::bump(&self.stats.partition_scans);
                let on_edge = self.partition.on_cell_edge(tile);
                self.scan(
                    candidates
                        .iter()
                        .map(|candidate| candidate.select(&self.regions, on_edge)),
                    &rect,
                )
            }
            None => {
                Stats::bump(&self.stats.partition_misses);
                Stats::bump(&self.stats.full_scans);
                self.scan(&self.regions, &rect)
            }
        }
    }

    /// Classification against the full region set, bypassing the partition.
    pub fn classify_unpartitioned(&self, tile: &TileCoord) -> String {
        Stats::bump(&self.stats.classify_calls);
        Stats::bump(&self.stats.full_scans);
        self.scan(&self.regions, &tile.rect())
    }

    fn scan<'a>(&self, candidates: impl IntoIterator<Item = &'a Region>, rect: &Rect<f64>) -> String {
        let mut counts = ScanCounts::default();
        let mut hits = BTreeSet::new();
        for candidate in candidates {
            if !geometry::bbox_overlaps(&candidate.bbox, rect) {
                counts.filtered_bbox += 1;
                continue;
            }
            if !geometry::intersects_rect(&candidate.geometry, rect) {
                counts.filtered_geom += 1;
                continue;
            }
            counts.matched_geom += 1;
            hits.insert(candidate.iso.as_str());
        }
        self.stats.record_scan(counts);
        join_label(hits)
    }

    pub fn cached(&self, tile: &TileCoord) -> Option<String> {
        self.cached_path(&tile.path())
    }

    fn cached_path(&self, key: &str) -> Option<String> {
        self.cache.get(key).map(|label| label.value().clone())
    }

    /// Inserts previously persisted labels.
    pub fn seed(&self, entries: impl IntoIterator<Item = (String, String)>) {
        for (key, label) in entries {
            self.cache.insert(key, label);
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn unambiguous_len(&self) -> usize {
        self.cache
            .iter()
            .filter(|entry| is_unambiguous(entry.value()))
            .count()
    }

    pub fn cache_entries(&self) -> BTreeMap<String, String> {
        self.cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Logs only what happened since `start` was taken.
    pub fn log_stats_since(&self, label: &str, start: &StatsSnapshot, elapsed: Duration) {
        self.stats.snapshot().since(start).log(
            label,
            elapsed,
            self.unambiguous_len(),
            self.cache_len(),
        );
    }

    pub fn log_stats(&self, label: &str) {
        self.stats
            .log(label, self.unambiguous_len(), self.cache_len());
    }
}
