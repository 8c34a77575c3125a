use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::progress::progress_for_phase;
use crate::resolver::algo::Resolver;
use crate::resolver::types::{MAX_ZOOM, MIN_ZOOM, is_unambiguous};
use crate::tile::{self, TileCoord};

/// How far the whole-world warm-up goes before per-tile queries start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmStrategy {
    /// Warm zoom levels upward and stop after the first level holding any
    /// unambiguous tile; that level becomes the walk's starting zoom.
    FirstUnambiguous,
    /// Warm every level up to and including the given zoom.
    FixedZoom(u8),
}

#[derive(Debug, Clone)]
pub struct WarmOptions {
    pub strategy: WarmStrategy,
    pub max_zoom: u8,
    /// Starting zoom restored from a persisted cache; skips warming entirely.
    pub preset_min_zoom: Option<u8>,
    pub no_progress: bool,
}

impl Default for WarmOptions {
    fn default() -> Self {
        Self {
            strategy: WarmStrategy::FirstUnambiguous,
            max_zoom: MAX_ZOOM,
            preset_min_zoom: None,
            no_progress: false,
        }
    }
}

/// Pre-populates the cache and sets the resolver's starting zoom.
///
/// Returns the effective minimum cache zoom. `cancel` is checked between zoom
/// levels; every label written before cancellation stays valid.
pub fn warm(resolver: &mut Resolver, options: &WarmOptions, cancel: Option<&AtomicBool>) -> u8 {
    if let Some(zoom) = options.preset_min_zoom {
        resolver.set_min_cache_zoom(zoom);
        resolver.log_stats(&format!("cache ({zoom})"));
        return zoom;
    }

    let cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));
    let effective = match options.strategy {
        WarmStrategy::FirstUnambiguous => {
            let mut effective = MIN_ZOOM;
            for zoom in MIN_ZOOM..=options.max_zoom {
                if cancelled() {
                    warn!(zoom, "warm-up cancelled");
                    break;
                }
                if warm_level(resolver, zoom, options.no_progress) {
                    effective = zoom;
                    break;
                }
            }
            effective
        }
        WarmStrategy::FixedZoom(target) => {
            let target = target.min(options.max_zoom);
            let mut effective = MIN_ZOOM;
            for zoom in MIN_ZOOM..=target {
                if cancelled() {
                    warn!(zoom, "warm-up cancelled");
                    break;
                }
                warm_level(resolver, zoom, options.no_progress);
                effective = zoom;
            }
            effective
        }
    };

    resolver.set_min_cache_zoom(effective);
    resolver.log_stats(&format!("cache ({effective})"));
    effective
}

/// Resolves every tile of the world at `zoom`; true when any was unambiguous.
fn warm_level(resolver: &Resolver, zoom: u8, no_progress: bool) -> bool {
    let total = tile::tiles_per_side(zoom).pow(2);
    let progress = progress_for_phase(&format!("warming z{zoom}"), "tiles", Some(total), no_progress);
    let tiles: Vec<TileCoord> = tile::world(zoom).collect();
    let unambiguous = tiles
        .par_iter()
        .map(|tile| {
            let label = resolver.resolve_from(tile, zoom);
            if let Some(progress) = progress.as_ref() {
                progress.inc(1);
            }
            usize::from(is_unambiguous(&label))
        })
        .sum::<usize>();
    if let Some(progress) = progress {
        progress.finish();
    }
    info!(zoom, tiles = total, unambiguous, "warmed zoom level");
    unambiguous > 0
}
