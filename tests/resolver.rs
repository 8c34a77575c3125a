use std::sync::atomic::AtomicBool;

use geo_types::{Rect, coord};
use rayon::prelude::*;

use tile_sovereignty::geometry;
use tile_sovereignty::partition::partition;
use tile_sovereignty::preprocess::{PreprocessOptions, normalize};
use tile_sovereignty::resolver::{
    LABEL_SEPARATOR, Resolver, ResolverOptions, StatsSnapshot, WarmOptions, WarmStrategy, is_unambiguous, join_label,
    warm,
};
use tile_sovereignty::store::RawCountry;
use tile_sovereignty::tile::{TileCoord, world};

fn boxed(iso: &str, id: i64, west: f64, south: f64, east: f64, north: f64) -> RawCountry {
    let rect = Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north });
    RawCountry::new(iso, Some(id), geometry::to_multi(rect.to_polygon())).expect("country")
}

fn resolver_for(raw: &[RawCountry]) -> Resolver {
    let candidates = normalize(raw, &PreprocessOptions::default()).candidates();
    let cells = partition(&candidates, 3, true);
    Resolver::new(candidates, cells, ResolverOptions::default())
}

/// AA and BB share the meridian at lon 30; everything else is unclaimed.
fn straddle_world() -> Resolver {
    resolver_for(&[
        boxed("AA", 1, -30.0, -30.0, 30.0, 60.0),
        boxed("BB", 2, 30.0, -30.0, 80.0, 60.0),
    ])
}

fn large_country_world() -> Resolver {
    resolver_for(&[boxed("LL", 1, -170.0, -80.0, 170.0, 80.0)])
}

fn tile(z: u8, x: u32, y: u32) -> TileCoord {
    TileCoord::new(z, x, y).expect("tile")
}

fn no_progress(strategy: WarmStrategy) -> WarmOptions {
    WarmOptions {
        strategy,
        no_progress: true,
        ..WarmOptions::default()
    }
}

#[test]
fn labels_are_sorted_and_pipe_joined() {
    assert_eq!(join_label(["BB", "AA", "BB"]), "AA|BB");
    assert_eq!(join_label(std::iter::empty::<&str>()), "??");
    assert_eq!(join_label(["AA", "??"]), "??|AA");
    assert!(is_unambiguous("AA"));
    assert!(is_unambiguous("??"));
    assert!(!is_unambiguous("??|AA"));
    assert_eq!(join_label(["AA", "BB"]).split(LABEL_SEPARATOR).count(), 2);
}

#[test]
fn tile_straddling_two_countries_gets_both_codes() {
    let resolver = straddle_world();
    assert_eq!(resolver.resolve(&tile(3, 4, 3)), "AA|BB");
    assert_eq!(resolver.cached(&tile(3, 4, 3)).as_deref(), Some("AA|BB"));
}

#[test]
fn child_inside_one_country_stops_further_geometry_tests() {
    let resolver = straddle_world();
    assert_eq!(resolver.resolve(&tile(3, 4, 3)), "AA|BB");

    // the zoom-3 parent is ambiguous, so the child itself is tested once
    let before = resolver.stats().snapshot();
    assert_eq!(resolver.resolve(&tile(4, 8, 7)), "AA");
    let after_child = resolver.stats().snapshot();
    assert_eq!(after_child.classify_calls, before.classify_calls + 1);

    for descendant in world(6).filter(|t| t.is_descendant_of(&tile(4, 8, 7))) {
        assert_eq!(resolver.resolve(&descendant), "AA");
    }
    let after = resolver.stats().snapshot();
    assert_eq!(after.classify_calls, after_child.classify_calls);
    assert_eq!(after.ancestor_hits, after_child.ancestor_hits + 16);
}

#[test]
fn ocean_tile_resolves_to_unknown() {
    let resolver = straddle_world();
    assert_eq!(resolver.resolve(&tile(3, 0, 3)), "??");
    assert_eq!(resolver.resolve(&tile(2, 0, 1)), "??");
    assert_eq!(resolver.resolve(&tile(2, 1, 1)), "??|AA");
}

#[test]
fn unambiguous_labels_hold_for_every_descendant() {
    let warmed = straddle_world();
    let fresh = straddle_world();

    for parent in world(3) {
        let label = warmed.resolve(&parent);
        if !is_unambiguous(&label) {
            continue;
        }
        for descendant in world(5).filter(|t| t.is_descendant_of(&parent)) {
            assert_eq!(warmed.resolve(&descendant), label, "{descendant} under {parent}");
            assert_eq!(fresh.resolve(&descendant), label, "{descendant} without ancestors");
        }
    }
}

#[test]
fn resolve_is_deterministic() {
    let resolver = straddle_world();
    let first: Vec<String> = world(4).map(|t| resolver.resolve(&t)).collect();
    let second: Vec<String> = world(4).map(|t| resolver.resolve(&t)).collect();
    assert_eq!(first, second);

    let parallel = straddle_world();
    let tiles: Vec<TileCoord> = world(4).collect();
    let concurrent: Vec<String> = tiles.par_iter().map(|t| parallel.resolve(t)).collect();
    assert_eq!(first, concurrent);
}

#[test]
fn first_unambiguous_warm_stops_at_first_clear_level() {
    let mut resolver = straddle_world();
    let zoom = warm(&mut resolver, &no_progress(WarmStrategy::FirstUnambiguous), None);

    // zoom 2 holds the first ocean-only tiles
    assert_eq!(zoom, 2);
    assert_eq!(resolver.min_cache_zoom(), 2);
    assert_eq!(resolver.cache_len(), 1 + 4 + 16);
    assert!(resolver.unambiguous_len() > 0);
}

#[test]
fn fixed_zoom_warm_fills_every_level() {
    let mut resolver = straddle_world();
    let zoom = warm(&mut resolver, &no_progress(WarmStrategy::FixedZoom(3)), None);
    assert_eq!(zoom, 3);
    assert_eq!(resolver.min_cache_zoom(), 3);
    assert_eq!(resolver.cache_len(), 1 + 4 + 16 + 64);

    let before = resolver.stats().snapshot();
    assert_eq!(resolver.resolve(&tile(3, 4, 3)), "AA|BB");
    assert_eq!(resolver.stats().snapshot().classify_calls, before.classify_calls);
}

#[test]
fn deep_tile_in_large_country_uses_only_ancestor_shortcuts() {
    let mut resolver = large_country_world();
    warm(&mut resolver, &no_progress(WarmStrategy::FixedZoom(0)), None);
    assert_eq!(resolver.min_cache_zoom(), 0);

    let before = resolver.stats().snapshot();
    assert_eq!(resolver.resolve(&tile(12, 1536, 1689)), "LL");
    let after = resolver.stats().snapshot();
    assert_eq!(after.partition_scans, before.partition_scans);
    assert_eq!(after.exact_zoom, before.exact_zoom);
    assert_eq!(after.ancestor_shortcuts, before.ancestor_shortcuts + 1);
    assert_eq!(resolver.cached(&tile(2, 1, 1)).as_deref(), Some("LL"));
}

#[test]
fn warmed_large_country_answers_deep_tiles_from_cache() {
    let mut resolver = large_country_world();
    let zoom = warm(&mut resolver, &no_progress(WarmStrategy::FirstUnambiguous), None);
    assert_eq!(zoom, 2);

    let before = resolver.stats().snapshot();
    assert_eq!(resolver.resolve(&tile(12, 1536, 1689)), "LL");
    let after = resolver.stats().snapshot();
    assert_eq!(after.classify_calls, before.classify_calls);
    assert_eq!(after.ancestor_hits, before.ancestor_hits + 1);
    assert_eq!(after.partition_scans, 0);
}

#[test]
fn preset_zoom_skips_warming() {
    let mut resolver = straddle_world();
    let options = WarmOptions {
        preset_min_zoom: Some(5),
        ..no_progress(WarmStrategy::FirstUnambiguous)
    };
    assert_eq!(warm(&mut resolver, &options, None), 5);
    assert_eq!(resolver.min_cache_zoom(), 5);
    assert_eq!(resolver.cache_len(), 0);
}

#[test]
fn cancelled_warm_keeps_the_cache_consistent() {
    let mut resolver = straddle_world();
    let cancel = AtomicBool::new(true);
    let zoom = warm(
        &mut resolver,
        &no_progress(WarmStrategy::FixedZoom(4)),
        Some(&cancel),
    );
    assert_eq!(zoom, 0);
    assert_eq!(resolver.cache_len(), 0);
    assert_eq!(resolver.resolve(&tile(3, 4, 3)), "AA|BB");
}

#[test]
fn seeded_labels_are_served_without_classification() {
    let resolver = straddle_world();
    resolver.seed(vec![("5/3/7".to_string(), "ZZ".to_string())]);
    assert_eq!(resolver.resolve(&tile(5, 3, 7)), "ZZ");

    let stats = resolver.stats().snapshot();
    assert_eq!(stats.classify_calls, 0);
    assert_eq!(stats.direct_hits, 1);
    assert_eq!(resolver.cache_entries().get("5/3/7").map(String::as_str), Some("ZZ"));
}

#[test]
fn stats_since_counts_only_the_later_queries() {
    let resolver = straddle_world();
    for x in 0..4 {
        resolver.resolve(&tile(3, x, 3));
    }
    let start = resolver.stats().snapshot();

    assert_eq!(resolver.resolve(&tile(3, 4, 3)), "AA|BB");
    assert_eq!(resolver.resolve(&tile(3, 4, 3)), "AA|BB");
    let delta = resolver.stats().snapshot().since(&start);

    assert_eq!(delta.queries, 2);
    assert_eq!(delta.direct_hits, 1);
    assert!(delta.classify_calls >= 1);
    assert!(delta.classify_calls < resolver.stats().snapshot().classify_calls);
    assert_eq!(start.since(&resolver.stats().snapshot()), StatsSnapshot::default());
}
