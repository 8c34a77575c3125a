use tile_sovereignty::error::TileError;
use tile_sovereignty::tile::{TileCoord, tiles_per_side, world};

fn tile(z: u8, x: u32, y: u32) -> TileCoord {
    TileCoord::new(z, x, y).expect("tile")
}

#[test]
fn parse_tile_path_round_trips_through_display() {
    let coord: TileCoord = "12/1536/1689".parse().expect("parse");
    assert_eq!(coord, tile(12, 1536, 1689));
    assert_eq!(coord.to_string(), "12/1536/1689");
    assert_eq!(coord.path(), "12/1536/1689");
}

#[test]
fn parse_tile_path_rejects_bad_input() {
    assert_eq!(
        "a/b/c".parse::<TileCoord>(),
        Err(TileError::Format("a/b/c".to_string()))
    );
    assert!(matches!("1/0".parse::<TileCoord>(), Err(TileError::Format(_))));
    assert!(matches!("1/0/0/0".parse::<TileCoord>(), Err(TileError::Format(_))));
    assert_eq!("25/0/0".parse::<TileCoord>(), Err(TileError::Zoom(25)));
    assert_eq!(
        "3/8/0".parse::<TileCoord>(),
        Err(TileError::OutOfRange { zoom: 3, x: 8, y: 0 })
    );
}

#[test]
fn bounds_follow_web_mercator() {
    let b = tile(0, 0, 0).bounds();
    assert_eq!(b.west, -180.0);
    assert_eq!(b.east, 180.0);
    assert!((b.north - 85.051_128_78).abs() < 1e-6);
    assert!((b.south + 85.051_128_78).abs() < 1e-6);

    let b = tile(3, 4, 3).bounds();
    assert_eq!(b.west, 0.0);
    assert_eq!(b.east, 45.0);
    assert!(b.south.abs() < 1e-9);
    assert!((b.north - 40.979_898).abs() < 1e-5);
}

#[test]
fn center_is_middle_of_bounds() {
    let (lat, lon) = tile(1, 0, 0).center();
    assert!((lon + 90.0).abs() < 1e-9);
    assert!((lat - 85.051_128_78 / 2.0).abs() < 1e-6);
}

#[test]
fn ancestors_and_children_follow_the_quad_tree() {
    let t = tile(12, 1536, 1689);
    assert_eq!(t.ancestor(2), tile(2, 1, 1));
    assert_eq!(t.ancestor(12), t);
    assert_eq!(t.ancestor(20), t);
    assert_eq!(t.parent(), Some(tile(11, 768, 844)));
    assert_eq!(tile(0, 0, 0).parent(), None);

    let children = tile(3, 4, 3).children();
    assert_eq!(
        children,
        [tile(4, 8, 6), tile(4, 9, 6), tile(4, 9, 7), tile(4, 8, 7)]
    );
    for child in children.iter() {
        assert_eq!(child.parent(), Some(tile(3, 4, 3)));
        assert!(child.is_descendant_of(&tile(3, 4, 3)));
        assert!(child.is_descendant_of(&tile(0, 0, 0)));
    }
    assert!(!tile(3, 4, 3).is_descendant_of(&tile(3, 4, 3)));
    assert!(!tile(4, 0, 0).is_descendant_of(&tile(3, 4, 3)));
}

#[test]
fn world_enumerates_every_tile_once() {
    assert_eq!(tiles_per_side(3), 8);
    let tiles: Vec<TileCoord> = world(2).collect();
    assert_eq!(tiles.len(), 16);
    assert_eq!(tiles[0], tile(2, 0, 0));
    assert_eq!(tiles[1], tile(2, 0, 1));
    assert_eq!(tiles[15], tile(2, 3, 3));
    let mut sorted = tiles.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 16);
}
