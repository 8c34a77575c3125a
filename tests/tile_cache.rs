use std::collections::BTreeMap;
use std::fs;

use serde_json::json;
use tempfile::tempdir;

use tile_sovereignty::error::CacheError;
use tile_sovereignty::tile_cache::{load_tile_cache, save_tile_cache, validate_entry};

#[test]
fn saved_cache_loads_back() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tiles.json");
    let mut entries = BTreeMap::new();
    entries.insert("0/0/0".to_string(), "??|AA|BB".to_string());
    entries.insert("2/0/1".to_string(), "??".to_string());
    entries.insert("4/8/7".to_string(), "AA".to_string());

    save_tile_cache(&path, 2, &entries).expect("save");
    let text = fs::read_to_string(&path).expect("read");
    assert!(text.starts_with("[2,{"));

    let loaded = load_tile_cache(&path).expect("load").expect("cache");
    assert_eq!(loaded.min_cache_zoom, 2);
    assert!(loaded.rejected.is_empty());
    let restored: BTreeMap<String, String> = loaded.entries.into_iter().collect();
    assert_eq!(restored, entries);
}

#[test]
fn missing_cache_is_not_an_error() {
    let dir = tempdir().expect("tempdir");
    let loaded = load_tile_cache(&dir.path().join("absent.json")).expect("load");
    assert!(loaded.is_none());
}

#[test]
fn unreadable_cache_file_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tiles.json");
    fs::write(&path, "{not json").expect("write");
    assert!(load_tile_cache(&path).is_err());
}

#[test]
fn corrupt_entries_are_dropped() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tiles.json");
    let raw = json!([3, {
        "1/0/0": "AA",
        "2/0/1": "??|AA",
        "bad": "AA",
        "1/5/0": "AA",
        "01/0/0": "AA",
        "2/0/0": "BB|AA",
        "2/1/1": 7,
        "2/2/2": "",
        "2/3/3": "A A",
    }]);
    fs::write(&path, raw.to_string()).expect("write");

    let loaded = load_tile_cache(&path).expect("load").expect("cache");
    assert_eq!(loaded.min_cache_zoom, 3);
    let keys: Vec<&str> = loaded.entries.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["1/0/0", "2/0/1"]);
    assert_eq!(loaded.rejected.len(), 7);
}

#[test]
fn validate_entry_explains_rejections() {
    assert_eq!(validate_entry("3/4/3", &json!("AA|BB")), Ok("AA|BB".to_string()));
    let err = validate_entry("2/0/0", &json!("BB|AA")).expect_err("unsorted");
    assert!(matches!(err, CacheError::Corrupt { ref key, .. } if key == "2/0/0"));
    assert!(validate_entry("2/0/0", &json!(null)).is_err());
    assert!(validate_entry("2/9/0", &json!("AA")).is_err());
}
