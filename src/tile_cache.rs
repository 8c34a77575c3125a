use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::CacheError;
use crate::resolver::is_valid_label;
use crate::tile::TileCoord;

/// Persisted tile labels, laid out on disk as `[min_cache_zoom, {"z/x/y": label}]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedCache {
    pub min_cache_zoom: u8,
    pub entries: Vec<(String, String)>,
    pub rejected: Vec<CacheError>,
}

/// Checks one persisted entry; a bad entry is dropped and recomputed later.
pub fn validate_entry(key: &str, label: &Value) -> Result<String, CacheError> {
    let corrupt = |reason: String| CacheError::Corrupt {
        key: key.to_string(),
        reason,
    };
    let tile: TileCoord = key.parse().map_err(|err| corrupt(format!("{err}")))?;
    if tile.path() != key {
        return Err(corrupt("key is not in canonical z/x/y form".to_string()));
    }
    let label = label
        .as_str()
        .ok_or_else(|| corrupt("label is not a string".to_string()))?;
    if !is_valid_label(label) {
        return Err(corrupt(format!("malformed label {label:?}")));
    }
    Ok(label.to_string())
}

/// Returns `Ok(None)` when no cache has been written yet.
pub fn load_tile_cache(path: &Path) -> Result<Option<LoadedCache>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("open tile cache {}", path.display()))?;
    let (min_cache_zoom, raw): (u8, BTreeMap<String, Value>) =
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse tile cache {}", path.display()))?;

    let mut entries = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();
    for (key, label) in raw.iter() {
        match validate_entry(key, label) {
            Ok(label) => entries.push((key.clone(), label)),
            Err(err) => {
                warn!(error = %err, "discarding tile cache entry");
                rejected.push(err);
            }
        }
    }
    info!(
        path = %path.display(),
        min_cache_zoom,
        entries = entries.len(),
        rejected = rejected.len(),
        "tile cache loaded"
    );
    Ok(Some(LoadedCache {
        min_cache_zoom,
        entries,
        rejected,
    }))
}

/// Writes the cache atomically next to its final location.
pub fn save_tile_cache(path: &Path, min_cache_zoom: u8, entries: &BTreeMap<String, String>) -> Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, &(min_cache_zoom, entries)).context("write tile cache")?;
        writer.flush().context("flush tile cache")?;
    }
    tmp.persist(path)
        .with_context(|| format!("persist tile cache {}", path.display()))?;
    info!(path = %path.display(), entries = entries.len(), "tile cache saved");
    Ok(())
}
