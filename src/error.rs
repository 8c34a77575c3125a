use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    #[error("tile must be in z/x/y format: {0:?}")]
    Format(String),
    #[error("tile zoom {0} exceeds the supported maximum")]
    Zoom(u8),
    #[error("tile {zoom}/{x}/{y} is outside the world grid")]
    OutOfRange { zoom: u8, x: u32, y: u32 },
}

/// A boundary part that could not be turned into a usable polygon.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GeometryError {
    #[error("invalid geometry for {iso} (relation {osm_id:?}): {reason}")]
    InvalidGeometry {
        iso: String,
        osm_id: Option<i64>,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("corrupt tile cache entry {key:?}: {reason}")]
    Corrupt { key: String, reason: String },
}
