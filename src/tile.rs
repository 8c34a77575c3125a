use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use geo_types::{Rect, coord};
use serde::{Deserialize, Serialize};

use crate::error::TileError;

pub const MAX_SUPPORTED_ZOOM: u8 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

/// Lon/lat box of a tile, named after the compass sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl TileBounds {
    pub fn to_rect(self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }
}

impl TileCoord {
    pub fn new(zoom: u8, x: u32, y: u32) -> Result<Self, TileError> {
        if zoom > MAX_SUPPORTED_ZOOM {
            return Err(TileError::Zoom(zoom));
        }
        let dim = tiles_per_side(zoom);
        if u64::from(x) >= dim || u64::from(y) >= dim {
            return Err(TileError::OutOfRange { zoom, x, y });
        }
        Ok(Self { zoom, x, y })
    }

    /// Cache key form, `z/x/y`.
    pub fn path(&self) -> String {
        format!("{}/{}/{}", self.zoom, self.x, self.y)
    }

    pub fn bounds(&self) -> TileBounds {
        let n = tiles_per_side(self.zoom) as f64;
        TileBounds {
            west: tile_lon(self.x as f64, n),
            south: tile_lat(self.y as f64 + 1.0, n),
            east: tile_lon(self.x as f64 + 1.0, n),
            north: tile_lat(self.y as f64, n),
        }
    }

    pub fn rect(&self) -> Rect<f64> {
        self.bounds().to_rect()
    }

    /// Center of the bounding box as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        let b = self.bounds();
        (
            b.south + (b.north - b.south) / 2.0,
            b.west + (b.east - b.west) / 2.0,
        )
    }

    /// Ancestor at `zoom`; returns `self` when `zoom >= self.zoom`.
    pub fn ancestor(&self, zoom: u8) -> TileCoord {
        if zoom >= self.zoom {
            return *self;
        }
        let shift = self.zoom - zoom;
        TileCoord {
            zoom,
            x: self.x >> shift,
            y: self.y >> shift,
        }
    }

    pub fn parent(&self) -> Option<TileCoord> {
        if self.zoom == 0 {
            None
        } else {
            Some(self.ancestor(self.zoom - 1))
        }
    }

    pub fn children(&self) -> [TileCoord; 4] {
        let zoom = self.zoom + 1;
        let (x, y) = (self.x * 2, self.y * 2);
        [
            TileCoord { zoom, x, y },
            TileCoord { zoom, x: x + 1, y },
            TileCoord { zoom, x: x + 1, y: y + 1 },
            TileCoord { zoom, x, y: y + 1 },
        ]
    }

    pub fn is_descendant_of(&self, other: &TileCoord) -> bool {
        self.zoom > other.zoom && self.ancestor(other.zoom) == *other
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for TileCoord {
    type Err = TileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let format_err = || TileError::Format(trimmed.to_string());
        let mut parts = trimmed.split('/');
        let zoom_str = parts.next().ok_or_else(format_err)?;
        let x_str = parts.next().ok_or_else(format_err)?;
        let y_str = parts.next().ok_or_else(format_err)?;
        if parts.next().is_some() {
            return Err(format_err());
        }
        let zoom: u8 = zoom_str.parse().map_err(|_| format_err())?;
        let x: u32 = x_str.parse().map_err(|_| format_err())?;
        let y: u32 = y_str.parse().map_err(|_| format_err())?;
        TileCoord::new(zoom, x, y)
    }
}

pub fn tiles_per_side(zoom: u8) -> u64 {
    1u64 << zoom
}

/// Every tile of the world at `zoom`, column-major like the tile logs are walked.
pub fn world(zoom: u8) -> impl Iterator<Item = TileCoord> {
    let dim = tiles_per_side(zoom) as u32;
    (0..dim).flat_map(move |x| (0..dim).map(move |y| TileCoord { zoom, x, y }))
}

fn tile_lon(x: f64, n: f64) -> f64 {
    x / n * 360.0 - 180.0
}

fn tile_lat(y: f64, n: f64) -> f64 {
    let merc = PI * (1.0 - 2.0 * y / n);
    merc.sinh().atan().to_degrees()
}
