//! Thin adapter over the `geo` crate: every planar operation the engine needs
//! (repair, union, difference, clip, intersection tests) goes through here.
//!
//! Coordinates are lon/lat degrees treated as Cartesian x/y.

use geo::{Area, BooleanOps, BoundingRect, CoordsIter, Intersects, unary_union};
use geo_types::{MultiPolygon, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// Label for area claimed by no country.
pub const UNKNOWN_ISO: &str = "??";

/// A country (or unclaimed remainder, `"??"`) with its cached bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub iso: String,
    pub geometry: MultiPolygon<f64>,
    pub bbox: Rect<f64>,
}

impl Region {
    /// Returns `None` for geometry without extent.
    pub fn new(iso: impl Into<String>, geometry: MultiPolygon<f64>) -> Option<Self> {
        let bbox = geometry.bounding_rect()?;
        Some(Self {
            iso: iso.into(),
            geometry,
            bbox,
        })
    }

    pub fn is_unknown(&self) -> bool {
        self.iso == UNKNOWN_ISO
    }

    /// One region per polygon part, each with its own tighter bbox.
    pub fn parts(&self) -> impl Iterator<Item = Region> + '_ {
        self.geometry
            .0
            .iter()
            .filter_map(|polygon| Region::new(self.iso.clone(), MultiPolygon::new(vec![polygon.clone()])))
    }

    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        bbox_overlaps(&self.bbox, rect) && intersects_rect(&self.geometry, rect)
    }
}

pub fn to_multi(polygon: Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon])
}

/// Inclusive box overlap; boxes sharing an edge overlap.
pub fn bbox_overlaps(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && a.max().x >= b.min().x && a.max().y >= b.min().y && a.min().y <= b.max().y
}

pub fn intersects_rect(geometry: &MultiPolygon<f64>, rect: &Rect<f64>) -> bool {
    geometry.intersects(&rect.to_polygon())
}

/// Zero-width repair: re-noding the rings through the overlay engine resolves
/// self-intersections and overlapping parts.
pub fn repair(geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, String> {
    if geometry.0.is_empty() {
        return Err("geometry has no polygons".to_string());
    }
    if let Some(coord) = geometry
        .coords_iter()
        .find(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(format!("non-finite coordinate ({}, {})", coord.x, coord.y));
    }
    if geometry
        .0
        .iter()
        .any(|polygon| polygon.exterior().0.len() < 4)
    {
        return Err("ring with fewer than four positions".to_string());
    }
    let repaired = unary_union(geometry.0.iter());
    if is_empty(&repaired) {
        return Err("geometry has no area after repair".to_string());
    }
    Ok(repaired)
}

pub fn union_all<'a>(parts: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> MultiPolygon<f64> {
    unary_union(parts)
}

pub fn subtract(geometry: &MultiPolygon<f64>, other: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.difference(other)
}

pub fn clip(geometry: &MultiPolygon<f64>, rect: &Rect<f64>) -> MultiPolygon<f64> {
    geometry.intersection(&rect.to_polygon())
}

pub fn is_empty(geometry: &MultiPolygon<f64>) -> bool {
    geometry.0.is_empty() || geometry.unsigned_area() <= 0.0
}

pub fn area(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.unsigned_area()
}

pub fn rect_area(rect: &Rect<f64>) -> f64 {
    rect.width() * rect.height()
}
