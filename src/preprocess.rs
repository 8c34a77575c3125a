use std::collections::BTreeMap;

use geo_types::{MultiPolygon, Rect, coord};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::GeometryError;
use crate::geometry::{self, Region, UNKNOWN_ISO};
use crate::store::{RawCountry, Target};

/// Edge of a negative-space grid cell, in degrees.
pub const NEGATIVE_STEP: u32 = 10;

#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    pub negative_step: u32,
    pub single_target: Option<Target>,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            negative_step: NEGATIVE_STEP,
            single_target: None,
        }
    }
}

/// One merged region per ISO code plus the unclaimed remainder of the world grid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Normalized {
    pub countries: Vec<Region>,
    pub negatives: Vec<Region>,
    /// Parts dropped during repair, kept with the artifact so reuse still reports them.
    pub failures: Vec<GeometryError>,
}

impl Normalized {
    /// Scan list used by classification: every country split into its parts,
    /// followed by the negative regions.
    pub fn candidates(&self) -> Vec<Region> {
        self.countries
            .iter()
            .flat_map(|country| country.parts())
            .chain(self.negatives.iter().cloned())
            .collect()
    }

    pub fn candidate_count(&self) -> usize {
        let parts: usize = self.countries.iter().map(|country| country.geometry.0.len()).sum();
        parts + self.negatives.len()
    }
}

struct Merged {
    region: Option<Region>,
    failures: Vec<GeometryError>,
}

pub fn normalize(raw: &[RawCountry], options: &PreprocessOptions) -> Normalized {
    let mut grouped: BTreeMap<&str, Vec<&RawCountry>> = BTreeMap::new();
    for country in raw.iter() {
        if let Some(target) = options.single_target.as_ref() {
            if !target.matches(&country.iso, country.osm_id) {
                continue;
            }
        }
        grouped.entry(country.iso.as_str()).or_default().push(country);
    }
    info!(codes = grouped.len(), parts = raw.len(), "grouped boundaries");

    let merged: Vec<Merged> = grouped
        .into_par_iter()
        .map(|(iso, parts)| merge_parts(iso, &parts))
        .collect();

    let mut countries = Vec::new();
    let mut failures = Vec::new();
    for item in merged {
        failures.extend(item.failures);
        if let Some(region) = item.region {
            countries.push(region);
        }
    }

    let parts: Vec<Region> = countries.iter().flat_map(|country| country.parts()).collect();
    let mut negatives = negative_regions(&parts, options.negative_step);
    if options.single_target.is_some() {
        let before = negatives.len();
        negatives.retain(|negative| {
            parts
                .iter()
                .any(|part| geometry::bbox_overlaps(&part.bbox, &negative.bbox))
        });
        debug!(dropped = before - negatives.len(), "dropped unreachable negative regions");
    }

    info!(
        countries = countries.len(),
        negatives = negatives.len(),
        failures = failures.len(),
        "normalized boundaries"
    );
    Normalized {
        countries,
        negatives,
        failures,
    }
}

fn merge_parts(iso: &str, parts: &[&RawCountry]) -> Merged {
    let mut repaired = Vec::with_capacity(parts.len());
    let mut failures = Vec::new();
    for part in parts.iter() {
        match geometry::repair(&part.geometry) {
            Ok(geometry) => repaired.push(geometry),
            Err(reason) => {
                warn!(iso = %iso, osm_id = ?part.osm_id, reason = %reason, "dropping invalid boundary part");
                failures.push(GeometryError::InvalidGeometry {
                    iso: iso.to_string(),
                    osm_id: part.osm_id,
                    reason,
                });
            }
        }
    }

    let merged = match repaired.len() {
        0 => None,
        1 => repaired.pop(),
        _ => Some(geometry::union_all(repaired.iter())),
    };
    let region = merged.and_then(|geometry| Region::new(iso, geometry));
    if let Some(region) = region.as_ref() {
        log_shape(region);
    }
    Merged { region, failures }
}

fn log_shape(region: &Region) {
    let area = geometry::area(&region.geometry);
    let bbox_area = geometry::rect_area(&region.bbox);
    let parts_bbox_area: f64 = region.parts().map(|part| geometry::rect_area(&part.bbox)).sum();
    let ratio = if bbox_area > 0.0 {
        parts_bbox_area / bbox_area * 100.0
    } else {
        0.0
    };
    debug!(
        iso = %region.iso,
        parts = region.geometry.0.len(),
        area = %format!("{area:.2}"),
        bbox_area = %format!("{bbox_area:.2}"),
        parts_bbox_pct = %format!("{ratio:.0}"),
        "merged boundary"
    );
}

/// Cells of `step` degrees covering lon -180..180 and lat -90..90.
pub fn world_grid(step: u32) -> Vec<Rect<f64>> {
    let step = step.max(1) as f64;
    let mut cells = Vec::new();
    let mut west = -180.0;
    while west < 180.0 {
        let east = (west + step).min(180.0);
        let mut south = -90.0;
        while south < 90.0 {
            let north = (south + step).min(90.0);
            cells.push(Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north }));
            south = north;
        }
        west = east;
    }
    cells
}

fn negative_regions(parts: &[Region], step: u32) -> Vec<Region> {
    world_grid(step)
        .into_par_iter()
        .filter_map(|cell| {
            let mut remainder: MultiPolygon<f64> = geometry::to_multi(cell.to_polygon());
            for part in parts.iter() {
                if !part.intersects_rect(&cell) {
                    continue;
                }
                remainder = geometry::subtract(&remainder, &part.geometry);
                if geometry::is_empty(&remainder) {
                    return None;
                }
            }
            Region::new(UNKNOWN_ISO, remainder)
        })
        .collect()
}
