use std::collections::BTreeMap;

use geo::Intersects;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::geometry::{self, Region};
use crate::progress::progress_for_phase;
use crate::tile::{self, TileCoord};

/// Zoom at which region geometry is pre-clipped into cells.
pub const SPLIT_ZOOM: u8 = 8;

/// One region as seen from inside a partition cell.
///
/// The overlay only returns areas, so contact a region makes with the cell
/// border outside its clipped area (a vertex or a shared edge) is lost by the
/// clip. `edge_contact` marks regions that meet the border at all; tiles on
/// the border of the cell test those against the unclipped region
/// `regions[source]` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellCandidate {
    pub region: Region,
    pub source: usize,
    pub edge_contact: bool,
}

impl CellCandidate {
    /// The geometry to test for a tile; `on_edge` tells whether the tile
    /// touches the cell border.
    pub fn select<'a>(&'a self, regions: &'a [Region], on_edge: bool) -> &'a Region {
        if on_edge && self.edge_contact {
            regions.get(self.source).unwrap_or(&self.region)
        } else {
            &self.region
        }
    }
}

/// Regions pre-clipped to every tile of one reference zoom.
///
/// A tile at or below the partition zoom only has to be tested against the
/// candidates of its enclosing cell. Empty cells are stored as empty lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Partition {
    zoom: u8,
    cells: BTreeMap<(u32, u32), Vec<CellCandidate>>,
}

impl Partition {
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Candidates of the cell enclosing `tile`; `None` above the partition
    /// zoom or when the cell was never built.
    pub fn cell(&self, tile: &TileCoord) -> Option<&[CellCandidate]> {
        if tile.zoom < self.zoom {
            return None;
        }
        let key = tile.ancestor(self.zoom);
        self.cells.get(&(key.x, key.y)).map(Vec::as_slice)
    }

    /// Whether `tile` shares part of its border with its enclosing cell.
    pub fn on_cell_edge(&self, tile: &TileCoord) -> bool {
        if tile.zoom <= self.zoom {
            return true;
        }
        let mask = (1u32 << (tile.zoom - self.zoom)) - 1;
        let (x, y) = (tile.x & mask, tile.y & mask);
        x == 0 || x == mask || y == 0 || y == mask
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn candidate_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

/// Builds the cells; `source` indices point into `regions`, which must be
/// the same slice the resolver scans.
pub fn partition(regions: &[Region], zoom: u8, no_progress: bool) -> Partition {
    let total = tile::tiles_per_side(zoom).pow(2);
    let progress = progress_for_phase("partitioning", "cells", Some(total), no_progress);
    let cells: BTreeMap<(u32, u32), Vec<CellCandidate>> = tile::world(zoom)
        .par_bridge()
        .map(|cell| {
            let candidates = clip_to_cell(regions, &cell);
            if let Some(progress) = progress.as_ref() {
                progress.inc(1);
            }
            ((cell.x, cell.y), candidates)
        })
        .collect();
    if let Some(progress) = progress {
        progress.finish();
    }
    let result = Partition { zoom, cells };
    info!(
        zoom,
        cells = result.len(),
        candidates = result.candidate_count(),
        "partition built"
    );
    result
}

/// Every region touching `cell`, clipped to the cell box. Regions that only
/// touch the cell along its border keep their full geometry.
pub fn clip_to_cell(regions: &[Region], cell: &TileCoord) -> Vec<CellCandidate> {
    let rect = cell.rect();
    let border = rect.to_polygon().exterior().clone();
    regions
        .iter()
        .enumerate()
        .filter(|(_, region)| region.intersects_rect(&rect))
        .filter_map(|(source, region)| {
            let edge_contact = region.geometry.intersects(&border);
            let clipped = geometry::clip(&region.geometry, &rect);
            let region = if geometry::is_empty(&clipped) {
                region.clone()
            } else {
                Region::new(region.iso.clone(), clipped)?
            };
            Some(CellCandidate {
                region,
                source,
                edge_contact,
            })
        })
        .collect()
}
