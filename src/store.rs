use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geo::BoundingRect;
use geo_types::{Geometry, MultiPolygon, Polygon, Rect};
use geojson::{Feature, GeoJson, feature::Id};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Relations tagged with an ISO code that are not sovereign boundaries.
pub const SKIPPED_RELATIONS: &[i64] = &[11980, 1111111, 1362232, 1401925];

const ISO_PROPERTIES: &[&str] = &["ISO3166-1", "ISO3166-1:alpha2", "iso"];
const ID_PROPERTIES: &[&str] = &["osm_id", "id"];

/// Restricts a run to one country code or one boundary relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Country(String),
    Relation(i64),
}

impl Target {
    pub fn matches(&self, iso: &str, osm_id: Option<i64>) -> bool {
        match self {
            Target::Country(code) => iso == code,
            Target::Relation(id) => osm_id == Some(*id),
        }
    }
}

/// One boundary part as supplied by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCountry {
    pub osm_id: Option<i64>,
    pub iso: String,
    pub geometry: MultiPolygon<f64>,
    pub bbox: Rect<f64>,
}

impl RawCountry {
    pub fn new(iso: impl Into<String>, osm_id: Option<i64>, geometry: MultiPolygon<f64>) -> Option<Self> {
        let bbox = geometry.bounding_rect()?;
        Some(Self {
            osm_id,
            iso: iso.into(),
            geometry,
            bbox,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    countries: Vec<RawCountry>,
}

impl GeometryStore {
    pub fn new(countries: Vec<RawCountry>) -> Self {
        Self { countries }
    }

    /// Loads a FeatureCollection, a single Feature, or a directory of
    /// `{ISO}-{osm_id}.geojson` files.
    pub fn load(path: &Path, target: Option<&Target>) -> Result<Self> {
        let files = source_files(path)?;
        let mut seen = HashSet::new();
        let mut countries = Vec::new();
        for file in files.iter() {
            let text = fs::read_to_string(file)
                .with_context(|| format!("read boundary file {}", file.display()))?;
            let geojson: GeoJson = text
                .parse()
                .with_context(|| format!("parse GeoJSON {}", file.display()))?;
            let (stem_iso, stem_id) = parse_file_stem(file);
            let features = match geojson {
                GeoJson::FeatureCollection(collection) => collection.features,
                GeoJson::Feature(feature) => vec![feature],
                GeoJson::Geometry(geometry) => vec![Feature {
                    bbox: None,
                    geometry: Some(geometry),
                    id: None,
                    properties: None,
                    foreign_members: None,
                }],
            };
            for feature in features {
                let iso = feature_iso(&feature).or_else(|| stem_iso.clone());
                let osm_id = feature_osm_id(&feature).or(stem_id);
                let iso = match (iso, target, osm_id) {
                    (Some(iso), _, _) if !iso.is_empty() => iso,
                    (_, Some(Target::Relation(_)), Some(id)) => format!("r{id}"),
                    _ => continue,
                };
                if !accept(&iso, osm_id, target) {
                    continue;
                }
                if let Some(id) = osm_id {
                    if !seen.insert((id, iso.clone())) {
                        continue;
                    }
                }
                let Some(geometry) = feature.geometry else {
                    warn!(iso = %iso, osm_id = ?osm_id, "boundary feature without geometry");
                    continue;
                };
                let geometry = Geometry::<f64>::try_from(geometry)
                    .with_context(|| format!("convert geometry of {iso} in {}", file.display()))?;
                let polygons = polygons_of(geometry);
                if polygons.is_empty() {
                    warn!(iso = %iso, osm_id = ?osm_id, "boundary feature has no polygons");
                    continue;
                }
                debug!(iso = %iso, osm_id = ?osm_id, parts = polygons.len(), "loaded boundary");
                if let Some(country) = RawCountry::new(iso, osm_id, MultiPolygon::new(polygons)) {
                    countries.push(country);
                }
            }
        }
        info!(countries = countries.len(), files = files.len(), "boundary data loaded");
        Ok(Self { countries })
    }

    pub fn countries(&self) -> &[RawCountry] {
        &self.countries
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Provider filtering rules: skip non-sovereign relations and non alpha-2
/// codes for world runs, honor the target otherwise.
pub fn accept(iso: &str, osm_id: Option<i64>, target: Option<&Target>) -> bool {
    if target.is_none() && osm_id.is_some_and(|id| SKIPPED_RELATIONS.contains(&id)) {
        return false;
    }
    if !matches!(target, Some(Target::Relation(_))) && iso.chars().count() != 2 {
        return false;
    }
    target.is_none_or(|target| target.matches(iso, osm_id))
}

/// Boundary files behind `path`, sorted so fingerprints are stable.
pub fn source_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(path)
        .with_context(|| format!("read boundary directory {}", path.display()))?
    {
        let entry = entry.context("read boundary directory entry")?;
        let file = entry.path();
        let ext = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        if matches!(ext.as_deref(), Some("geojson") | Some("json")) {
            files.push(file);
        }
    }
    if files.is_empty() {
        anyhow::bail!("no boundary files found in {}", path.display());
    }
    files.sort();
    Ok(files)
}

fn parse_file_stem(file: &Path) -> (Option<String>, Option<i64>) {
    let Some(stem) = file.file_stem().and_then(|stem| stem.to_str()) else {
        return (None, None);
    };
    match stem.split_once('-') {
        Some((iso, id)) => (Some(iso.to_string()), id.parse().ok()),
        None => (None, None),
    }
}

fn feature_iso(feature: &Feature) -> Option<String> {
    ISO_PROPERTIES
        .iter()
        .filter_map(|key| feature.property(key))
        .filter_map(|value| value.as_str())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn feature_osm_id(feature: &Feature) -> Option<i64> {
    let from_props = ID_PROPERTIES
        .iter()
        .filter_map(|key| feature.property(key))
        .find_map(json_to_id);
    from_props.or_else(|| match feature.id.as_ref()? {
        Id::String(value) => value.trim_start_matches("relation/").parse().ok(),
        Id::Number(value) => value.as_i64(),
    })
}

fn json_to_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

fn polygons_of(geometry: Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => vec![polygon],
        Geometry::MultiPolygon(multi) => multi.0,
        Geometry::Rect(rect) => vec![rect.to_polygon()],
        Geometry::Triangle(triangle) => vec![triangle.to_polygon()],
        Geometry::GeometryCollection(collection) => {
            collection.0.into_iter().flat_map(polygons_of).collect()
        }
        _ => Vec::new(),
    }
}
