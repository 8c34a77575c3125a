use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::artifact::{artifact_path, fingerprint, load_artifact, store_artifact};
use crate::partition::{Partition, SPLIT_ZOOM, partition};
use crate::preprocess::{NEGATIVE_STEP, Normalized, PreprocessOptions, normalize};
use crate::resolver::{Resolver, ResolverOptions, WarmOptions, warm};
use crate::store::{GeometryStore, Target, source_files};
use crate::tile_cache::{load_tile_cache, save_tile_cache};

#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub cache_dir: Option<PathBuf>,
    pub target: Option<Target>,
    pub negative_step: u32,
    pub partition_zoom: u8,
    pub no_progress: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            cache_dir: None,
            target: None,
            negative_step: NEGATIVE_STEP,
            partition_zoom: SPLIT_ZOOM,
            no_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepareReport {
    pub key: Option<String>,
    pub raw_parts: Option<usize>,
    pub countries: usize,
    pub negatives: usize,
    pub candidates: usize,
    pub partition_zoom: u8,
    pub partition_cells: usize,
    pub partition_candidates: usize,
    pub failures: Vec<String>,
    pub reused_normalized: bool,
    pub reused_partition: bool,
}

/// Output of the preprocessing stages, ready to back a [`Resolver`].
#[derive(Debug, Clone)]
pub struct Prepared {
    pub key: Option<String>,
    pub normalized: Normalized,
    pub partition: Partition,
    pub report: PrepareReport,
}

#[derive(Serialize)]
struct NormalizeParams {
    target: Option<String>,
    negative_step: u32,
}

fn target_tag(target: Option<&Target>) -> Option<String> {
    target.map(|target| match target {
        Target::Country(iso) => format!("country:{iso}"),
        Target::Relation(id) => format!("relation:{id}"),
    })
}

impl Prepared {
    pub fn resolver(&self, options: ResolverOptions) -> Resolver {
        Resolver::new(self.normalized.candidates(), self.partition.clone(), options)
    }

    pub fn into_resolver(self, options: ResolverOptions) -> Resolver {
        Resolver::new(self.normalized.candidates(), self.partition, options)
    }

    pub fn tile_cache_path(&self, dir: &Path) -> Option<PathBuf> {
        self.key
            .as_ref()
            .map(|key| dir.join(format!("tiles-{key}.json")))
    }
}

/// Runs the stages in memory for an already loaded store.
pub fn prepare_store(store: &GeometryStore, options: &PrepareOptions) -> Prepared {
    let normalized = normalize(store.countries(), &preprocess_options(options));
    let partition = partition(&normalized.candidates(), options.partition_zoom, options.no_progress);
    let report = build_report(None, Some(store.len()), &normalized, &partition, false, false);
    Prepared {
        key: None,
        normalized,
        partition,
        report,
    }
}

/// Loads boundaries from `source` and runs the stages, reusing artifacts in
/// `cache_dir` whose fingerprint matches the input.
pub fn prepare(source: &Path, options: &PrepareOptions) -> Result<Prepared> {
    let Some(cache_dir) = options.cache_dir.as_deref() else {
        let store = GeometryStore::load(source, options.target.as_ref())?;
        return Ok(prepare_store(&store, options));
    };

    let files = source_files(source)?;
    let key = fingerprint(
        &files,
        &NormalizeParams {
            target: target_tag(options.target.as_ref()),
            negative_step: options.negative_step,
        },
    )?;
    info!(key = %key, "boundary fingerprint");

    let normalized_path = artifact_path(cache_dir, "normalized", &key);
    let mut raw_parts = None;
    let (normalized, reused_normalized) = match load_artifact::<Normalized>(&normalized_path)? {
        Some(normalized) => (normalized, true),
        None => {
            let store = GeometryStore::load(source, options.target.as_ref())?;
            raw_parts = Some(store.len());
            let normalized = normalize(store.countries(), &preprocess_options(options));
            store_artifact(&normalized_path, &normalized)
                .context("store normalized regions")?;
            (normalized, false)
        }
    };

    let partition_key = format!("z{}-{key}", options.partition_zoom);
    let partition_path = artifact_path(cache_dir, "partition", &partition_key);
    let (partition, reused_partition) = match load_artifact::<Partition>(&partition_path)? {
        Some(partition) if partition.zoom() == options.partition_zoom => (partition, true),
        _ => {
            let partition = partition(&normalized.candidates(), options.partition_zoom, options.no_progress);
            store_artifact(&partition_path, &partition).context("store partition")?;
            (partition, false)
        }
    };

    let report = build_report(
        Some(key.clone()),
        raw_parts,
        &normalized,
        &partition,
        reused_normalized,
        reused_partition,
    );
    Ok(Prepared {
        key: Some(key),
        normalized,
        partition,
        report,
    })
}

fn preprocess_options(options: &PrepareOptions) -> PreprocessOptions {
    PreprocessOptions {
        negative_step: options.negative_step,
        single_target: options.target.clone(),
    }
}

fn build_report(
    key: Option<String>,
    raw_parts: Option<usize>,
    normalized: &Normalized,
    partition: &Partition,
    reused_normalized: bool,
    reused_partition: bool,
) -> PrepareReport {
    PrepareReport {
        key,
        raw_parts,
        countries: normalized.countries.len(),
        negatives: normalized.negatives.len(),
        candidates: normalized.candidate_count(),
        partition_zoom: partition.zoom(),
        partition_cells: partition.len(),
        partition_candidates: partition.candidate_count(),
        failures: normalized.failures.iter().map(|err| err.to_string()).collect(),
        reused_normalized,
        reused_partition,
    }
}

/// A warmed resolver plus where its labels are persisted.
pub struct Session {
    pub report: PrepareReport,
    pub resolver: Resolver,
    pub tile_cache: Option<PathBuf>,
}

impl Session {
    /// Prepares the stages, restores persisted labels, and warms the cache.
    pub fn open(
        source: &Path,
        options: &PrepareOptions,
        warm_options: &WarmOptions,
        cancel: Option<&AtomicBool>,
    ) -> Result<Self> {
        let prepared = prepare(source, options)?;
        let report = prepared.report.clone();
        let tile_cache = options
            .cache_dir
            .as_deref()
            .and_then(|dir| prepared.tile_cache_path(dir));
        let mut resolver = prepared.into_resolver(ResolverOptions::default());

        let mut warm_options = warm_options.clone();
        if let Some(path) = tile_cache.as_deref() {
            if let Some(loaded) = load_tile_cache(path)? {
                resolver.seed(loaded.entries);
                if warm_options.preset_min_zoom.is_none() {
                    warm_options.preset_min_zoom = Some(loaded.min_cache_zoom);
                }
            }
        }
        warm(&mut resolver, &warm_options, cancel);
        Ok(Self {
            report,
            resolver,
            tile_cache,
        })
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = self.tile_cache.as_deref() else {
            return Ok(());
        };
        save_tile_cache(
            path,
            self.resolver.min_cache_zoom(),
            &self.resolver.cache_entries(),
        )
    }
}
