//! Stage outputs (normalized regions, partition) persisted between runs.
//!
//! File names embed a SHA-256 over the boundary files and the parameters
//! that shaped the stage, so changed input never reuses an old file.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Bumped whenever the persisted layout changes.
pub const FORMAT_VERSION: u32 = 2;

const KEY_LEN: usize = 16;

pub fn fingerprint(files: &[PathBuf], params: &impl Serialize) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(FORMAT_VERSION.to_le_bytes());
    for file in files {
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        hasher.update(name.as_bytes());
        let bytes = fs::read(file).with_context(|| format!("read {}", file.display()))?;
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);
    }
    hasher.update(serde_json::to_vec(params).context("encode artifact params")?);
    let digest = format!("{:x}", hasher.finalize());
    Ok(digest[..KEY_LEN].to_string())
}

pub fn artifact_path(dir: &Path, stage: &str, key: &str) -> PathBuf {
    dir.join(format!("{stage}-{key}.bin.gz"))
}

/// A missing or unreadable artifact is a miss, never an error.
pub fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("open artifact {}", path.display()))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    match bincode::deserialize_from(decoder) {
        Ok(value) => {
            debug!(path = %path.display(), "artifact reused");
            Ok(Some(value))
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable artifact");
            Ok(None)
        }
    }
}

pub fn store_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    {
        let mut encoder = GzEncoder::new(BufWriter::new(tmp.as_file()), Compression::default());
        bincode::serialize_into(&mut encoder, value).context("encode artifact")?;
        let mut writer = encoder.finish().context("finish artifact")?;
        writer.flush().context("flush artifact")?;
    }
    tmp.persist(path)
        .with_context(|| format!("persist artifact {}", path.display()))?;
    debug!(path = %path.display(), "artifact stored");
    Ok(())
}
