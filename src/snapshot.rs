//! On-disk cache of a finalized registry.
//!
//! Decoding large indices on every run is wasted work when the scripts have not
//! changed, so the decoded registry is stored with `postcard` alongside an xxh3
//! fingerprint of the source scripts and the decode options they were read
//! with. A snapshot whose fingerprint no longer matches is discarded.

use crate::config::DecodeOptions;
use crate::error::Result;
use crate::index::CrateIndex;
use crate::registry::FinalizedRegistry;
use crate::script::LoadDiagnostics;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::Xxh3;

/// Bumped whenever the decoded model changes shape.
const SNAPSHOT_FORMAT: u32 = 2;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format: u32,
    fingerprint: u64,
    diagnostics: &'a LoadDiagnostics,
    crates: Vec<&'a CrateIndex>,
}

#[derive(Deserialize)]
struct SnapshotFile {
    format: u32,
    fingerprint: u64,
    diagnostics: LoadDiagnostics,
    crates: Vec<CrateIndex>,
}

/// A registry restored from disk, with the diagnostics of the load that built it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub registry: FinalizedRegistry,
    pub diagnostics: LoadDiagnostics,
}

/// Combined fingerprint of the decode options and the given script files
/// (paths and contents).
///
/// An unreadable script contributes its path only, so it is picked up again
/// once it becomes readable.
pub fn fingerprint_sources(paths: &[PathBuf], options: &DecodeOptions) -> Result<u64> {
    let mut hasher = Xxh3::new();
    let encoded_options =
        postcard::to_stdvec(options).context("Failed to encode decode options")?;
    hasher.update(&encoded_options);
    for path in paths {
        hasher.update(path.to_string_lossy().as_bytes());
        match std::fs::read(path) {
            Ok(content) => {
                hasher.update(&[1]);
                hasher.update(&content);
            }
            Err(e) => {
                tracing::debug!("Fingerprinting unreadable {}: {}", path.display(), e);
                hasher.update(&[0]);
            }
        }
    }
    Ok(hasher.digest())
}

/// Writes a snapshot, replacing any existing file.
pub fn store(
    path: &Path,
    registry: &FinalizedRegistry,
    diagnostics: &LoadDiagnostics,
    fingerprint: u64,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let snapshot = SnapshotRef {
        format: SNAPSHOT_FORMAT,
        fingerprint,
        diagnostics,
        crates: registry.iter().collect(),
    };

    let tmp_path = path.with_extension("tmp");
    let file = std::fs::File::create(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    postcard::to_io(&snapshot, file)
        .with_context(|| format!("Failed to write snapshot to {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move snapshot into place at {}", path.display()))?;

    tracing::debug!(
        "Cached {} search indices to {}",
        registry.len(),
        path.display()
    );
    Ok(())
}

/// Loads a snapshot if it exists and was built with `fingerprint`.
///
/// Stale or unreadable snapshots are removed and `None` is returned.
pub fn load(path: &Path, fingerprint: u64) -> Option<Snapshot> {
    let bytes = std::fs::read(path).ok()?;

    match postcard::from_bytes::<SnapshotFile>(&bytes) {
        Ok(snapshot) if snapshot.format == SNAPSHOT_FORMAT && snapshot.fingerprint == fingerprint => {
            tracing::debug!("Using cached search indices from {}", path.display());
            Some(Snapshot {
                registry: FinalizedRegistry::from_indices(snapshot.crates),
                diagnostics: snapshot.diagnostics,
            })
        }
        Ok(_) => {
            tracing::info!(
                "Snapshot stale, will rebuild (file: {})",
                path.display()
            );
            let _ = std::fs::remove_file(path);
            None
        }
        Err(e) => {
            tracing::warn!("Failed to deserialize snapshot at {}: {}", path.display(), e);
            let _ = std::fs::remove_file(path);
            None
        }
    }
}
