//! Asset stager
//!
//! Copies bundled assets into the per-user data root when the version gate
//! reports them stale. The staging markers are the commit record: they are
//! written only after the copy pass, so an interrupted pass is retried from
//! scratch on the next launch.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::bundle::ResourceBundle;
use super::manifest::{AssetManifest, ManifestEntry};
use super::version::{AppVersion, AssetCategory, VersionGate};
use crate::atomic::{copy_atomic, write_atomic};
use crate::config::RuntimePaths;

/// Errors that abort a staging pass
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Cannot create data directory {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {category} staging marker: {source}")]
    Marker {
        category: String,
        #[source]
        source: io::Error,
    },
}

/// Summary of a completed staging pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    /// Categories that were stale before the pass
    pub categories: Vec<AssetCategory>,
    /// Categories whose markers were written
    pub committed: Vec<AssetCategory>,
    /// Files copied
    pub copied: usize,
    /// Files that could not be copied
    pub failed: usize,
    /// Bytes written
    pub bytes: u64,
    /// Manifest came from the fallback identifier list
    pub used_fallback: bool,
}

/// Outcome of [`AssetStager::ensure_staged`]
#[derive(Debug)]
pub enum StagingResult {
    /// Every category was already staged for this version
    NotNeeded,
    /// A staging pass ran to completion
    Staged(StagingReport),
    /// The pass was aborted. Category markers written before the failure
    /// stay in place; the application marker is not updated.
    Failed(StagingError),
}

impl StagingResult {
    pub fn was_staged(&self) -> bool {
        matches!(self, StagingResult::Staged(_))
    }
}

/// Stages bundled assets into the data root
#[derive(Debug, Clone)]
pub struct AssetStager {
    gate: VersionGate,
}

impl AssetStager {
    pub fn new(paths: &RuntimePaths, version: AppVersion) -> Self {
        Self {
            gate: VersionGate::new(&paths.data_root, version),
        }
    }

    pub fn gate(&self) -> &VersionGate {
        &self.gate
    }

    /// Stage every stale category from `bundle`.
    ///
    /// Categories that are already current are never touched. A file that
    /// fails to copy is logged and skipped, and its category keeps a stale
    /// marker so the next launch tries again.
    pub fn ensure_staged(&self, bundle: &dyn ResourceBundle) -> StagingResult {
        let stale = self.gate.stale_categories();
        if stale.is_empty() {
            log::info!("Assets already staged for version {}", self.gate.version());
            return StagingResult::NotNeeded;
        }

        let root = self.gate.data_root();
        log::info!(
            "Staging {:?} into {} for version {}",
            stale,
            root.display(),
            self.gate.version()
        );

        if let Err(source) = fs::create_dir_all(root) {
            log::error!("Cannot create data directory {}: {}", root.display(), source);
            return StagingResult::Failed(StagingError::Root {
                path: root.to_path_buf(),
                source,
            });
        }

        let manifest = AssetManifest::build(bundle);
        let mut report = StagingReport {
            categories: stale.clone(),
            used_fallback: manifest.used_fallback,
            ..Default::default()
        };
        let mut failed_categories = BTreeSet::new();

        for entry in manifest
            .entries
            .iter()
            .filter(|entry| stale.contains(&entry.category))
        {
            match self.stage_entry(bundle, entry) {
                Ok(bytes) => {
                    report.copied += 1;
                    report.bytes += bytes;
                }
                Err(e) => {
                    log::warn!("Failed to stage {}: {}", entry.identifier, e);
                    report.failed += 1;
                    failed_categories.insert(entry.category);
                }
            }
        }

        for &category in &stale {
            if failed_categories.contains(&category) {
                log::warn!("Withholding {} marker after copy failures", category);
                continue;
            }
            if let Err(source) = self.write_marker(category) {
                return StagingResult::Failed(StagingError::Marker {
                    category: category.to_string(),
                    source,
                });
            }
            report.committed.push(category);
        }

        if failed_categories.is_empty() {
            let version = self.gate.version().as_str().as_bytes();
            if let Err(source) = write_atomic(&self.gate.app_marker_path(), version) {
                return StagingResult::Failed(StagingError::Marker {
                    category: "application".to_string(),
                    source,
                });
            }
        }

        log::info!(
            "Staging finished: {} copied ({} bytes), {} failed{}",
            report.copied,
            report.bytes,
            report.failed,
            if report.used_fallback {
                ", using fallback list"
            } else {
                ""
            }
        );

        StagingResult::Staged(report)
    }

    fn stage_entry(&self, bundle: &dyn ResourceBundle, entry: &ManifestEntry) -> io::Result<u64> {
        let dest = self.gate.data_root().join(&entry.relative_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut reader = bundle.open(&entry.identifier)?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "resource missing from bundle")
        })?;
        let bytes = copy_atomic(&mut reader, &dest)?;

        log::debug!("Staged {} -> {}", entry.identifier, dest.display());
        Ok(bytes)
    }

    fn write_marker(&self, category: AssetCategory) -> io::Result<()> {
        fs::create_dir_all(self.gate.category_root(category))?;
        write_atomic(
            &self.gate.marker_path(category),
            self.gate.version().as_str().as_bytes(),
        )
    }
}
