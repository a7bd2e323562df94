//! Version gate
//!
//! Decides whether an asset category must be re-staged by comparing its
//! staging marker with the version of the running binary.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Marker file written inside each category directory
pub const CATEGORY_MARKER: &str = "version.txt";

/// Application-level marker written in the data root after a staging pass
pub const APP_MARKER: &str = "app_version.txt";

/// Version string of the running binary.
///
/// Compared by exact equality only; any mismatch, including a downgrade,
/// means the assets must be staged again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppVersion(String);

impl AppVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check marker content against this version
    pub fn matches(&self, marker: &str) -> bool {
        marker.trim() == self.0
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kinds of bundled assets, each staged under its own directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetCategory {
    /// PaddleOCR detection/recognition/classification models and dictionaries
    Models,
    /// Tesseract language data
    LanguageData,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 2] = [AssetCategory::Models, AssetCategory::LanguageData];

    /// First segment of resource identifiers in this category
    pub fn identifier_prefix(self) -> &'static str {
        match self {
            AssetCategory::Models => "models",
            AssetCategory::LanguageData => "tessdata",
        }
    }

    /// Directory under the data root
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetCategory::Models => "Models",
            AssetCategory::LanguageData => "tessdata",
        }
    }

    /// Look up a category by identifier prefix (case-insensitive)
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.identifier_prefix().eq_ignore_ascii_case(prefix))
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Compares staging markers against the running version
#[derive(Debug, Clone)]
pub struct VersionGate {
    data_root: PathBuf,
    version: AppVersion,
}

impl VersionGate {
    pub fn new(data_root: impl Into<PathBuf>, version: AppVersion) -> Self {
        Self {
            data_root: data_root.into(),
            version,
        }
    }

    pub fn version(&self) -> &AppVersion {
        &self.version
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Root directory of a category
    pub fn category_root(&self, category: AssetCategory) -> PathBuf {
        self.data_root.join(category.dir_name())
    }

    /// Marker file of a category
    pub fn marker_path(&self, category: AssetCategory) -> PathBuf {
        self.category_root(category).join(CATEGORY_MARKER)
    }

    /// Application-level marker file
    pub fn app_marker_path(&self) -> PathBuf {
        self.data_root.join(APP_MARKER)
    }

    /// Whether `category` must be staged for the running version.
    ///
    /// An absent or unreadable marker counts as stale.
    pub fn needs_staging(&self, category: AssetCategory) -> bool {
        let path = self.marker_path(category);
        match fs::read_to_string(&path) {
            Ok(content) if self.version.matches(&content) => false,
            Ok(content) => {
                log::debug!(
                    "{} marker is at {:?}, running {}",
                    category,
                    content.trim(),
                    self.version
                );
                true
            }
            Err(e) => {
                log::debug!("{} marker unreadable ({}): {}", category, path.display(), e);
                true
            }
        }
    }

    /// Categories whose markers are stale
    pub fn stale_categories(&self) -> Vec<AssetCategory> {
        AssetCategory::ALL
            .into_iter()
            .filter(|&c| self.needs_staging(c))
            .collect()
    }
}
