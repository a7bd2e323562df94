//! Asset manifest
//!
//! Maps dotted resource identifiers such as
//! `models.PaddleOCR.ch.det_model.inference.pdmodel` to paths under the data
//! root (`Models/PaddleOCR/ch/det_model/inference.pdmodel`).

use std::path::PathBuf;

use thiserror::Error;

use super::bundle::ResourceBundle;
use super::version::AssetCategory;

/// Identifiers probed when the bundle cannot enumerate its contents.
///
/// Must list what the packaging step embeds; nothing checks that they agree.
pub const FALLBACK_RESOURCES: &[&str] = &[
    "models.PaddleOCR.ch.det_model.inference.pdmodel",
    "models.PaddleOCR.ch.det_model.inference.pdiparams",
    "models.PaddleOCR.ch.rec_model.inference.pdmodel",
    "models.PaddleOCR.ch.rec_model.inference.pdiparams",
    "models.PaddleOCR.ch.cls_model.inference.pdmodel",
    "models.PaddleOCR.ch.cls_model.inference.pdiparams",
    "models.PaddleOCR.en.det_model.inference.pdmodel",
    "models.PaddleOCR.en.det_model.inference.pdiparams",
    "models.PaddleOCR.en.rec_model.inference.pdmodel",
    "models.PaddleOCR.en.rec_model.inference.pdiparams",
    "models.PaddleOCR.en.cls_model.inference.pdmodel",
    "models.PaddleOCR.en.cls_model.inference.pdiparams",
    "models.PaddleOCR.ppocr_keys_v1.txt",
    "models.PaddleOCR.en_dict.txt",
    "tessdata.eng.traineddata",
    "tessdata.chi_sim.traineddata",
];

/// Longest trailing segment still treated as a file extension
const MAX_EXTENSION_LEN: usize = 16;

/// Reasons an identifier cannot be mapped to a destination
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("unknown asset category in {0:?}")]
    UnknownCategory(String),

    #[error("no file name in {0:?}")]
    MissingFileName(String),

    #[error("invalid path segment in {0:?}")]
    InvalidSegment(String),
}

/// One asset to stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Resource identifier inside the bundle
    pub identifier: String,
    pub category: AssetCategory,
    /// Destination relative to the data root
    pub relative_path: PathBuf,
}

impl ManifestEntry {
    /// Derive the destination of a resource from its identifier
    pub fn parse(identifier: &str) -> Result<Self, IdentifierError> {
        let segments: Vec<&str> = identifier.split('.').collect();
        let (first, rest) = segments
            .split_first()
            .ok_or_else(|| IdentifierError::MissingFileName(identifier.to_string()))?;

        let category = AssetCategory::from_prefix(first)
            .ok_or_else(|| IdentifierError::UnknownCategory(identifier.to_string()))?;

        if rest.is_empty() {
            return Err(IdentifierError::MissingFileName(identifier.to_string()));
        }
        if rest.iter().any(|s| !is_valid_segment(s)) {
            return Err(IdentifierError::InvalidSegment(identifier.to_string()));
        }

        let (dirs, file_name) = match rest {
            [dirs @ .., stem, ext] if looks_like_extension(ext) => {
                (dirs, format!("{}.{}", stem, ext))
            }
            [dirs @ .., name] => (dirs, (*name).to_string()),
            [] => unreachable!("checked above"),
        };

        let mut relative_path = PathBuf::from(category.dir_name());
        relative_path.extend(dirs);
        relative_path.push(file_name);

        Ok(Self {
            identifier: identifier.to_string(),
            category,
            relative_path,
        })
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains(['/', '\\', ':'])
}

fn looks_like_extension(segment: &str) -> bool {
    (1..=MAX_EXTENSION_LEN).contains(&segment.len())
        && segment.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Set of assets to stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    pub entries: Vec<ManifestEntry>,
    /// Built from [`FALLBACK_RESOURCES`] instead of enumeration
    pub used_fallback: bool,
}

impl AssetManifest {
    /// Build the manifest from the bundle's own listing, or from the
    /// fallback identifiers if the listing is empty. Never mixes both.
    pub fn build(bundle: &dyn ResourceBundle) -> Self {
        let names = bundle.resource_names();
        if !names.is_empty() {
            log::info!("Found {} bundled resources", names.len());
            return Self {
                entries: parse_all(names.iter().map(String::as_str)),
                used_fallback: false,
            };
        }

        log::warn!(
            "Bundle listed no resources, probing {} known identifiers",
            FALLBACK_RESOURCES.len()
        );
        let present = FALLBACK_RESOURCES.iter().copied().filter(|name| {
            match bundle.open(name) {
                Ok(Some(_)) => true,
                Ok(None) => false,
                Err(e) => {
                    log::warn!("Failed to probe resource {}: {}", name, e);
                    false
                }
            }
        });
        let entries = parse_all(present);
        log::info!("Fallback probe found {} resources", entries.len());

        Self {
            entries,
            used_fallback: true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_all<'a>(names: impl Iterator<Item = &'a str>) -> Vec<ManifestEntry> {
    names
        .filter_map(|name| match ManifestEntry::parse(name) {
            Ok(entry) => Some(entry),
            Err(IdentifierError::UnknownCategory(_)) => {
                log::debug!("Skipping non-asset resource {}", name);
                None
            }
            Err(e) => {
                log::warn!("Skipping resource: {}", e);
                None
            }
        })
        .collect()
}
