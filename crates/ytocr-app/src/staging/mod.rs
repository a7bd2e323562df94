//! Staging of bundled OCR assets
//!
//! Bundled models and language data are copied into the per-user data root
//! once per application version:
//!
//! - `version` decides whether a category is stale
//! - `bundle` reads resources out of the distributable
//! - `manifest` maps resource identifiers to destination paths
//! - `stager` runs the copy pass and commits the markers

mod bundle;
mod manifest;
mod stager;
mod version;

pub use bundle::{DirectoryBundle, ResourceBundle};
#[cfg(test)]
pub(crate) use bundle::EmbeddedBundle;
pub use manifest::{AssetManifest, IdentifierError, ManifestEntry, FALLBACK_RESOURCES};
pub use stager::{AssetStager, StagingError, StagingReport, StagingResult};
pub use version::{AppVersion, AssetCategory, VersionGate, APP_MARKER, CATEGORY_MARKER};
