//! ytocr-app: Application logic for ytocr
//!
//! This crate contains the application logic that is independent of the UI:
//! configuration, staging of bundled OCR assets into the per-user data
//! directory, and the silent restart that hands the window over to a freshly
//! initialized process.

mod atomic;
pub mod config;
pub mod launch;
pub mod restart;
pub mod staging;

pub use config::{load_config, load_config_from, AppConfig, ConfigError, RuntimePaths};
pub use launch::{LaunchMode, Launcher, Next};
pub use restart::{HandoffError, RestartCoordinator, RestartLock, WindowStateStore};
pub use staging::{AppVersion, AssetStager, StagingResult, VersionGate};
