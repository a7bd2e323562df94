//! Configuration management
//!
//! Handles loading and saving the configuration file, and resolving it into
//! the concrete paths used by staging and restart handling. The configuration
//! is loaded once at startup and passed to every component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application name used for directories and shared temp files
pub const APP_NAME: &str = "ytocr";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config directory not found")]
    NoConfigDir,
}

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Directory overrides
    pub paths: PathsConfig,
    /// Silent restart settings
    pub restart: RestartSettings,
    /// Limits applied when restoring window geometry
    pub window: WindowLimits,
    /// OCR engine selection
    pub ocr: OcrConfig,
}

/// Directory overrides (None = platform default)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Per-user data root where assets are staged
    pub data_dir: Option<PathBuf>,
    /// Shared temp directory for the restart lock and window snapshot
    pub temp_dir: Option<PathBuf>,
    /// Packaged resource directory next to the executable
    pub resource_dir: Option<PathBuf>,
}

/// Silent restart settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RestartSettings {
    /// Restart into a fresh process after staging
    pub enabled: bool,
    /// Interval between readiness checks
    pub poll_interval_ms: u64,
    /// Give up waiting for the successor after this long
    pub ready_timeout_secs: u64,
    /// Restart locks older than this are removed at startup
    pub stale_lock_secs: u64,
    /// Window snapshots older than this are discarded
    pub snapshot_ttl_secs: u64,
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 500,
            ready_timeout_secs: 30,
            stale_lock_secs: 60 * 60,
            snapshot_ttl_secs: 5 * 60,
        }
    }
}

impl RestartSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn stale_lock_age(&self) -> Duration {
        Duration::from_secs(self.stale_lock_secs)
    }

    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }
}

/// Accepted window size envelope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowLimits {
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
}

impl Default for WindowLimits {
    fn default() -> Self {
        Self {
            min_width: 300.0,
            min_height: 200.0,
            max_width: 2000.0,
            max_height: 1500.0,
        }
    }
}

impl WindowLimits {
    /// Check whether a size falls inside the envelope
    pub fn accepts(&self, width: f64, height: f64) -> bool {
        (self.min_width..=self.max_width).contains(&width)
            && (self.min_height..=self.max_height).contains(&height)
    }
}

/// OCR engine options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// Platform OCR, needs no staged assets
    #[default]
    Windows,
    Tesseract,
    Paddle,
}

/// OCR engine selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: OcrEngineKind,
    /// Language for the platform engine
    pub language: String,
    /// Tesseract language code (e.g. "eng", "chi_sim")
    pub tesseract_language: String,
    /// PaddleOCR model language ("ch" or "en")
    pub paddle_language: String,
    /// Use this PaddleOCR model directory instead of the staged one
    pub paddle_model_dir: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Windows,
            language: "en".into(),
            tesseract_language: "eng".into(),
            paddle_language: "ch".into(),
            paddle_model_dir: None,
        }
    }
}

/// Concrete locations derived from the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Per-user data root
    pub data_root: PathBuf,
    /// Shared temp directory
    pub temp_dir: PathBuf,
    /// Packaged resources
    pub resource_dir: PathBuf,
}

impl RuntimePaths {
    /// Resolve paths from the config, filling in platform defaults
    pub fn resolve(config: &AppConfig) -> Self {
        let temp_dir = config
            .paths
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);

        let data_root = config.paths.data_dir.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.data_local_dir().to_path_buf())
                .unwrap_or_else(|| std::env::temp_dir().join(APP_NAME))
        });

        let resource_dir = config.paths.resource_dir.clone().unwrap_or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("resources")
        });

        Self {
            data_root,
            temp_dir,
            resource_dir,
        }
    }

    /// Build paths rooted in explicit directories
    pub fn with_roots(data_root: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        Self {
            resource_dir: data_root.join("resources"),
            data_root,
            temp_dir: temp_dir.into(),
        }
    }

    /// The restart lock file
    pub fn restart_lock(&self) -> PathBuf {
        self.temp_dir.join(format!("{}_restart.lock", APP_NAME))
    }

    /// The window state snapshot file
    pub fn window_state(&self) -> PathBuf {
        self.temp_dir.join(format!("{}_window_state.json", APP_NAME))
    }

    /// Staged PaddleOCR model directory for a language
    pub fn paddle_model_dir(&self, language: &str) -> PathBuf {
        self.data_root.join("Models").join("PaddleOCR").join(language)
    }

    /// Staged PaddleOCR character dictionary for a language
    pub fn paddle_dictionary(&self, language: &str) -> PathBuf {
        let file = if language == "en" {
            "en_dict.txt"
        } else {
            "ppocr_keys_v1.txt"
        };
        self.data_root.join("Models").join("PaddleOCR").join(file)
    }

    /// Staged Tesseract data directory
    pub fn tessdata_dir(&self) -> PathBuf {
        self.data_root.join("tessdata")
    }

    /// Files and directories the selected OCR engine needs but cannot find.
    ///
    /// Empty when the engine can start.
    pub fn missing_ocr_assets(&self, ocr: &OcrConfig) -> Vec<PathBuf> {
        let required = match ocr.engine {
            OcrEngineKind::Windows => Vec::new(),
            OcrEngineKind::Tesseract => vec![self
                .tessdata_dir()
                .join(format!("{}.traineddata", ocr.tesseract_language))],
            OcrEngineKind::Paddle => {
                let model_dir = ocr
                    .paddle_model_dir
                    .clone()
                    .unwrap_or_else(|| self.paddle_model_dir(&ocr.paddle_language));
                vec![
                    model_dir.join("det_model"),
                    model_dir.join("rec_model"),
                    self.paddle_dictionary(&ocr.paddle_language),
                ]
            }
        };
        required.into_iter().filter(|path| !path.exists()).collect()
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "ytocr", "YTOCR")
}

/// Replace a leading `~` with the home directory. Other forms are kept as written.
fn expand_path(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match BaseDirs::new() {
        Some(dirs) if rest.as_os_str().is_empty() => dirs.home_dir().to_path_buf(),
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

fn expand_config_paths(config: &mut AppConfig) {
    for slot in [
        &mut config.paths.data_dir,
        &mut config.paths.temp_dir,
        &mut config.paths.resource_dir,
        &mut config.ocr.paddle_model_dir,
    ] {
        if let Some(path) = slot.as_deref() {
            *slot = Some(expand_path(path));
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|p| p.config_dir().to_path_buf())
}

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Load configuration from the default location
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    load_config_from(&path)
}

/// Load configuration from a file; a missing file yields the defaults
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let mut config: AppConfig = toml::from_str(&content)?;
    expand_config_paths(&mut config);

    Ok(config)
}
