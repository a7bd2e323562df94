//! Window state snapshot
//!
//! The old process writes the main window's geometry, mode, and visibility to
//! a JSON file before spawning its successor. The successor applies it once
//! and deletes it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ytocr_ui::{Window, WindowGeometry, WindowMode};

use crate::atomic::{remove_if_exists, write_atomic};
use crate::config::WindowLimits;

/// Errors writing or reading a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Window state captured before a handoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStateSnapshot {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub window_state: WindowMode,
    pub show_in_taskbar: bool,
    pub is_visible: bool,
    pub saved_at: DateTime<Utc>,
}

impl WindowStateSnapshot {
    /// Capture the current state of `window`
    pub fn from_window(window: &dyn Window, saved_at: DateTime<Utc>) -> Self {
        let WindowGeometry {
            left,
            top,
            width,
            height,
        } = window.geometry();
        Self {
            left,
            top,
            width,
            height,
            window_state: window.mode(),
            show_in_taskbar: window.shows_in_taskbar(),
            is_visible: window.is_visible(),
            saved_at,
        }
    }

    /// Whether the snapshot is older than `ttl`, or dated more than `ttl`
    /// into the future
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let skew = (now - self.saved_at).num_milliseconds().unsigned_abs();
        u128::from(skew) > ttl.as_millis()
    }

    /// Position lies on the primary screen, allowing the window to hang off
    /// the left edge by up to its own width
    fn position_fits(&self, window: &dyn Window) -> bool {
        let screen = window.primary_screen();
        self.left >= -self.width
            && self.left < screen.width
            && self.top >= 0.0
            && self.top < screen.height
    }

    /// Apply every valid field to `window`. Mode and taskbar flag always apply.
    fn apply(&self, window: &mut dyn Window, limits: &WindowLimits) {
        if self.position_fits(window) {
            window.set_position(self.left, self.top);
        } else {
            log::warn!(
                "Ignoring off-screen position ({}, {})",
                self.left,
                self.top
            );
        }

        if limits.accepts(self.width, self.height) {
            window.set_size(self.width, self.height);
        } else {
            log::warn!("Ignoring size {}x{}", self.width, self.height);
        }

        window.set_mode(self.window_state);
        window.set_show_in_taskbar(self.show_in_taskbar);

        // Last, so the window appears with its final geometry
        if self.is_visible {
            window.show();
        }
    }
}

/// Persists the main window's state across a silent restart
#[derive(Debug, Clone)]
pub struct WindowStateStore {
    path: PathBuf,
    ttl: Duration,
    limits: WindowLimits,
}

impl WindowStateStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration, limits: WindowLimits) -> Self {
        Self {
            path: path.into(),
            ttl,
            limits,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Snapshot `window` to disk
    pub fn capture(&self, window: &dyn Window) -> Result<(), SnapshotError> {
        self.save(&WindowStateSnapshot::from_window(window, Utc::now()))
    }

    /// Write a snapshot, replacing any previous one atomically
    pub fn save(&self, snapshot: &WindowStateSnapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&self.path, &json)?;
        log::debug!("Saved window state to {}", self.path.display());
        Ok(())
    }

    /// Read the snapshot without consuming it
    pub fn load(&self) -> Result<Option<WindowStateSnapshot>, SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Apply a saved snapshot to `window` and delete it.
    ///
    /// Corrupt or expired snapshots are deleted without touching the window.
    /// Returns true if any state was applied.
    pub fn try_restore(&self, window: &mut dyn Window) -> bool {
        let snapshot = match self.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return false,
            Err(e) => {
                log::warn!("Discarding unreadable window state: {}", e);
                self.discard();
                return false;
            }
        };

        self.discard();

        if snapshot.is_expired(Utc::now(), self.ttl) {
            log::info!("Discarding window state saved at {}", snapshot.saved_at);
            return false;
        }

        snapshot.apply(window, &self.limits);
        log::info!("Restored window state saved at {}", snapshot.saved_at);
        true
    }

    /// Delete the snapshot if present
    pub fn discard(&self) {
        if let Err(e) = remove_if_exists(&self.path) {
            log::warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}
