//! Startup sequencing
//!
//! Orders the pieces of a launch: heal a stale restart lock, stage assets and
//! hand over to a fresh process if anything was staged, then finish
//! initialization. A process started with `--silent-restart` skips staging
//! and instead restores the window and signals readiness.

use ytocr_ui::Window;

use crate::config::{AppConfig, RuntimePaths, APP_NAME};
use crate::restart::{
    RestartCoordinator, RestartLock, SuccessorCommand, WindowStateStore, SILENT_RESTART_FLAG,
};
use crate::staging::{AppVersion, AssetStager, ResourceBundle, StagingResult};

/// How this process was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchMode {
    /// Started by the user
    #[default]
    Normal,
    /// Started by a previous process handing over
    SilentRestart,
}

impl LaunchMode {
    pub fn from_flag(silent_restart: bool) -> Self {
        if silent_restart {
            LaunchMode::SilentRestart
        } else {
            LaunchMode::Normal
        }
    }
}

/// What the caller should do after [`Launcher::prepare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// A successor has taken over; exit now
    Exit,
    /// Continue initializing in this process
    Initialize,
}

/// Runs the startup sequence
#[derive(Debug)]
pub struct Launcher {
    mode: LaunchMode,
    stager: AssetStager,
    coordinator: RestartCoordinator,
    restart_enabled: bool,
    stale_lock_age: std::time::Duration,
}

impl Launcher {
    pub fn new(config: &AppConfig, paths: RuntimePaths, version: AppVersion, mode: LaunchMode) -> Self {
        let successor = SuccessorCommand::current_exe().unwrap_or_else(|e| {
            log::warn!("Cannot locate running executable: {}", e);
            SuccessorCommand::new(APP_NAME, [SILENT_RESTART_FLAG])
        });
        let coordinator = RestartCoordinator::new(
            &config.restart,
            RestartLock::new(paths.restart_lock()),
            WindowStateStore::new(
                paths.window_state(),
                config.restart.snapshot_ttl(),
                config.window,
            ),
            successor,
        );

        Self {
            mode,
            stager: AssetStager::new(&paths, version),
            coordinator,
            restart_enabled: config.restart.enabled,
            stale_lock_age: config.restart.stale_lock_age(),
        }
    }

    /// Use a different command to start the successor
    pub fn with_successor(mut self, successor: SuccessorCommand) -> Self {
        self.coordinator = self.coordinator.with_successor(successor);
        self
    }

    pub fn coordinator(&self) -> &RestartCoordinator {
        &self.coordinator
    }

    /// Remove a restart lock left behind by a handoff that never finished
    pub fn heal(&self) -> bool {
        self.coordinator.lock().heal_if_stale(self.stale_lock_age)
    }

    /// Bring up the main window before staging.
    ///
    /// A normal launch shows it right away, so a handoff carries a visible
    /// window over. A successor stays hidden until [`Launcher::complete`]
    /// has applied the saved state.
    pub fn present(&self, window: &mut dyn Window) {
        if self.mode == LaunchMode::Normal {
            window.show();
        }
    }

    /// Stage assets and, if anything changed, hand over to a new process.
    ///
    /// Never fails: staging and handoff problems are logged and startup
    /// continues in this process.
    pub async fn prepare(&self, bundle: &dyn ResourceBundle, window: &dyn Window) -> Next {
        if self.mode == LaunchMode::SilentRestart {
            log::info!("Started by silent restart, skipping asset staging");
            return Next::Initialize;
        }

        match self.stager.ensure_staged(bundle) {
            StagingResult::NotNeeded => Next::Initialize,
            StagingResult::Failed(e) => {
                log::error!("Resource extraction failed, OCR may be unavailable: {}", e);
                Next::Initialize
            }
            StagingResult::Staged(report) => {
                if !self.restart_enabled {
                    log::info!(
                        "Staged {} files; silent restart disabled, continuing",
                        report.copied
                    );
                    return Next::Initialize;
                }

                log::info!("Resources updated, restarting to load them");
                match self.coordinator.perform_handoff(window).await {
                    Ok(()) => Next::Exit,
                    Err(e) => {
                        log::warn!("Restart failed, continuing in this process: {}", e);
                        Next::Initialize
                    }
                }
            }
        }
    }

    /// Finish startup once the application is initialized.
    ///
    /// After a silent restart the saved window state is applied and the old
    /// process is released; this must be the last startup step.
    pub fn complete(&self, window: &mut dyn Window) {
        match self.mode {
            LaunchMode::Normal => {
                if !window.is_visible() {
                    window.show();
                }
            }
            LaunchMode::SilentRestart => {
                if !self.coordinator.store().try_restore(window) {
                    log::info!("No saved window state, using defaults");
                    window.show();
                }
                self.coordinator.signal_ready();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::{AssetCategory, EmbeddedBundle, VersionGate};
    use std::path::Path;
    use std::time::Duration;
    use ytocr_ui::{HeadlessWindow, WindowGeometry, WindowMode};

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.restart.poll_interval_ms = 20;
        config.restart.ready_timeout_secs = 5;
        config
    }

    fn paths(dir: &Path) -> RuntimePaths {
        RuntimePaths::with_roots(dir.join("data"), dir.join("tmp"))
    }

    fn bundle() -> EmbeddedBundle {
        let mut bundle = EmbeddedBundle::new();
        bundle.insert("models.PaddleOCR.en_dict.txt", b"abc");
        bundle.insert("tessdata.eng.traineddata", b"eng");
        bundle
    }

    fn launcher(config: &AppConfig, dir: &Path, mode: LaunchMode, script: String) -> Launcher {
        Launcher::new(config, paths(dir), AppVersion::new("1.2.0"), mode)
            .with_successor(SuccessorCommand::new("sh", ["-c".to_string(), script]))
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(LaunchMode::from_flag(true), LaunchMode::SilentRestart);
        assert_eq!(LaunchMode::from_flag(false), LaunchMode::Normal);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_first_launch_stages_and_hands_over() {
        let dir = tempfile::tempdir().unwrap();
        let lock = paths(dir.path()).restart_lock();
        let script = format!("rm -f '{}'", lock.display());
        let launcher = launcher(&config(), dir.path(), LaunchMode::Normal, script);

        let next = launcher.prepare(&bundle(), &HeadlessWindow::default()).await;
        assert_eq!(next, Next::Exit);
        assert!(!lock.exists());
        assert!(dir.path().join("data/tessdata/eng.traineddata").exists());
        let gate = VersionGate::new(dir.path().join("data"), AppVersion::new("1.2.0"));
        assert!(!gate.needs_staging(AssetCategory::Models));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successor_receives_visible_window() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        // The old side only sees the lock disappear; the in-process successor below deletes it
        let old = launcher(&config, dir.path(), LaunchMode::Normal, "sleep 5".to_string());
        let successor = launcher(&config, dir.path(), LaunchMode::SilentRestart, "true".to_string());

        let mut old_window = HeadlessWindow::default();
        old.present(&mut old_window);
        assert!(old_window.is_visible());

        let mut new_window = HeadlessWindow::default();
        let bundle = bundle();
        let old_side = old.prepare(&bundle, &old_window);
        let new_side = async {
            let coordinator = successor.coordinator();
            for _ in 0..500 {
                if coordinator.lock().exists() && coordinator.store().exists() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            successor.present(&mut new_window);
            assert!(!new_window.is_visible());
            successor.complete(&mut new_window);
        };
        let (next, ()) = tokio::join!(old_side, new_side);

        assert_eq!(next, Next::Exit);
        assert!(new_window.is_visible());
        assert_eq!(new_window.show_count(), 1);
        assert!(!successor.coordinator().lock().exists());
    }

    #[test]
    fn test_normal_launch_shows_once() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(&config(), dir.path(), LaunchMode::Normal, "true".to_string());
        let mut window = HeadlessWindow::default();
        launcher.present(&mut window);
        launcher.complete(&mut window);
        assert!(window.is_visible());
        assert_eq!(window.show_count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_staged_launch_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let spawned = dir.path().join("spawned");
        let lock = paths(dir.path()).restart_lock();
        let script = format!("touch '{}'; rm -f '{}'", spawned.display(), lock.display());
        let launcher = launcher(&config(), dir.path(), LaunchMode::Normal, script);

        assert_eq!(launcher.prepare(&bundle(), &HeadlessWindow::default()).await, Next::Exit);
        std::fs::remove_file(&spawned).unwrap();

        assert_eq!(
            launcher.prepare(&bundle(), &HeadlessWindow::default()).await,
            Next::Initialize
        );
        assert!(!spawned.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_handoff_continues_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(&config(), dir.path(), LaunchMode::Normal, "exit 1".to_string());

        let next = launcher.prepare(&bundle(), &HeadlessWindow::default()).await;
        assert_eq!(next, Next::Initialize);
        assert!(!launcher.coordinator().lock().exists());
        assert!(!launcher.coordinator().store().exists());
        // Staging itself still committed
        assert!(dir.path().join("data/Models/version.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restart_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let spawned = dir.path().join("spawned");
        let mut config = config();
        config.restart.enabled = false;
        let launcher = launcher(
            &config,
            dir.path(),
            LaunchMode::Normal,
            format!("touch '{}'", spawned.display()),
        );

        let next = launcher.prepare(&bundle(), &HeadlessWindow::default()).await;
        assert_eq!(next, Next::Initialize);
        assert!(!spawned.exists());
        assert!(dir.path().join("data/tessdata/eng.traineddata").exists());
    }

    #[tokio::test]
    async fn test_silent_restart_skips_staging() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(&config(), dir.path(), LaunchMode::SilentRestart, "true".to_string());

        let next = launcher.prepare(&bundle(), &HeadlessWindow::default()).await;
        assert_eq!(next, Next::Initialize);
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_silent_restart_restores_and_signals() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(&config(), dir.path(), LaunchMode::SilentRestart, "true".to_string());
        let coordinator = launcher.coordinator();

        let mut old = HeadlessWindow::new(WindowGeometry::new(640.0, 480.0, 400.0, 300.0));
        old.set_mode(WindowMode::Maximized);
        old.show();
        coordinator.lock().try_acquire(1).unwrap();
        coordinator.store().capture(&old).unwrap();

        let mut window = HeadlessWindow::default();
        launcher.complete(&mut window);
        assert_eq!(window.geometry(), WindowGeometry::new(640.0, 480.0, 400.0, 300.0));
        assert_eq!(window.mode(), WindowMode::Maximized);
        assert_eq!(window.show_count(), 1);
        assert!(!coordinator.lock().exists());
        assert!(!coordinator.store().exists());
    }

    #[test]
    fn test_silent_restart_without_snapshot_shows_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(&config(), dir.path(), LaunchMode::SilentRestart, "true".to_string());
        launcher.coordinator().lock().try_acquire(1).unwrap();

        let mut window = HeadlessWindow::default();
        launcher.complete(&mut window);
        assert!(window.is_visible());
        assert_eq!(window.geometry(), HeadlessWindow::default().geometry());
        assert!(!launcher.coordinator().lock().exists());
    }

    #[test]
    fn test_normal_complete_shows_window() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(&config(), dir.path(), LaunchMode::Normal, "true".to_string());
        let mut window = HeadlessWindow::default();
        launcher.complete(&mut window);
        assert!(window.is_visible());
    }

    #[test]
    fn test_heal_removes_stale_lock() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.restart.stale_lock_secs = 0;
        let launcher = launcher(&config, dir.path(), LaunchMode::Normal, "true".to_string());
        launcher.coordinator().lock().try_acquire(1).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert!(launcher.heal());
        assert!(!launcher.coordinator().lock().exists());
    }

    #[test]
    fn test_heal_keeps_fresh_lock() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(&config(), dir.path(), LaunchMode::Normal, "true".to_string());
        launcher.coordinator().lock().try_acquire(1).unwrap();

        assert!(!launcher.heal());
        assert!(launcher.coordinator().lock().exists());
    }
}
