//! Silent restart coordinator
//!
//! Hands the running application over to a fresh process of the same binary.
//! The old process takes the restart lock, snapshots its window, spawns the
//! successor with `--silent-restart`, then waits for the successor to delete
//! the lock. Any failure rolls the attempt back so the old process can carry
//! on as if no restart had been tried.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use ytocr_ui::Window;

use super::lock::{LockAcquire, RestartLock};
use super::window_state::{SnapshotError, WindowStateStore};
use crate::config::RestartSettings;

/// Command line flag that marks a successor process
pub const SILENT_RESTART_FLAG: &str = "--silent-restart";

/// Errors that abort a handoff
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("Restart already in progress")]
    InProgress,

    #[error("Failed to create restart lock: {0}")]
    Lock(#[source] io::Error),

    #[error("Failed to save window state: {0}")]
    Capture(#[from] SnapshotError),

    #[error("Failed to start new process: {0}")]
    Spawn(#[source] io::Error),

    #[error("New process exited before it was ready (code {0:?})")]
    SuccessorExited(Option<i32>),

    #[error("New process not ready after {0:?}")]
    Timeout(Duration),
}

/// How to launch the successor process
#[derive(Debug, Clone)]
pub struct SuccessorCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl SuccessorCommand {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The running executable with `--silent-restart`
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, [SILENT_RESTART_FLAG]))
    }

    fn spawn(&self) -> io::Result<Child> {
        Command::new(&self.program).args(&self.args).spawn()
    }
}

/// Drives both sides of a silent restart
#[derive(Debug)]
pub struct RestartCoordinator {
    lock: RestartLock,
    store: WindowStateStore,
    successor: SuccessorCommand,
    poll_interval: Duration,
    ready_timeout: Duration,
}

impl RestartCoordinator {
    pub fn new(
        settings: &RestartSettings,
        lock: RestartLock,
        store: WindowStateStore,
        successor: SuccessorCommand,
    ) -> Self {
        Self {
            lock,
            store,
            successor,
            poll_interval: settings.poll_interval(),
            ready_timeout: settings.ready_timeout(),
        }
    }

    /// Replace the successor command
    pub fn with_successor(mut self, successor: SuccessorCommand) -> Self {
        self.successor = successor;
        self
    }

    pub fn lock(&self) -> &RestartLock {
        &self.lock
    }

    pub fn store(&self) -> &WindowStateStore {
        &self.store
    }

    /// Hand over to a new process.
    ///
    /// `Ok` means the successor is fully initialized and the caller should
    /// exit. On any error other than [`HandoffError::InProgress`] the lock and
    /// snapshot of this attempt have already been removed.
    pub async fn perform_handoff(&self, window: &dyn Window) -> Result<(), HandoffError> {
        if self.lock.exists() {
            log::info!(
                "Restart lock {} held by {:?}, not restarting",
                self.lock.path().display(),
                self.lock.owner()
            );
            return Err(HandoffError::InProgress);
        }

        match self.lock.try_acquire(std::process::id()) {
            Ok(LockAcquire::Acquired) => {}
            Ok(LockAcquire::Held) => return Err(HandoffError::InProgress),
            Err(e) => return Err(HandoffError::Lock(e)),
        }

        if let Err(e) = self.store.capture(window) {
            self.rollback();
            return Err(e.into());
        }

        let child = match self.successor.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.rollback();
                return Err(HandoffError::Spawn(e));
            }
        };
        log::info!("Started new process with PID {:?}", child.id());

        let result = self.await_ready(child).await;
        match &result {
            Ok(()) => log::info!("New process is ready"),
            Err(_) => self.rollback(),
        }
        result
    }

    async fn await_ready(&self, mut child: Child) -> Result<(), HandoffError> {
        let deadline = Instant::now() + self.ready_timeout;

        loop {
            if !self.lock.exists() {
                return Ok(());
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    // The successor may have finished right after the check above
                    if !self.lock.exists() {
                        return Ok(());
                    }
                    log::warn!("New process exited early: {}", status);
                    return Err(HandoffError::SuccessorExited(status.code()));
                }
                Ok(None) => {}
                Err(e) => log::warn!("Failed to poll new process: {}", e),
            }

            if Instant::now() >= deadline {
                log::warn!(
                    "New process not ready after {:?}, terminating PID {:?}",
                    self.ready_timeout,
                    child.id()
                );
                // Kills and reaps the process
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to terminate new process: {}", e);
                }
                return Err(HandoffError::Timeout(self.ready_timeout));
            }

            sleep(self.poll_interval).await;
        }
    }

    fn rollback(&self) {
        if let Err(e) = self.lock.release() {
            log::warn!("Failed to remove restart lock: {}", e);
        }
        self.store.discard();
    }

    /// Successor side: report that initialization has finished.
    ///
    /// Must be the last step of startup; the old process exits as soon as
    /// the lock disappears.
    pub fn signal_ready(&self) {
        match self.lock.release() {
            Ok(true) => log::info!("Signalled readiness to previous process"),
            Ok(false) => log::debug!("No restart lock to release"),
            Err(e) => log::warn!("Failed to release restart lock: {}", e),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::WindowLimits;
    use std::path::Path;
    use ytocr_ui::HeadlessWindow;

    fn settings(ready_timeout_secs: u64) -> RestartSettings {
        RestartSettings {
            poll_interval_ms: 20,
            ready_timeout_secs,
            ..Default::default()
        }
    }

    fn coordinator(dir: &Path, successor: SuccessorCommand, timeout_secs: u64) -> RestartCoordinator {
        RestartCoordinator::new(
            &settings(timeout_secs),
            RestartLock::new(dir.join("ytocr_restart.lock")),
            WindowStateStore::new(
                dir.join("ytocr_window_state.json"),
                Duration::from_secs(300),
                WindowLimits::default(),
            ),
            successor,
        )
    }

    fn shell(script: String) -> SuccessorCommand {
        SuccessorCommand::new("sh", ["-c".to_string(), script])
    }

    #[tokio::test]
    async fn test_successor_ready() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("ytocr_restart.lock");
        let script = format!("sleep 0.2; rm -f '{}'", lock_path.display());
        let coordinator = coordinator(dir.path(), shell(script), 10);

        coordinator
            .perform_handoff(&HeadlessWindow::default())
            .await
            .unwrap();
        assert!(!coordinator.lock().exists());
        // The successor never consumed it, so the snapshot is still there
        assert!(coordinator.store().exists());
    }

    #[tokio::test]
    async fn test_successor_sees_lock_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("ytocr_restart.lock");
        let state_path = dir.path().join("ytocr_window_state.json");
        let script = format!(
            "test -f '{}' && test -f '{}' && rm -f '{}'",
            lock_path.display(),
            state_path.display(),
            lock_path.display()
        );
        let coordinator = coordinator(dir.path(), shell(script), 10);

        assert!(coordinator
            .perform_handoff(&HeadlessWindow::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_timeout_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path(), shell("sleep 30".to_string()), 1);

        let started = std::time::Instant::now();
        let result = coordinator.perform_handoff(&HeadlessWindow::default()).await;
        assert!(matches!(result, Err(HandoffError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!coordinator.lock().exists());
        assert!(!coordinator.store().exists());
    }

    #[tokio::test]
    async fn test_timeout_terminates_successor() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("successor.pid");
        let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());
        let coordinator = coordinator(dir.path(), shell(script), 1);

        let result = coordinator.perform_handoff(&HeadlessWindow::default()).await;
        assert!(matches!(result, Err(HandoffError::Timeout(_))));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let alive = std::process::Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(std::process::Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success(), "successor {} still running", pid.trim());
    }

    #[tokio::test]
    async fn test_early_exit_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path(), shell("exit 3".to_string()), 10);

        let result = coordinator.perform_handoff(&HeadlessWindow::default()).await;
        assert!(matches!(result, Err(HandoffError::SuccessorExited(Some(3)))));
        assert!(!coordinator.lock().exists());
        assert!(!coordinator.store().exists());
    }

    #[tokio::test]
    async fn test_spawn_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = SuccessorCommand::new(dir.path().join("no-such-binary"), [SILENT_RESTART_FLAG]);
        let coordinator = coordinator(dir.path(), missing, 10);

        let result = coordinator.perform_handoff(&HeadlessWindow::default()).await;
        assert!(matches!(result, Err(HandoffError::Spawn(_))));
        assert!(!coordinator.lock().exists());
        assert!(!coordinator.store().exists());
    }

    #[tokio::test]
    async fn test_capture_failure_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let coordinator = RestartCoordinator::new(
            &settings(10),
            RestartLock::new(dir.path().join("ytocr_restart.lock")),
            WindowStateStore::new(
                blocker.join("ytocr_window_state.json"),
                Duration::from_secs(300),
                WindowLimits::default(),
            ),
            shell("exit 0".to_string()),
        );

        let result = coordinator.perform_handoff(&HeadlessWindow::default()).await;
        assert!(matches!(result, Err(HandoffError::Capture(_))));
        assert!(!coordinator.lock().exists());
    }

    #[tokio::test]
    async fn test_existing_lock_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spawned");
        let script = format!("touch '{}'", marker.display());
        let coordinator = coordinator(dir.path(), shell(script), 10);
        coordinator.lock().try_acquire(1).unwrap();

        let result = coordinator.perform_handoff(&HeadlessWindow::default()).await;
        assert!(matches!(result, Err(HandoffError::InProgress)));
        assert_eq!(coordinator.lock().owner(), Some(1));
        assert!(!coordinator.store().exists());
        assert!(!marker.exists());
    }

    #[test]
    fn test_signal_ready_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path(), shell("true".to_string()), 10);
        coordinator.lock().try_acquire(99).unwrap();

        coordinator.signal_ready();
        assert!(!coordinator.lock().exists());
        // Nothing to release is not an error
        coordinator.signal_ready();
    }

    #[test]
    fn test_default_successor_uses_flag() {
        let command = SuccessorCommand::current_exe().unwrap();
        assert_eq!(command.args, vec![OsString::from(SILENT_RESTART_FLAG)]);
    }
}
