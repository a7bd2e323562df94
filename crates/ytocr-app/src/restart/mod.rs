//! Silent restart support
//!
//! After assets are staged the application restarts into a fresh process so
//! the new files are picked up, carrying the main window's state across.

mod coordinator;
mod lock;
mod window_state;

pub use coordinator::{HandoffError, RestartCoordinator, SuccessorCommand, SILENT_RESTART_FLAG};
pub use lock::{LockAcquire, RestartLock};
pub use window_state::{SnapshotError, WindowStateSnapshot, WindowStateStore};
