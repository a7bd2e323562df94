//! UI abstraction traits
//!
//! These traits define the interface that any UI backend must implement
//! to take part in a silent restart.

use serde::{Deserialize, Serialize};

/// Window display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WindowMode {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

/// Window position and size in logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl WindowGeometry {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Size of a display in logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

/// Window trait - the main application window
pub trait Window {
    /// Get the current position and size
    fn geometry(&self) -> WindowGeometry;

    /// Move the window
    fn set_position(&mut self, left: f64, top: f64);

    /// Resize the window
    fn set_size(&mut self, width: f64, height: f64);

    /// Get the display mode
    fn mode(&self) -> WindowMode;

    /// Set the display mode
    fn set_mode(&mut self, mode: WindowMode);

    /// Whether the window has a taskbar entry
    fn shows_in_taskbar(&self) -> bool;

    /// Add or remove the taskbar entry
    fn set_show_in_taskbar(&mut self, show: bool);

    /// Check if the window is currently visible
    fn is_visible(&self) -> bool;

    /// Show the window
    fn show(&mut self);

    /// Size of the primary display
    fn primary_screen(&self) -> ScreenSize;
}
