//! Headless window backend
//!
//! Keeps window state in memory. Used when ytocr runs without a renderer
//! and as the window double in tests.

use crate::traits::{ScreenSize, Window, WindowGeometry, WindowMode};

/// In-memory window
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    geometry: WindowGeometry,
    mode: WindowMode,
    show_in_taskbar: bool,
    visible: bool,
    screen: ScreenSize,
    show_count: usize,
}

impl HeadlessWindow {
    /// Default primary screen size when none is given
    pub const DEFAULT_SCREEN: ScreenSize = ScreenSize {
        width: 1920.0,
        height: 1080.0,
    };

    /// Create a hidden window with the given geometry on the default screen
    pub fn new(geometry: WindowGeometry) -> Self {
        Self::with_screen(geometry, Self::DEFAULT_SCREEN)
    }

    /// Create a hidden window on a screen of the given size
    pub fn with_screen(geometry: WindowGeometry, screen: ScreenSize) -> Self {
        Self {
            geometry,
            mode: WindowMode::Normal,
            show_in_taskbar: true,
            visible: false,
            screen,
            show_count: 0,
        }
    }

    /// Number of times `show` has been called
    pub fn show_count(&self) -> usize {
        self.show_count
    }
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self::new(WindowGeometry::new(100.0, 100.0, 350.0, 250.0))
    }
}

impl Window for HeadlessWindow {
    fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    fn set_position(&mut self, left: f64, top: f64) {
        self.geometry.left = left;
        self.geometry.top = top;
    }

    fn set_size(&mut self, width: f64, height: f64) {
        self.geometry.width = width;
        self.geometry.height = height;
    }

    fn mode(&self) -> WindowMode {
        self.mode
    }

    fn set_mode(&mut self, mode: WindowMode) {
        self.mode = mode;
    }

    fn shows_in_taskbar(&self) -> bool {
        self.show_in_taskbar
    }

    fn set_show_in_taskbar(&mut self, show: bool) {
        self.show_in_taskbar = show;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn show(&mut self) {
        log::debug!(
            "Showing headless window at ({}, {}) {}x{}",
            self.geometry.left,
            self.geometry.top,
            self.geometry.width,
            self.geometry.height
        );
        self.visible = true;
        self.show_count += 1;
    }

    fn primary_screen(&self) -> ScreenSize {
        self.screen
    }
}
