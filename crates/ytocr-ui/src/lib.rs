//! ytocr-ui: UI abstraction layer
//!
//! This crate defines the window interface the application logic works
//! against, so that staging and restart handling never depend on a concrete
//! toolkit. A headless backend is included for hosts without a renderer.

pub mod headless;
pub mod traits;

pub use headless::HeadlessWindow;
pub use traits::*;
