//! Atelier Console Library
//!
//! Headless front-end for the sidebar player: reads key commands, drives a
//! `PlaybackController` backed by simulated outputs and renders its state.
//!
//! This library exposes the components for testing purposes.

pub mod config;
pub mod error;
pub mod keymap;
pub mod playlist;
pub mod render;
pub mod session;

// Re-export commonly used types for convenience
pub use config::{ConsoleConfig, ControlSettings, PreviewSettings};
pub use error::{ConsoleError, Result};
pub use keymap::KeyCommand;
pub use render::{OutputMode, Renderer};
pub use session::Session;
