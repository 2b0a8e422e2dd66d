//! Atelier - Sidebar Playback Controller
//!
//! Serialized playback control for the sidebar audio player of the Atelier
//! site.
//!
//! This crate provides:
//! - A single-owner playback worker (one live audio output at a time)
//! - FIFO serialization of transport actions (load, play, next, previous, select)
//! - Immediate pause, seek and volume commands
//! - Autoplay gating until the first user gesture
//! - Load timeouts with manual retry
//! - Snapshot and event streams for the UI
//!
//! # Architecture
//!
//! `atelier-playback` does not play audio. Platform code implements
//! [`AudioOutput`] (an HTML audio element bridge, a native stream, ...) and
//! hands the controller an [`OutputFactory`]. [`sim`] contains a clock-driven
//! output used by the console app and the tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use atelier_playback::sim::SimulatedOutputFactory;
//! use atelier_playback::{PlaybackConfig, PlaybackController, Track};
//!
//! #[tokio::main]
//! async fn main() -> atelier_playback::Result<()> {
//!     let tracks = vec![
//!         Track::new("Nocturne", "Studio Ensemble", "art/nocturne.jpg", "audio/nocturne.mp3"),
//!         Track::new("Etude", "Studio Ensemble", "art/etude.jpg", "audio/etude.mp3"),
//!     ];
//!
//!     let controller = PlaybackController::spawn(
//!         tracks,
//!         SimulatedOutputFactory::default(),
//!         PlaybackConfig::default(),
//!     );
//!
//!     // A playlist row click counts as the first user gesture
//!     controller.select_track(1).await?;
//!     controller.set_volume(40).await?;
//!
//!     let snapshot = controller.snapshot();
//!     println!("{:?} at volume {}", snapshot.status, snapshot.volume);
//!
//!     controller.shutdown().await
//! }
//! ```

mod controller;
mod error;
mod events;
mod output;
mod playlist;
mod queue;
pub mod sim;
mod state;
pub mod types;
mod volume;
mod worker;

// Public exports
pub use controller::PlaybackController;
pub use error::{PlaybackError, Result};
pub use events::{OutputEvent, PlaybackEvent};
pub use output::{AudioOutput, OutputEventSender, OutputFactory};
pub use playlist::Playlist;
pub use queue::Completion;
pub use state::{PlaybackState, Transition};
pub use types::{PlaybackConfig, PlayerSnapshot, PlayerStatus, Track};
pub use volume::Volume;
