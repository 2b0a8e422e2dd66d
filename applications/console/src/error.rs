/// Console error types
use atelier_playback::PlaybackError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsoleError>;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Playlist error in {path:?}: {message}")]
    Playlist { path: PathBuf, message: String },

    #[error("Unknown command {0:?} (type ? for help)")]
    UnknownCommand(String),

    #[error("Invalid value for {command}: {value:?}")]
    InvalidArgument { command: &'static str, value: String },

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
