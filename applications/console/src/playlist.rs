/// Playlist files
use crate::error::{ConsoleError, Result};
use atelier_playback::Track;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Playlist used when no file is given
const DEMO_PLAYLIST: &str = include_str!("../playlist.toml");

#[derive(Debug, Deserialize)]
struct PlaylistFile {
    #[serde(default)]
    tracks: Vec<Track>,
}

/// Read a `[[tracks]]` TOML playlist
pub fn load(path: &Path) -> Result<Vec<Track>> {
    let text = std::fs::read_to_string(path).map_err(|e| ConsoleError::Playlist {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse(&text).map_err(|message| ConsoleError::Playlist {
        path: path.to_path_buf(),
        message,
    })
}

/// The bundled demo playlist
pub fn demo() -> Result<Vec<Track>> {
    parse(DEMO_PLAYLIST).map_err(|message| ConsoleError::Playlist {
        path: PathBuf::from("<built-in>"),
        message,
    })
}

fn parse(text: &str) -> std::result::Result<Vec<Track>, String> {
    let file: PlaylistFile = toml::from_str(text).map_err(|e| e.to_string())?;

    if let Some(row) = file
        .tracks
        .iter()
        .position(|track| track.source_uri.trim().is_empty())
    {
        return Err(format!("track {} has no source", row + 1));
    }
    Ok(file.tracks)
}
