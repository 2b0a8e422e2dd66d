//! Text and JSON rendering of player state

use atelier_playback::{PlaybackEvent, PlayerSnapshot, PlayerStatus, Track};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

/// Render a duration as `m:ss`; missing durations read "unknown"
pub fn format_time(duration: Option<Duration>) -> String {
    match duration {
        Some(duration) => {
            let secs = duration.as_secs();
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        None => "unknown".to_string(),
    }
}

pub struct Renderer {
    mode: OutputMode,
}

impl Renderer {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// One-line player status
    pub fn status(&self, snapshot: &PlayerSnapshot) -> String {
        match self.mode {
            OutputMode::Json => json(snapshot),
            OutputMode::Text => status_line(snapshot),
        }
    }

    /// Playlist rows with the current track marked
    pub fn playlist(&self, tracks: &[Track], snapshot: &PlayerSnapshot) -> String {
        if self.mode == OutputMode::Json {
            return json(&tracks);
        }
        if tracks.is_empty() {
            return "(playlist is empty)".to_string();
        }

        tracks
            .iter()
            .enumerate()
            .map(|(index, track)| {
                let marker = if index == snapshot.current_index { '>' } else { ' ' };
                let duration = snapshot.durations.get(index).copied().flatten();
                format!(
                    "{marker} {:>2}. {} - {}  {}",
                    index + 1,
                    track.title,
                    track.artist,
                    format_time(duration)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Line for a controller event, if it is worth showing
    pub fn event(&self, event: &PlaybackEvent, snapshot: &PlayerSnapshot) -> Option<String> {
        if self.mode == OutputMode::Json {
            return match event {
                // Progress is only rendered on request
                PlaybackEvent::PositionUpdate { .. } => None,
                _ => Some(json(event)),
            };
        }

        match event {
            PlaybackEvent::StateChanged { .. } => Some(status_line(snapshot)),
            PlaybackEvent::AutoplaySuppressed { .. } => {
                Some("Loaded paused; press space to start".to_string())
            }
            PlaybackEvent::VolumeChanged { level, is_muted } => Some(if *is_muted {
                "Volume: muted".to_string()
            } else {
                format!("Volume: {level}")
            }),
            PlaybackEvent::PlaylistChanged { length } => {
                Some(format!("Playlist now has {length} tracks"))
            }
            PlaybackEvent::TrackChanged { .. }
            | PlaybackEvent::TrackFinished { .. }
            | PlaybackEvent::PositionUpdate { .. }
            | PlaybackEvent::Error { .. } => None,
        }
    }
}

fn status_line(snapshot: &PlayerSnapshot) -> String {
    let title = snapshot.track.as_ref().map_or_else(
        || "no track".to_string(),
        |track| format!("{} - {}", track.title, track.artist),
    );
    let state = match &snapshot.status {
        PlayerStatus::Idle => "idle",
        PlayerStatus::Loading { .. } => "loading",
        PlayerStatus::Paused { .. } => "paused",
        PlayerStatus::Playing { .. } if snapshot.is_buffering => "buffering",
        PlayerStatus::Playing { .. } => "playing",
        PlayerStatus::Errored { cause, .. } => cause.user_message(),
    };
    let volume = if snapshot.is_muted {
        "muted".to_string()
    } else {
        format!("vol {}", snapshot.volume)
    };

    format!(
        "[{state}] {title}  {} / {}  {volume}",
        format_time(Some(snapshot.elapsed)),
        format_time(snapshot.duration)
    )
}

fn json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
}
