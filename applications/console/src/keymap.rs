//! Keyboard bindings
//!
//! Each input line maps onto exactly one controller call. Arrow keys arrive as
//! ANSI escape sequences when typed into a line-buffered terminal, so both the
//! sequences and their names are accepted.

use crate::config::ControlSettings;
use crate::error::{ConsoleError, Result};
use atelier_playback::{Completion, PlaybackController};

pub const HELP: &str = "\
Controls:
  space | t        play / pause
  play, pause      explicit play or pause (play retries a failed track)
  n | p            next / previous track
  <row>            select playlist row (1-based)
  left | right     seek back / forward
  s <0.0-1.0>      seek to a fraction of the track
  up | down        volume up / down
  v <0-100>        set volume
  m                mute / unmute
  .                show player status
  ls               list the playlist
  ? | help         show this help
  q                quit";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyCommand {
    TogglePlay,
    Play,
    Pause,
    Next,
    Previous,
    Select { index: usize },
    SeekBack,
    SeekForward,
    Seek { fraction: f64 },
    VolumeUp,
    VolumeDown,
    SetVolume { level: u8 },
    ToggleMute,
    Status,
    List,
    Help,
    Quit,
}

impl KeyCommand {
    /// Parse one input line
    pub fn parse(input: &str) -> Result<Self> {
        // A bare space is the play/pause key
        if input == " " {
            return Ok(KeyCommand::TogglePlay);
        }

        let mut words = input.split_whitespace();
        let word = words.next().unwrap_or_default();
        let arg = words.next();
        if words.next().is_some() {
            return Err(ConsoleError::UnknownCommand(input.trim().to_string()));
        }

        let command = match (word, arg) {
            ("space" | "t" | "toggle", None) => KeyCommand::TogglePlay,
            ("play", None) => KeyCommand::Play,
            ("pause", None) => KeyCommand::Pause,
            ("n" | "next", None) => KeyCommand::Next,
            ("p" | "prev" | "previous", None) => KeyCommand::Previous,
            ("left" | "\u{1b}[D", None) => KeyCommand::SeekBack,
            ("right" | "\u{1b}[C", None) => KeyCommand::SeekForward,
            ("up" | "\u{1b}[A", None) => KeyCommand::VolumeUp,
            ("down" | "\u{1b}[B", None) => KeyCommand::VolumeDown,
            ("m" | "mute", None) => KeyCommand::ToggleMute,
            ("." | "status", None) => KeyCommand::Status,
            ("ls" | "list", None) => KeyCommand::List,
            ("?" | "help", None) => KeyCommand::Help,
            ("q" | "quit" | "exit", None) => KeyCommand::Quit,
            ("s" | "seek", Some(value)) => KeyCommand::Seek {
                fraction: parse_fraction(value)?,
            },
            ("v" | "vol" | "volume", Some(value)) => KeyCommand::SetVolume {
                level: value
                    .parse::<u8>()
                    .ok()
                    .filter(|level| *level <= 100)
                    .ok_or_else(|| invalid("volume", value))?,
            },
            (row, None) if row.chars().all(|c| c.is_ascii_digit()) && !row.is_empty() => {
                let index = row
                    .parse::<usize>()
                    .ok()
                    .and_then(|row| row.checked_sub(1))
                    .ok_or_else(|| invalid("row", row))?;
                KeyCommand::Select { index }
            }
            _ => return Err(ConsoleError::UnknownCommand(input.trim().to_string())),
        };
        Ok(command)
    }

    /// Submit the command to the controller
    ///
    /// Returns `None` for commands the console handles itself.
    pub fn dispatch(
        &self,
        controller: &PlaybackController,
        controls: &ControlSettings,
    ) -> Option<Completion> {
        let completion = match *self {
            KeyCommand::TogglePlay => controller.toggle_play(),
            KeyCommand::Play => controller.play(),
            KeyCommand::Pause => controller.pause(),
            KeyCommand::Next => controller.next_track(),
            KeyCommand::Previous => controller.previous_track(),
            KeyCommand::Select { index } => controller.select_track(index),
            KeyCommand::SeekBack => controller.seek_by(-controls.seek_step_secs),
            KeyCommand::SeekForward => controller.seek_by(controls.seek_step_secs),
            KeyCommand::Seek { fraction } => controller.seek(fraction),
            KeyCommand::VolumeUp => controller.adjust_volume(i16::from(controls.volume_step)),
            KeyCommand::VolumeDown => controller.adjust_volume(-i16::from(controls.volume_step)),
            KeyCommand::SetVolume { level } => controller.set_volume(level),
            KeyCommand::ToggleMute => controller.toggle_mute(),
            KeyCommand::Status | KeyCommand::List | KeyCommand::Help | KeyCommand::Quit => {
                return None
            }
        };
        Some(completion)
    }
}

fn parse_fraction(value: &str) -> Result<f64> {
    let fraction = match value.strip_suffix('%') {
        Some(percent) => percent.parse::<f64>().map(|p| p / 100.0),
        None => value.parse::<f64>(),
    };
    fraction
        .ok()
        .filter(|f| (0.0..=1.0).contains(f))
        .ok_or_else(|| invalid("seek", value))
}

fn invalid(command: &'static str, value: &str) -> ConsoleError {
    ConsoleError::InvalidArgument {
        command,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_keys() {
        assert_eq!(KeyCommand::parse(" ").unwrap(), KeyCommand::TogglePlay);
        assert_eq!(KeyCommand::parse("t").unwrap(), KeyCommand::TogglePlay);
        assert_eq!(KeyCommand::parse("n").unwrap(), KeyCommand::Next);
        assert_eq!(KeyCommand::parse("prev").unwrap(), KeyCommand::Previous);
        assert_eq!(KeyCommand::parse("\u{1b}[D").unwrap(), KeyCommand::SeekBack);
        assert_eq!(KeyCommand::parse("\u{1b}[A").unwrap(), KeyCommand::VolumeUp);
    }

    #[test]
    fn rows_are_one_based() {
        assert_eq!(
            KeyCommand::parse("3").unwrap(),
            KeyCommand::Select { index: 2 }
        );
        assert!(matches!(
            KeyCommand::parse("0"),
            Err(ConsoleError::InvalidArgument { command: "row", .. })
        ));
    }

    #[test]
    fn arguments_are_validated() {
        assert_eq!(
            KeyCommand::parse("v 40").unwrap(),
            KeyCommand::SetVolume { level: 40 }
        );
        assert_eq!(
            KeyCommand::parse("s 25%").unwrap(),
            KeyCommand::Seek { fraction: 0.25 }
        );
        assert!(KeyCommand::parse("v 140").is_err());
        assert!(KeyCommand::parse("s 1.5").is_err());
        assert!(KeyCommand::parse("s").is_err());
    }

    #[test]
    fn unknown_input() {
        assert!(matches!(
            KeyCommand::parse("rewind"),
            Err(ConsoleError::UnknownCommand(_))
        ));
        assert!(KeyCommand::parse("n n").is_err());
    }
}
