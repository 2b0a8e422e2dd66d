/// Console configuration
use crate::error::{ConsoleError, Result};
use atelier_playback::sim::{SimProfile, SimulatedOutputFactory};
use atelier_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound for every playback timing (10 minutes)
const MAX_TIMING_MS: u64 = 10 * 60 * 1000;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default = "default_preview")]
    pub preview: PreviewSettings,

    #[serde(default = "default_controls")]
    pub controls: ControlSettings,
}

/// Behavior of the simulated output the console plays through
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreviewSettings {
    #[serde(default = "default_ready_after_ms")]
    pub ready_after_ms: u64,

    #[serde(default = "default_track_length_secs")]
    pub track_length_secs: u64,

    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Sources that never become ready (exercises the load timeout)
    #[serde(default)]
    pub unreachable: Vec<String>,

    /// Sources that fail to load
    #[serde(default)]
    pub broken: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlSettings {
    #[serde(default = "default_seek_step_secs")]
    pub seek_step_secs: f64,

    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
}

impl ConsoleConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables use the `ATELIER_` prefix and `__` between
    /// section and key, e.g. `ATELIER_PLAYBACK__LOAD_TIMEOUT_MS=5000`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    pub(crate) fn load_with(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path));
        }

        let config = settings
            .add_source(env)
            .build()
            .map_err(|e| ConsoleError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ConsoleError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;
        let timings = [
            ("load_timeout_ms", playback.load_timeout_ms),
            ("settle_delay_ms", playback.settle_delay_ms),
            ("seek_debounce_ms", playback.seek_debounce_ms),
        ];
        for (name, value) in timings {
            if !(1..=MAX_TIMING_MS).contains(&value) {
                return Err(ConsoleError::Config(format!(
                    "playback.{name} must be within 1-{MAX_TIMING_MS} (got {value})"
                )));
            }
        }
        if playback.initial_volume > 100 || playback.unmute_volume > 100 {
            return Err(ConsoleError::Config(format!(
                "volume levels must be within 0-100 (got {} / {})",
                playback.initial_volume, playback.unmute_volume
            )));
        }
        if playback.unmute_volume == 0 {
            return Err(ConsoleError::Config(
                "playback.unmute_volume must be audible".to_string(),
            ));
        }
        if playback.event_capacity == 0 {
            return Err(ConsoleError::Config(
                "playback.event_capacity must be positive".to_string(),
            ));
        }

        if self.preview.tick_ms == 0 {
            return Err(ConsoleError::Config(
                "preview.tick_ms must be positive".to_string(),
            ));
        }

        if !(self.controls.seek_step_secs.is_finite() && self.controls.seek_step_secs > 0.0) {
            return Err(ConsoleError::Config(format!(
                "controls.seek_step_secs must be positive (got {})",
                self.controls.seek_step_secs
            )));
        }
        if !(1..=100).contains(&self.controls.volume_step) {
            return Err(ConsoleError::Config(format!(
                "controls.volume_step must be within 1-100 (got {})",
                self.controls.volume_step
            )));
        }

        Ok(())
    }
}

impl PreviewSettings {
    /// Output factory matching these settings
    pub fn factory(&self) -> SimulatedOutputFactory {
        let profile = SimProfile::default()
            .ready_after(Duration::from_millis(self.ready_after_ms))
            .length(Duration::from_secs(self.track_length_secs))
            .tick(Duration::from_millis(self.tick_ms));

        let mut factory = SimulatedOutputFactory::new(profile.clone());
        for uri in &self.unreachable {
            factory = factory.with_profile(uri.clone(), profile.clone().never_ready());
        }
        for uri in &self.broken {
            factory = factory.with_profile(uri.clone(), profile.clone().fail_load("source unavailable"));
        }
        factory
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("ATELIER")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

// Default values
fn default_preview() -> PreviewSettings {
    PreviewSettings {
        ready_after_ms: default_ready_after_ms(),
        track_length_secs: default_track_length_secs(),
        tick_ms: default_tick_ms(),
        unreachable: Vec::new(),
        broken: Vec::new(),
    }
}

fn default_ready_after_ms() -> u64 {
    300
}

fn default_track_length_secs() -> u64 {
    180
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_controls() -> ControlSettings {
    ControlSettings {
        seek_step_secs: default_seek_step_secs(),
        volume_step: default_volume_step(),
    }
}

fn default_seek_step_secs() -> f64 {
    5.0
}

fn default_volume_step() -> u8 {
    5
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            preview: default_preview(),
            controls: default_controls(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn defaults_without_sources() {
        let config = ConsoleConfig::load_with(None, env(&[])).unwrap();

        assert_eq!(config.playback, PlaybackConfig::default());
        assert_eq!(config.controls.volume_step, 5);
        assert_eq!(config.controls.seek_step_secs, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_then_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[playback]
load_timeout_ms = 4000
initial_volume = 60

[preview]
unreachable = ["audio/missing.mp3"]
"#
        )
        .unwrap();

        let config = ConsoleConfig::load_with(
            Some(file.path()),
            env(&[("ATELIER_PLAYBACK__INITIAL_VOLUME", "30")]),
        )
        .unwrap();

        assert_eq!(config.playback.load_timeout_ms, 4000);
        assert_eq!(config.playback.initial_volume, 30);
        assert_eq!(config.playback.settle_delay_ms, 50);
        assert_eq!(config.preview.unreachable, vec!["audio/missing.mp3"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = ConsoleConfig::load_with(Some(Path::new("/nonexistent/atelier.toml")), env(&[]));
        assert!(matches!(result, Err(ConsoleError::Config(_))));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = ConsoleConfig::default();
        config.playback.load_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_caps_timings() {
        let config = ConsoleConfig::load_with(
            None,
            env(&[("ATELIER_PLAYBACK__SETTLE_DELAY_MS", "3600000")]),
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("playback.settle_delay_ms"));

        let mut config = ConsoleConfig::default();
        config.playback.seek_debounce_ms = MAX_TIMING_MS + 1;
        assert!(config.validate().is_err());

        config.playback.seek_debounce_ms = MAX_TIMING_MS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_volume() {
        let mut config = ConsoleConfig::default();
        config.playback.initial_volume = 140;
        assert!(config.validate().is_err());

        let mut config = ConsoleConfig::default();
        config.controls.volume_step = 0;
        assert!(config.validate().is_err());
    }
}
