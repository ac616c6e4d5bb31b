use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{LyricError, Result, Theme};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Location of the song catalog. Audio paths resolve against its directory.
    pub catalog: PathBuf,
    pub playback: PlaybackConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from(crate::catalog::DEFAULT_CATALOG_FILE),
            playback: PlaybackConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.playback.validate()
    }
}

/// Timing and presentation defaults for a playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Granularity of every cooperative wait, in milliseconds.
    pub poll_interval_ms: u64,
    /// How often the audio backend is asked whether it is still busy.
    pub completion_poll_ms: u64,
    pub volume: f32,
    pub theme: Theme,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            completion_poll_ms: 100,
            volume: 1.0,
            theme: Theme::Plain,
        }
    }
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn completion_poll(&self) -> Duration {
        Duration::from_millis(self.completion_poll_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 || self.completion_poll_ms == 0 {
            return Err(LyricError::InvalidConfig(
                "poll intervals must be at least 1 ms".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(LyricError::InvalidConfig(format!(
                "volume {} is outside 0.0..=1.0",
                self.volume
            )));
        }
        Ok(())
    }
}
