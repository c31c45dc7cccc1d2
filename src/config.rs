use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::engine::autoplay::DEFAULT_AUTOPLAY_SECONDS;
use crate::engine::progress::DEFAULT_COMPLETION_THRESHOLD;
use crate::engine::watch_stats::DEFAULT_FLUSH_EVERY_SECONDS;

const APP_DIR: &str = "courseplayer";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_autoplay_enabled")]
    pub autoplay_enabled: bool,
    #[serde(default = "default_autoplay_seconds")]
    pub autoplay_seconds: u32,
    #[serde(default = "default_completion_threshold")]
    pub completion_threshold: f64,
    #[serde(default = "default_track_watch_stats")]
    pub track_watch_stats: bool,
    #[serde(default = "default_watch_stats_flush_seconds")]
    pub watch_stats_flush_seconds: u64,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_theme() -> String {
    "dark".to_string()
}
fn default_autoplay_enabled() -> bool {
    true
}
fn default_autoplay_seconds() -> u32 {
    DEFAULT_AUTOPLAY_SECONDS
}
fn default_completion_threshold() -> f64 {
    DEFAULT_COMPLETION_THRESHOLD
}
fn default_track_watch_stats() -> bool {
    true
}
fn default_watch_stats_flush_seconds() -> u64 {
    DEFAULT_FLUSH_EVERY_SECONDS
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .to_string_lossy()
        .to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            autoplay_enabled: default_autoplay_enabled(),
            autoplay_seconds: default_autoplay_seconds(),
            completion_threshold: default_completion_threshold(),
            track_watch_stats: default_track_watch_stats(),
            watch_stats_flush_seconds: default_watch_stats_flush_seconds(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Clamp values a hand-edited file may have pushed out of range.
    pub fn validate(&mut self) {
        if !(self.completion_threshold.is_finite()
            && self.completion_threshold > 0.0
            && self.completion_threshold <= 100.0)
        {
            self.completion_threshold = default_completion_threshold();
        }
        self.autoplay_seconds = self.autoplay_seconds.clamp(1, 60);
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
    }
}
