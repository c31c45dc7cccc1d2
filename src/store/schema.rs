use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::engine::progress::{ProgressRecord, lenient_f64};
use crate::engine::watch_stats::WatchStats;

// Synchronous key/value channel
pub const COURSE_STATE_KEY: &str = "courseState";
pub const PLAYBACK_RATE_KEY: &str = "video_playback_rate";
const COMPLETED_LESSONS_PREFIX: &str = "completed_lessons_";

// Structured channel
pub const DB_NAME: &str = "coursePlayerDB";
pub const DB_VERSION: u32 = 2;
pub const FOLDER_HANDLE_PARTITION: &str = "folderHandle";
pub const FOLDER_HANDLE_KEY: &str = "folderHandle";
pub const COURSE_PATH_PARTITION: &str = "coursePath";
pub const COURSE_INFO_KEY: &str = "courseInfo";
pub const PARTITIONS: &[&str] = &[FOLDER_HANDLE_PARTITION, COURSE_PATH_PARTITION];

pub const PLAYBACK_SPEEDS: &[f64] = &[0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

pub fn completed_lessons_key(course_name: &str) -> String {
    format!("{COMPLETED_LESSONS_PREFIX}{course_name}")
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Dark => "dark",
            ThemeMode::Light => "light",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dark" => Some(ThemeMode::Dark),
            "light" => Some(ThemeMode::Light),
            _ => None,
        }
    }
}

/// Process-wide player preferences, independent of any course.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_playback_speed", deserialize_with = "lenient_f64")]
    pub playback_speed: f64,
    #[serde(default = "default_volume", deserialize_with = "lenient_f64")]
    pub volume: f64,
    #[serde(default)]
    pub theme: ThemeMode,
    #[serde(default)]
    pub mini_player_enabled: bool,
    #[serde(default)]
    pub pip_enabled: bool,
}

fn default_playback_speed() -> f64 {
    1.0
}
fn default_volume() -> f64 {
    1.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            playback_speed: default_playback_speed(),
            volume: default_volume(),
            theme: ThemeMode::default(),
            mini_player_enabled: false,
            pip_enabled: false,
        }
    }
}

impl Settings {
    /// Repair values that came back from storage out of range.
    pub fn normalize(&mut self) {
        if !(self.playback_speed.is_finite() && self.playback_speed > 0.0) {
            self.playback_speed = default_playback_speed();
        }
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            default_volume()
        };
    }
}

/// The `courseState` blob, overwritten wholesale on every save.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub progress: HashMap<String, ProgressRecord>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_stats: Option<WatchStats>,
}

/// Durable permission to re-read a chosen folder. Lives only in the
/// structured store's `folderHandle` partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderGrant {
    pub name: String,
    pub root: PathBuf,
}

/// Last-known course display metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub path: String,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl CourseInfo {
    pub fn now(path: &str, name: &str) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob_gives_defaults() {
        let state: PersistedState = serde_json::from_str("{}").unwrap();
        assert!(state.progress.is_empty());
        assert_eq!(state.settings, Settings::default());
        assert!(state.watch_stats.is_none());
    }

    #[test]
    fn reads_blob_written_by_older_player() {
        let json = r#"{
            "progress": {"Basics/1 Intro.mp4": {"time": 50, "duration": 100, "percentage": 50}},
            "settings": {"playbackSpeed": 1.5, "volume": "0.4", "theme": "light", "miniPlayerEnabled": false, "pipEnabled": true}
        }"#;
        let state: PersistedState = serde_json::from_str(json).unwrap();
        let record = &state.progress["Basics/1 Intro.mp4"];
        assert_eq!(record.current_time, 50.0);
        assert!(!record.completed);
        assert_eq!(state.settings.playback_speed, 1.5);
        assert_eq!(state.settings.volume, 0.4);
        assert_eq!(state.settings.theme, ThemeMode::Light);
        assert!(state.settings.pip_enabled);
    }

    #[test]
    fn settings_missing_fields_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"theme": "dark"}"#).unwrap();
        assert_eq!(settings.playback_speed, 1.0);
        assert_eq!(settings.volume, 1.0);
    }

    #[test]
    fn normalize_clamps_out_of_range_values() {
        let mut settings = Settings {
            playback_speed: -2.0,
            volume: 3.0,
            ..Settings::default()
        };
        settings.normalize();
        assert_eq!(settings.playback_speed, 1.0);
        assert_eq!(settings.volume, 1.0);
    }

    #[test]
    fn theme_toggle_and_names() {
        assert_eq!(ThemeMode::Dark.toggled(), ThemeMode::Light);
        assert_eq!(ThemeMode::from_name("LIGHT"), Some(ThemeMode::Light));
        assert_eq!(ThemeMode::from_name("sepia"), None);
    }

    #[test]
    fn completed_key_includes_course_name() {
        assert_eq!(completed_lessons_key("Rust 101"), "completed_lessons_Rust 101");
    }
}
