use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FLUSH_EVERY_SECONDS: u64 = 30;

/// Accumulated viewing time, one unit per elapsed playback second.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchStats {
    #[serde(alias = "totalWatchTime", default)]
    pub total_watch_seconds: u64,
    #[serde(alias = "dailyWatchTime", default)]
    pub daily_watch_seconds: BTreeMap<String, u64>,
    #[serde(alias = "sectionWatchTime", default)]
    pub section_watch_seconds: BTreeMap<String, u64>,
}

/// Day bucket key, `YYYY-MM-DD` in UTC.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl WatchStats {
    /// Add `seconds` of viewing to every bucket. Counters saturate.
    pub fn record_seconds(&mut self, date: NaiveDate, section: &str, seconds: u64) {
        if seconds == 0 {
            return;
        }
        self.total_watch_seconds = self.total_watch_seconds.saturating_add(seconds);
        let daily = self.daily_watch_seconds.entry(date_key(date)).or_insert(0);
        *daily = daily.saturating_add(seconds);
        let by_section = self
            .section_watch_seconds
            .entry(section.to_string())
            .or_insert(0);
        *by_section = by_section.saturating_add(seconds);
    }

    pub fn seconds_on(&self, date: NaiveDate) -> u64 {
        self.daily_watch_seconds
            .get(&date_key(date))
            .copied()
            .unwrap_or(0)
    }

    pub fn today_seconds(&self) -> u64 {
        self.seconds_on(today())
    }

    /// Section with the most watch time. Ties go to the name that sorts first.
    pub fn most_watched_section(&self) -> Option<(&str, u64)> {
        self.section_watch_seconds
            .iter()
            .filter(|(_, secs)| **secs > 0)
            .fold(None, |best: Option<(&str, u64)>, (name, secs)| match best {
                Some((_, best_secs)) if best_secs >= *secs => best,
                _ => Some((name.as_str(), *secs)),
            })
    }

    /// Whether the total passed a multiple of `every` since it was `before`.
    pub fn crossed_flush_boundary(&self, before: u64, every: u64) -> bool {
        every > 0 && self.total_watch_seconds / every > before / every
    }
}

/// `m:ss` playback position.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn seconds_accumulate_in_all_buckets() {
        let mut stats = WatchStats::default();
        stats.record_seconds(day(1), "Basics", 2);
        stats.record_seconds(day(2), "Advanced", 1);
        stats.record_seconds(day(2), "Advanced", 0);

        assert_eq!(stats.total_watch_seconds, 3);
        assert_eq!(stats.seconds_on(day(1)), 2);
        assert_eq!(stats.seconds_on(day(2)), 1);
        assert_eq!(stats.seconds_on(day(3)), 0);
        assert_eq!(stats.daily_watch_seconds.get("2026-03-01"), Some(&2));
        assert_eq!(stats.most_watched_section(), Some(("Basics", 2)));
    }

    #[test]
    fn most_watched_none_when_empty() {
        assert_eq!(WatchStats::default().most_watched_section(), None);
    }

    #[test]
    fn flush_cadence() {
        let mut stats = WatchStats::default();
        stats.record_seconds(day(1), "S", 29);
        assert!(!stats.crossed_flush_boundary(0, 30));
        stats.record_seconds(day(1), "S", 1);
        assert!(stats.crossed_flush_boundary(29, 30));
        // one bulk step can jump past a boundary without landing on it
        stats.record_seconds(day(1), "S", 45);
        assert_eq!(stats.total_watch_seconds, 75);
        assert!(stats.crossed_flush_boundary(30, 30));
        assert!(!stats.crossed_flush_boundary(61, 30));
        assert!(!stats.crossed_flush_boundary(0, 0));
    }

    #[test]
    fn huge_bulk_step_saturates() {
        let mut stats = WatchStats::default();
        stats.record_seconds(day(1), "S", 10);
        stats.record_seconds(day(1), "S", u64::MAX);
        assert_eq!(stats.total_watch_seconds, u64::MAX);
        assert_eq!(stats.seconds_on(day(1)), u64::MAX);
        assert_eq!(stats.most_watched_section(), Some(("S", u64::MAX)));
    }

    #[test]
    fn reads_legacy_field_names() {
        let json = r#"{"totalWatchTime": 90, "dailyWatchTime": {"2026-03-01": 90}, "sectionWatchTime": {"A": 90}}"#;
        let stats: WatchStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_watch_seconds, 90);
        assert_eq!(stats.seconds_on(day(1)), 90);
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
    }
}
