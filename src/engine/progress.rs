use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::course::Course;

pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 90.0;

/// Watch state for one lesson.
///
/// Field names match the persisted `courseState` blob (`time`, `duration`,
/// `percentage`, `completed`). Numbers are read leniently: older blobs can hold
/// `null` for an unknown duration or strings written by form inputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(
        rename = "time",
        alias = "currentTimeSeconds",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub current_time: f64,
    #[serde(alias = "durationSeconds", default, deserialize_with = "lenient_f64")]
    pub duration: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub percentage: f64,
    #[serde(default)]
    pub completed: bool,
}

/// Accept a number, a numeric string, or null (as 0).
pub fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Number(n)) if n.is_finite() => n,
        Some(Loose::Text(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressChange {
    Updated,
    /// The record crossed into `completed` on this call. Fired once per transition.
    NewlyCompleted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LessonStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Path-keyed progress for every lesson ever watched. Outlives any single
/// course: records reattach when a folder with the same layout is reopened.
#[derive(Clone, Debug)]
pub struct ProgressStore {
    records: HashMap<String, ProgressRecord>,
    threshold: f64,
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETION_THRESHOLD)
    }
}

impl ProgressStore {
    pub fn new(threshold: f64) -> Self {
        Self::from_records(HashMap::new(), threshold)
    }

    pub fn from_records(records: HashMap<String, ProgressRecord>, threshold: f64) -> Self {
        Self { records, threshold }
    }

    pub fn records(&self) -> &HashMap<String, ProgressRecord> {
        &self.records
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `None` means never watched, which is distinct from a record at 0%.
    pub fn get(&self, path: &str) -> Option<&ProgressRecord> {
        self.records.get(path)
    }

    pub fn is_completed(&self, path: &str) -> bool {
        self.records.get(path).is_some_and(|r| r.completed)
    }

    pub fn status(&self, path: &str) -> LessonStatus {
        match self.records.get(path) {
            Some(r) if r.completed => LessonStatus::Completed,
            Some(r) if r.current_time > 0.0 => LessonStatus::InProgress,
            _ => LessonStatus::NotStarted,
        }
    }

    /// Playback position update. Recomputes the percentage when the duration
    /// is known and marks the lesson complete the first time it reaches the
    /// threshold. Never clears `completed`.
    pub fn record_tick(&mut self, path: &str, current_time: f64, duration: f64) -> ProgressChange {
        let threshold = self.threshold;
        let record = self.records.entry(path.to_string()).or_default();

        record.current_time = if current_time.is_finite() {
            current_time.max(0.0)
        } else {
            0.0
        };
        if duration.is_finite() && duration > 0.0 {
            record.duration = duration;
        }
        if record.duration > 0.0 {
            record.percentage = record.current_time / record.duration * 100.0;
        }

        if !record.completed && record.percentage >= threshold {
            record.completed = true;
            ProgressChange::NewlyCompleted
        } else {
            ProgressChange::Updated
        }
    }

    /// Natural end of media: always completes, whatever the percentage says.
    pub fn record_ended(&mut self, path: &str) -> ProgressChange {
        let record = self.records.entry(path.to_string()).or_default();
        if record.completed {
            ProgressChange::Updated
        } else {
            record.completed = true;
            ProgressChange::NewlyCompleted
        }
    }

    /// User-driven flip of the completed flag. Returns the new value.
    pub fn toggle_completed(&mut self, path: &str) -> bool {
        let record = self.records.entry(path.to_string()).or_default();
        record.completed = !record.completed;
        record.completed
    }

    /// Completed lesson keys of `course`, in course order.
    pub fn completed_paths(&self, course: &Course) -> Vec<String> {
        course
            .lessons()
            .filter(|l| self.is_completed(&l.path))
            .map(|l| l.path.clone())
            .collect()
    }

    /// Drop every record belonging to `course`. Returns how many were removed.
    pub fn forget_course(&mut self, course: &Course) -> usize {
        let before = self.records.len();
        for lesson in course.lessons() {
            self.records.remove(&lesson.path);
        }
        before - self.records.len()
    }
}
