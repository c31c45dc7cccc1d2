//! Persistence boundary.
//!
//! Two channels: a synchronous key/value store holding the `courseState`
//! blob and small preferences, and a versioned structured store holding the
//! folder grant and course metadata. Nothing here returns an error to the
//! caller: failures are logged and turned into "no value" or a no-op, so
//! storage trouble can never block playback.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::store::kv::{FileKvStore, KeyValueStore, MemoryKvStore};
use crate::store::schema::{
    COURSE_INFO_KEY, COURSE_PATH_PARTITION, COURSE_STATE_KEY, CourseInfo, DB_NAME, DB_VERSION,
    FOLDER_HANDLE_KEY, FOLDER_HANDLE_PARTITION, FolderGrant, PARTITIONS, PLAYBACK_RATE_KEY,
    PersistedState, completed_lessons_key,
};
use crate::store::structured::{FileStructuredStore, MemoryStructuredStore, StructuredStore};

const STATE_DIR: &str = "state";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The store was wiped and a fresh one is ready; callers should rebuild
    /// their in-memory state from scratch.
    Reinitialized,
    Failed,
}

pub struct DurableStateGateway {
    kv: Box<dyn KeyValueStore>,
    structured: Box<dyn StructuredStore>,
    /// Set when the structured store is a file store or a memory stand-in
    /// for one that failed to open.
    db_base_dir: Option<PathBuf>,
    structured_is_fallback: bool,
}

impl DurableStateGateway {
    pub fn new(kv: Box<dyn KeyValueStore>, structured: Box<dyn StructuredStore>) -> Self {
        Self {
            kv,
            structured,
            db_base_dir: None,
            structured_is_fallback: false,
        }
    }

    /// File-backed gateway under `data_dir`. A channel that cannot be opened
    /// is replaced by an in-memory store for this run.
    pub fn open(data_dir: &Path) -> Self {
        let kv: Box<dyn KeyValueStore> = match FileKvStore::new(data_dir.join(STATE_DIR)) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!(error = %e, "progress storage unavailable; changes will not be saved");
                Box::new(MemoryKvStore::new())
            }
        };

        let (structured, structured_is_fallback): (Box<dyn StructuredStore>, bool) =
            match FileStructuredStore::open(data_dir, DB_NAME, DB_VERSION, PARTITIONS) {
                Ok(store) => (Box::new(store), false),
                Err(e) => {
                    error!(
                        error = %e,
                        "course database unusable; folder access will not be remembered (reset it to recover)"
                    );
                    (Box::new(MemoryStructuredStore::default()), true)
                }
            };

        Self {
            kv,
            structured,
            db_base_dir: Some(data_dir.to_path_buf()),
            structured_is_fallback,
        }
    }

    // --- synchronous channel ---

    /// Read the `courseState` blob. Missing, unreadable or corrupt data all
    /// yield defaults.
    pub fn load_state(&self) -> PersistedState {
        let mut state = match self.kv.get(COURSE_STATE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedState>(&raw) {
                Ok(state) => state,
                Err(e) => {
                    warn!(error = %e, "saved course state is corrupt; starting fresh");
                    PersistedState::default()
                }
            },
            Ok(None) => PersistedState::default(),
            Err(e) => {
                warn!(error = %e, "could not read saved course state; starting fresh");
                PersistedState::default()
            }
        };
        state.settings.normalize();
        state
    }

    /// Overwrite the `courseState` blob with `state`.
    pub fn save_state(&mut self, state: &PersistedState) -> bool {
        self.write_kv_json(COURSE_STATE_KEY, state)
    }

    pub fn load_playback_rate(&self) -> Option<f64> {
        let raw = self.read_kv(PLAYBACK_RATE_KEY)?;
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }

    pub fn save_playback_rate(&mut self, rate: f64) -> bool {
        self.write_kv(PLAYBACK_RATE_KEY, &rate.to_string())
    }

    /// Completed lesson keys cached for `course_name`. Derived data: the
    /// progress records remain the source of truth.
    pub fn load_completed_cache(&self, course_name: &str) -> Vec<String> {
        self.read_kv(&completed_lessons_key(course_name))
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(paths) => Some(paths),
                Err(e) => {
                    warn!(error = %e, course = course_name, "completed lessons cache is corrupt");
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn save_completed_cache(&mut self, course_name: &str, paths: &[String]) -> bool {
        self.write_kv_json(&completed_lessons_key(course_name), &paths)
    }

    fn read_kv(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "storage read failed");
                None
            }
        }
    }

    fn write_kv(&mut self, key: &str, value: &str) -> bool {
        match self.kv.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "storage write failed; keeping in-memory state");
                false
            }
        }
    }

    fn write_kv_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.write_kv(key, &json),
            Err(e) => {
                error!(key, error = %e, "could not serialize state");
                false
            }
        }
    }

    // --- structured channel ---

    pub fn store_grant(&mut self, grant: &FolderGrant) -> bool {
        self.put_record(FOLDER_HANDLE_PARTITION, FOLDER_HANDLE_KEY, grant)
    }

    pub fn load_grant(&self) -> Option<FolderGrant> {
        self.get_record(FOLDER_HANDLE_PARTITION, FOLDER_HANDLE_KEY)
    }

    pub fn store_course_info(&mut self, info: &CourseInfo) -> bool {
        self.put_record(COURSE_PATH_PARTITION, COURSE_INFO_KEY, info)
    }

    pub fn load_course_info(&self) -> Option<CourseInfo> {
        self.get_record(COURSE_PATH_PARTITION, COURSE_INFO_KEY)
    }

    /// Delete the stored grant and course metadata. Returns false if either
    /// delete failed (both are still attempted).
    pub fn clear_course(&mut self) -> bool {
        let grant = self.delete_record(FOLDER_HANDLE_PARTITION, FOLDER_HANDLE_KEY);
        let info = self.delete_record(COURSE_PATH_PARTITION, COURSE_INFO_KEY);
        grant && info
    }

    /// Destroy the structured store and bring up a fresh, empty one.
    pub fn reset_all(&mut self) -> ResetOutcome {
        if let Err(e) = self.structured.destroy() {
            error!(error = %e, "could not delete course database");
            return ResetOutcome::Failed;
        }

        if self.structured_is_fallback
            && let Some(base) = &self.db_base_dir
        {
            let db_dir = base.join(DB_NAME);
            if let Err(e) = fs::remove_dir_all(&db_dir)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                error!(error = %e, "could not delete course database");
                return ResetOutcome::Failed;
            }
            match FileStructuredStore::open(base, DB_NAME, DB_VERSION, PARTITIONS) {
                Ok(store) => {
                    self.structured = Box::new(store);
                    self.structured_is_fallback = false;
                    info!("course database recreated");
                    return ResetOutcome::Reinitialized;
                }
                Err(e) => {
                    error!(error = %e, "course database still unusable after reset");
                    return ResetOutcome::Failed;
                }
            }
        }

        match self.structured.reopen() {
            Ok(()) => {
                info!("course database reset");
                ResetOutcome::Reinitialized
            }
            Err(e) => {
                error!(error = %e, "could not reinitialize course database");
                ResetOutcome::Failed
            }
        }
    }

    fn put_record<T: Serialize>(&mut self, partition: &str, key: &str, value: &T) -> bool {
        let result = serde_json::to_value(value)
            .map_err(StoreError::from)
            .and_then(|json| self.structured.put(partition, key, &json));
        match result {
            Ok(()) => {
                debug!(partition, key, "record stored");
                true
            }
            Err(e) => {
                error!(partition, key, error = %e, "could not store record");
                false
            }
        }
    }

    fn get_record<T: DeserializeOwned>(&self, partition: &str, key: &str) -> Option<T> {
        let value = match self.structured.get(partition, key) {
            Ok(value) => value?,
            Err(e) => {
                warn!(partition, key, error = %e, "could not read record");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(partition, key, error = %e, "stored record is malformed");
                None
            }
        }
    }

    fn delete_record(&mut self, partition: &str, key: &str) -> bool {
        match self.structured.delete(partition, key) {
            Ok(()) => true,
            Err(e) => {
                error!(partition, key, error = %e, "could not delete record");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::ProgressRecord;
    use crate::store::schema::ThemeMode;
    use tempfile::TempDir;

    fn memory_gateway() -> DurableStateGateway {
        DurableStateGateway::new(
            Box::new(MemoryKvStore::new()),
            Box::new(MemoryStructuredStore::default()),
        )
    }

    fn grant() -> FolderGrant {
        FolderGrant {
            name: "MyCourse".to_string(),
            root: PathBuf::from("/courses/MyCourse"),
        }
    }

    #[test]
    fn state_round_trips_through_files() {
        let dir = TempDir::new().unwrap();
        let mut state = PersistedState::default();
        state.settings.theme = ThemeMode::Light;
        state.progress.insert(
            "Basics/1 Intro.mp4".to_string(),
            ProgressRecord {
                current_time: 10.0,
                duration: 100.0,
                percentage: 10.0,
                completed: false,
            },
        );
        DurableStateGateway::open(dir.path()).save_state(&state);

        let reopened = DurableStateGateway::open(dir.path());
        assert_eq!(reopened.load_state(), state);
    }

    #[test]
    fn corrupt_blob_degrades_to_defaults() {
        let gateway = DurableStateGateway::new(
            Box::new(MemoryKvStore::new().with_entry(COURSE_STATE_KEY, "{not json")),
            Box::new(MemoryStructuredStore::default()),
        );
        assert_eq!(gateway.load_state(), PersistedState::default());
    }

    #[test]
    fn unreadable_storage_degrades_to_defaults() {
        let gateway = DurableStateGateway::new(
            Box::new(MemoryKvStore::failing_reads()),
            Box::new(MemoryStructuredStore::default()),
        );
        assert_eq!(gateway.load_state(), PersistedState::default());
        assert_eq!(gateway.load_playback_rate(), None);
    }

    #[test]
    fn failed_write_reports_false_without_panicking() {
        let mut gateway = DurableStateGateway::new(
            Box::new(MemoryKvStore::failing_writes()),
            Box::new(MemoryStructuredStore::default()),
        );
        assert!(!gateway.save_state(&PersistedState::default()));
        assert!(!gateway.save_playback_rate(1.5));
    }

    #[test]
    fn playback_rate_rejects_garbage() {
        let gateway = DurableStateGateway::new(
            Box::new(MemoryKvStore::new().with_entry(PLAYBACK_RATE_KEY, "fast")),
            Box::new(MemoryStructuredStore::default()),
        );
        assert_eq!(gateway.load_playback_rate(), None);

        let mut gateway = memory_gateway();
        gateway.save_playback_rate(1.25);
        assert_eq!(gateway.load_playback_rate(), Some(1.25));
    }

    #[test]
    fn completed_cache_round_trip() {
        let mut gateway = memory_gateway();
        assert!(gateway.load_completed_cache("C").is_empty());
        gateway.save_completed_cache("C", &["A/1.mp4".to_string()]);
        assert_eq!(gateway.load_completed_cache("C"), vec!["A/1.mp4".to_string()]);
    }

    #[test]
    fn completed_caches_of_similar_course_names_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let mut gateway = DurableStateGateway::open(dir.path());
        gateway.save_completed_cache("My Course", &["A/1.mp4".to_string()]);
        gateway.save_completed_cache("My_Course", &[]);

        let reopened = DurableStateGateway::open(dir.path());
        assert_eq!(
            reopened.load_completed_cache("My Course"),
            vec!["A/1.mp4".to_string()]
        );
        assert!(reopened.load_completed_cache("My_Course").is_empty());
    }

    #[test]
    fn grant_and_course_info_are_independent() {
        let mut gateway = memory_gateway();
        assert!(gateway.store_grant(&grant()));
        assert_eq!(gateway.load_grant(), Some(grant()));
        assert_eq!(gateway.load_course_info(), None);

        let info = CourseInfo::now("MyCourse", "MyCourse");
        assert!(gateway.store_course_info(&info));
        assert_eq!(gateway.load_course_info(), Some(info));

        assert!(gateway.clear_course());
        assert_eq!(gateway.load_grant(), None);
        assert_eq!(gateway.load_course_info(), None);
    }

    #[test]
    fn reset_all_wipes_structured_data_but_not_progress() {
        let dir = TempDir::new().unwrap();
        let mut gateway = DurableStateGateway::open(dir.path());
        gateway.store_grant(&grant());
        gateway.save_playback_rate(2.0);

        assert_eq!(gateway.reset_all(), ResetOutcome::Reinitialized);
        assert_eq!(gateway.load_grant(), None);
        assert_eq!(gateway.load_playback_rate(), Some(2.0));
        assert!(gateway.store_grant(&grant()));
    }

    #[test]
    fn corrupt_database_falls_back_and_reset_recovers() {
        let dir = TempDir::new().unwrap();
        let db_dir = dir.path().join(DB_NAME);
        fs::create_dir_all(&db_dir).unwrap();
        fs::write(db_dir.join("meta.json"), "garbage").unwrap();

        let mut gateway = DurableStateGateway::open(dir.path());
        // still usable for this run
        assert!(gateway.store_grant(&grant()));

        assert_eq!(gateway.reset_all(), ResetOutcome::Reinitialized);
        assert!(gateway.store_grant(&grant()));
        let reopened = DurableStateGateway::open(dir.path());
        assert_eq!(reopened.load_grant(), Some(grant()));
    }
}
