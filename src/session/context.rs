use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::config::Config;
use crate::course::builder::{build_course_from_files, build_from_grant};
use crate::course::listing::RelativeFile;
use crate::course::{Course, Lesson};
use crate::engine::autoplay::AutoAdvance;
use crate::engine::navigation;
use crate::engine::progress::{LessonStatus, ProgressChange, ProgressStore};
use crate::engine::summary::CourseSummary;
use crate::engine::watch_stats::{self, WatchStats};
use crate::error::{AccessError, SessionError, UnsupportedEnvironmentError};
use crate::session::SessionState;
use crate::session::access::{FolderAccess, LocalFolderAccess, Permission, probe_data_dir};
use crate::session::playback::{FileMediaOpener, MediaOpener, PlaybackSession};
use crate::store::gateway::{DurableStateGateway, ResetOutcome};
use crate::store::schema::{CourseInfo, FolderGrant, PersistedState, Settings, ThemeMode};

/// Everything one running player owns. All state changes go through the
/// methods below; there is no other mutable course state in the process.
pub struct Session {
    pub(crate) config: Config,
    pub(crate) gateway: DurableStateGateway,
    pub(crate) access: Box<dyn FolderAccess>,
    playback: PlaybackSession,
    pub(crate) progress: ProgressStore,
    pub(crate) settings: Settings,
    watch_stats: WatchStats,
    pub(crate) course: Option<Course>,
    pub(crate) grant: Option<FolderGrant>,
    pub(crate) course_info: Option<CourseInfo>,
    current_lesson: Option<String>,
    autoplay: AutoAdvance,
    /// Bumped whenever the lesson set changes (course opened, cleared, reset).
    generation: u64,
    pub(crate) state: SessionState,
}

impl Session {
    pub fn new(
        config: Config,
        gateway: DurableStateGateway,
        access: Box<dyn FolderAccess>,
        opener: Box<dyn MediaOpener>,
    ) -> Result<Self, UnsupportedEnvironmentError> {
        access.check_environment()?;
        let threshold = config.completion_threshold;
        Ok(Self {
            config,
            gateway,
            access,
            playback: PlaybackSession::new(opener),
            progress: ProgressStore::new(threshold),
            settings: Settings::default(),
            watch_stats: WatchStats::default(),
            course: None,
            grant: None,
            course_info: None,
            current_lesson: None,
            autoplay: AutoAdvance::default(),
            generation: 0,
            state: SessionState::NoCourse,
        })
    }

    /// Local file system session with its state under `config.data_dir`.
    pub fn open(config: Config) -> Result<Self, UnsupportedEnvironmentError> {
        let data_dir = config.data_dir();
        fs::create_dir_all(&data_dir).map_err(|e| {
            warn!(dir = %data_dir.display(), error = %e, "cannot create data directory");
            UnsupportedEnvironmentError::NoDataDirectory
        })?;
        probe_data_dir(&data_dir)?;
        let gateway = DurableStateGateway::open(&data_dir);
        Self::new(
            config,
            gateway,
            Box::new(LocalFolderAccess),
            Box::new(FileMediaOpener),
        )
    }

    // --- accessors ---

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    pub fn grant(&self) -> Option<&FolderGrant> {
        self.grant.as_ref()
    }

    pub fn course_info(&self) -> Option<&CourseInfo> {
        self.course_info.as_ref()
    }

    pub fn course_name(&self) -> Option<&str> {
        self.course
            .as_ref()
            .map(|c| c.name.as_str())
            .or_else(|| self.course_info.as_ref().map(|i| i.name.as_str()))
    }

    pub fn current_lesson(&self) -> Option<&Lesson> {
        let path = self.current_lesson.as_deref()?;
        self.course.as_ref()?.find_lesson(path)
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_lesson.as_deref()
    }

    pub fn is_media_loaded(&self) -> bool {
        self.playback.is_loaded()
    }

    pub fn media_location(&self) -> Option<&Path> {
        self.playback.current_location()
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn watch_stats(&self) -> &WatchStats {
        &self.watch_stats
    }

    pub fn autoplay(&self) -> &AutoAdvance {
        &self.autoplay
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lesson_status(&self, path: &str) -> LessonStatus {
        self.progress.status(path)
    }

    pub fn summary(&self) -> Option<CourseSummary> {
        self.course
            .as_ref()
            .map(|course| CourseSummary::build(course, &self.progress))
    }

    // --- persisted state ---

    /// Read the synchronous channel and course metadata into memory.
    pub(crate) fn load(&mut self) {
        let state = self.gateway.load_state();
        self.progress = ProgressStore::from_records(state.progress, self.config.completion_threshold);
        self.settings = state.settings;
        if let Some(rate) = self.gateway.load_playback_rate() {
            self.settings.playback_speed = rate;
        }
        self.watch_stats = state.watch_stats.unwrap_or_default();
        self.course_info = self.gateway.load_course_info();
        info!(
            records = self.progress.len(),
            course = self.course_info.as_ref().map(|i| i.name.as_str()),
            "saved state loaded"
        );
    }

    /// Write the whole `courseState` blob plus the derived completion cache.
    /// Returns false when storage rejected the write; memory is unaffected.
    pub fn persist(&mut self) -> bool {
        let watch_stats = (self.config.track_watch_stats || self.watch_stats != WatchStats::default())
            .then(|| self.watch_stats.clone());
        let state = PersistedState {
            progress: self.progress.records().clone(),
            settings: self.settings.clone(),
            watch_stats,
        };
        let mut saved = self.gateway.save_state(&state);
        if let Some(course) = &self.course {
            let completed = self.progress.completed_paths(course);
            saved &= self.gateway.save_completed_cache(&course.name, &completed);
        }
        saved
    }

    // --- course lifecycle ---

    /// The user picked `root`. The tree is built before anything is
    /// persisted or replaced, so any failure leaves the previous course,
    /// grant and stored records untouched.
    pub fn open_folder(&mut self, root: &Path) -> Result<&Course, SessionError> {
        let grant = self.access.grant(root)?;
        if self.access.request_permission(&grant)? == Permission::Denied {
            return Err(AccessError::Denied(grant.root.clone()).into());
        }
        let course = build_from_grant(self.access.as_ref(), &grant)?;

        let info = CourseInfo::now(&grant.name, &grant.name);
        self.gateway.store_grant(&grant);
        self.gateway.store_course_info(&info);
        info!(course = %course.name, lessons = course.lesson_count(), "course folder opened");

        self.install_course(course, Some(grant), info);
        self.course.as_ref().ok_or(SessionError::NoCourse)
    }

    /// Load a course from a flat selection of `Course/Section/file` paths.
    /// No grant exists for such a course, so any stored one is cleared.
    pub fn load_files(&mut self, files: &[RelativeFile]) -> Result<&Course, SessionError> {
        let course = build_course_from_files(files).ok_or(SessionError::EmptySelection)?;
        self.gateway.clear_course();
        let info = CourseInfo::now(&course.name, &course.name);
        info!(course = %course.name, lessons = course.lesson_count(), "course files loaded");
        self.install_course(course, None, info);
        self.course.as_ref().ok_or(SessionError::NoCourse)
    }

    pub(crate) fn install_course(
        &mut self,
        course: Course,
        grant: Option<FolderGrant>,
        info: CourseInfo,
    ) {
        self.unload_lesson();
        self.generation += 1;
        self.course = Some(course);
        self.grant = grant;
        self.course_info = Some(info);
        self.state = SessionState::CourseLoaded;
        self.persist();
    }

    /// Forget the current course: stored grant and metadata, in-memory tree,
    /// open media and any pending auto-advance. Progress records survive so a
    /// later reopen of the same folder picks them up again.
    pub fn clear_course(&mut self) -> bool {
        self.state = SessionState::Clearing;
        let cleared = self.gateway.clear_course();
        self.drop_course();
        info!(stored_records_cleared = cleared, "course cleared");
        cleared
    }

    /// Remove progress records for every lesson of the loaded course.
    pub fn forget_course_progress(&mut self) -> usize {
        let Some(course) = &self.course else {
            return 0;
        };
        let removed = self.progress.forget_course(course);
        self.persist();
        removed
    }

    /// Destroy the structured store and start over with a fresh one.
    pub fn reset_database(&mut self) -> ResetOutcome {
        let outcome = self.gateway.reset_all();
        if outcome == ResetOutcome::Reinitialized {
            self.drop_course();
        }
        outcome
    }

    fn drop_course(&mut self) {
        self.unload_lesson();
        self.generation += 1;
        self.course = None;
        self.grant = None;
        self.course_info = None;
        self.state = SessionState::NoCourse;
    }

    fn unload_lesson(&mut self) {
        self.autoplay.cancel();
        self.playback.release();
        self.current_lesson = None;
    }

    fn lesson(&self, path: &str) -> Result<&Lesson, SessionError> {
        let course = self.course.as_ref().ok_or(SessionError::NoCourse)?;
        course
            .find_lesson(path)
            .ok_or_else(|| SessionError::UnknownLesson(path.to_string()))
    }

    // --- playback ---

    /// Make `path` the current lesson and open its file. Returns the saved
    /// position to resume from. A file that fails to open still becomes the
    /// current lesson so navigation can continue past it.
    pub fn select_lesson(&mut self, path: &str) -> Result<Option<f64>, SessionError> {
        let lesson = self.lesson(path)?.clone();
        self.autoplay.cancel();
        self.current_lesson = Some(lesson.path.clone());
        self.playback.load(&lesson)?;
        let resume = self
            .progress
            .get(&lesson.path)
            .map(|record| record.current_time)
            .filter(|time| *time > 0.0);
        Ok(resume)
    }

    pub fn record_tick(
        &mut self,
        path: &str,
        current_time: f64,
        duration: f64,
    ) -> Result<ProgressChange, SessionError> {
        self.lesson(path)?;
        let change = self.progress.record_tick(path, current_time, duration);
        if change == ProgressChange::NewlyCompleted {
            info!(lesson = path, "lesson completed");
        }
        self.persist();
        Ok(change)
    }

    /// Playback of `path` reached its end. Starts the auto-advance countdown
    /// when autoplay is on and a next lesson exists.
    pub fn record_ended(&mut self, path: &str) -> Result<ProgressChange, SessionError> {
        self.lesson(path)?;
        let change = self.progress.record_ended(path);
        self.persist();

        if self.config.autoplay_enabled {
            let next = self
                .course
                .as_ref()
                .and_then(|course| navigation::next(course, path))
                .map(|lesson| lesson.path.clone());
            if let Some(next) = next {
                self.autoplay
                    .start(&next, self.config.autoplay_seconds, self.generation);
            }
        }
        Ok(change)
    }

    pub fn toggle_completed(&mut self, path: &str) -> Result<bool, SessionError> {
        self.lesson(path)?;
        let completed = self.progress.toggle_completed(path);
        self.persist();
        Ok(completed)
    }

    /// Count `seconds` of playback of the current lesson toward watch stats.
    pub fn record_watch_seconds(&mut self, seconds: u64) {
        if !self.config.track_watch_stats {
            return;
        }
        let Some(section) = self.current_lesson().map(|l| l.section_name().to_string()) else {
            return;
        };
        let before = self.watch_stats.total_watch_seconds;
        self.watch_stats
            .record_seconds(watch_stats::today(), &section, seconds);
        if self
            .watch_stats
            .crossed_flush_boundary(before, self.config.watch_stats_flush_seconds)
        {
            self.persist();
        }
    }

    // --- navigation ---

    /// Select the lesson after the current one, or the first lesson when
    /// nothing is selected yet. `Ok(None)` at the end of the course.
    pub fn next_lesson(&mut self) -> Result<Option<String>, SessionError> {
        let course = self.course.as_ref().ok_or(SessionError::NoCourse)?;
        let target = match self.current_lesson.as_deref() {
            Some(current) => navigation::next(course, current),
            None => navigation::first(course),
        }
        .map(|lesson| lesson.path.clone());
        self.select_target(target)
    }

    pub fn previous_lesson(&mut self) -> Result<Option<String>, SessionError> {
        let course = self.course.as_ref().ok_or(SessionError::NoCourse)?;
        let target = self
            .current_lesson
            .as_deref()
            .and_then(|current| navigation::previous(course, current))
            .map(|lesson| lesson.path.clone());
        self.select_target(target)
    }

    pub fn is_last_lesson(&self) -> bool {
        match (&self.course, self.current_lesson.as_deref()) {
            (Some(course), Some(path)) => navigation::is_last(course, path),
            _ => true,
        }
    }

    /// Skip the rest of a running countdown.
    pub fn play_next_now(&mut self) -> Result<Option<String>, SessionError> {
        let target = self.autoplay.fire_now(self.generation);
        self.select_target(target)
    }

    pub fn cancel_autoplay(&mut self) -> bool {
        self.autoplay.cancel()
    }

    /// Advance the countdown by one second; loads the next lesson when it
    /// reaches zero.
    pub fn autoplay_tick(&mut self) -> Result<Option<String>, SessionError> {
        let target = self.autoplay.tick(self.generation);
        self.select_target(target)
    }

    fn select_target(&mut self, target: Option<String>) -> Result<Option<String>, SessionError> {
        match target {
            Some(path) => {
                self.select_lesson(&path)?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    // --- settings ---

    /// Rejects rates that are not positive and finite.
    pub fn set_playback_speed(&mut self, rate: f64) -> bool {
        if !(rate.is_finite() && rate > 0.0) {
            return false;
        }
        self.settings.playback_speed = rate;
        self.gateway.save_playback_rate(rate);
        self.persist();
        true
    }

    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_finite() {
            self.settings.volume = volume.clamp(0.0, 1.0);
            self.persist();
        }
    }

    pub fn toggle_theme(&mut self) -> ThemeMode {
        self.settings.theme = self.settings.theme.toggled();
        self.persist();
        self.settings.theme
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        self.settings.theme = theme;
        self.persist();
    }

    pub fn set_mini_player(&mut self, enabled: bool) {
        self.settings.mini_player_enabled = enabled;
        self.persist();
    }

    pub fn set_pip(&mut self, enabled: bool) {
        self.settings.pip_enabled = enabled;
        self.persist();
    }

    /// Release the open file and write everything out.
    pub fn shutdown(&mut self) -> bool {
        self.unload_lesson();
        self.persist()
    }
}
