use std::path::PathBuf;
use std::time::{Duration, Instant};

use courseplayer::engine::watch_stats::format_time;
use courseplayer::error::SessionError;
use courseplayer::store::schema::PLAYBACK_SPEEDS;
use courseplayer::{BootstrapReport, Session, SessionState};

use crate::ui::components::course_tree::{TreeRow, tree_rows};
use crate::ui::theme::Theme;

/// Seconds added by one press of the "watched" key.
pub const WATCH_STEP_SECONDS: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

#[derive(Clone, Debug)]
pub struct StatusMessage {
    pub text: String,
    pub kind: MessageKind,
}

pub struct App {
    pub session: Session,
    pub theme: Theme,
    pub rows: Vec<TreeRow>,
    pub selected: usize,
    pub message: Option<StatusMessage>,
    /// Folder path being typed after `o`.
    pub path_input: Option<String>,
    pub should_quit: bool,
    last_second: Instant,
}

impl App {
    pub fn new(session: Session, report: &BootstrapReport) -> Self {
        let theme = Theme::for_mode(session.settings().theme, &session.config().theme);
        let mut app = Self {
            session,
            theme,
            rows: Vec::new(),
            selected: 0,
            message: None,
            path_input: None,
            should_quit: false,
            last_second: Instant::now(),
        };
        app.refresh_rows();

        if let Some(e) = &report.tree_error {
            app.error(format!("Could not read the course folder: {e}. Press r to retry."));
        } else if report.permission_lost {
            app.error("Access to the course folder was lost. Press o to open it again.");
        } else if report.state == SessionState::CourseLoaded {
            let name = app.session.course_name().unwrap_or_default().to_string();
            app.info(format!("Restored {name}"));
        } else {
            app.info("Press o to open a course folder.");
        }
        app
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.message = Some(StatusMessage {
            text: text.into(),
            kind: MessageKind::Info,
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.message = Some(StatusMessage {
            text: text.into(),
            kind: MessageKind::Error,
        });
    }

    fn report(&mut self, err: SessionError) {
        self.error(err.to_string());
    }

    pub fn refresh_rows(&mut self) {
        self.rows = self.session.course().map(tree_rows).unwrap_or_default();
        self.follow_current();
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    /// Move the cursor onto the current lesson, if there is one.
    fn follow_current(&mut self) {
        let Some(current) = self.session.current_path() else {
            return;
        };
        if let Some(i) = self
            .rows
            .iter()
            .position(|row| matches!(row, TreeRow::Lesson(p) if p == current))
        {
            self.selected = i;
        }
    }

    pub fn selected_lesson(&self) -> Option<&str> {
        match self.rows.get(self.selected)? {
            TreeRow::Lesson(path) => Some(path),
            TreeRow::Section(_) => None,
        }
    }

    /// One-line summary of the open lesson for layouts without a lesson panel.
    pub fn now_playing(&self) -> Option<String> {
        let lesson = self.session.current_lesson()?;
        let position = match self.session.progress().get(&lesson.path) {
            Some(r) => format!("{} / {}", format_time(r.current_time), format_time(r.duration)),
            None => "not started".to_string(),
        };
        Some(format!("> {}  {position}", lesson.name))
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    // --- course ---

    pub fn open_folder(&mut self, input: &str) {
        let root = expand_home(input.trim());
        match self.session.open_folder(&root) {
            Ok(course) => {
                let text = format!(
                    "Opened {} ({} lessons in {} sections)",
                    course.name,
                    course.lesson_count(),
                    course.sections.len()
                );
                self.selected = 0;
                self.refresh_rows();
                self.info(text);
            }
            Err(e) => self.report(e),
        }
    }

    pub fn retry_restore(&mut self) {
        match self.session.retry_restore() {
            Ok(()) => {
                self.refresh_rows();
                if self.session.course().is_some() {
                    self.info("Course folder restored");
                }
            }
            Err(e) => self.error(format!("Still cannot read the course folder: {e}")),
        }
    }

    pub fn clear_course(&mut self) {
        self.session.clear_course();
        self.refresh_rows();
        self.info("Course cleared. Progress is kept for when you open it again.");
    }

    // --- lessons ---

    pub fn activate(&mut self) {
        if self.session.autoplay().is_counting() {
            self.play_now();
            return;
        }
        match self.rows.get(self.selected).cloned() {
            Some(TreeRow::Lesson(path)) => self.open_lesson(&path),
            Some(TreeRow::Section(_)) => self.move_down(),
            None => {}
        }
    }

    pub fn open_lesson(&mut self, path: &str) {
        match self.session.select_lesson(path) {
            Ok(resume) => {
                let name = self.current_name();
                match resume {
                    Some(time) => self.info(format!("{name}: resuming at {}", format_time(time))),
                    None => self.info(format!("{name}: opened")),
                }
            }
            Err(e) => self.report(e),
        }
        self.follow_current();
    }

    fn current_name(&self) -> String {
        self.session
            .current_lesson()
            .map(|l| l.name.clone())
            .unwrap_or_default()
    }

    pub fn mark_ended(&mut self) {
        let Some(path) = self.session.current_path().map(str::to_string) else {
            self.error("Open a lesson first.");
            return;
        };
        match self.session.record_ended(&path) {
            Ok(_) if self.session.autoplay().is_counting() => {}
            Ok(_) if self.session.is_last_lesson() => self.info("Course finished!"),
            Ok(_) => self.info("Lesson completed"),
            Err(e) => self.report(e),
        }
    }

    pub fn toggle_completed(&mut self) {
        let Some(path) = self
            .selected_lesson()
            .or(self.session.current_path())
            .map(str::to_string)
        else {
            return;
        };
        match self.session.toggle_completed(&path) {
            Ok(true) => self.info("Marked as completed"),
            Ok(false) => self.info("Marked as not completed"),
            Err(e) => self.report(e),
        }
    }

    /// Count `WATCH_STEP_SECONDS` of viewing of the open lesson, moving its
    /// saved position forward when its length is known.
    pub fn watch_step(&mut self) {
        let Some(path) = self.session.current_path().map(str::to_string) else {
            self.error("Open a lesson first.");
            return;
        };
        let step = WATCH_STEP_SECONDS as f64;
        if let Some(record) = self.session.progress().get(&path).cloned() {
            if record.duration > 0.0 {
                let time = (record.current_time + step).min(record.duration);
                if let Err(e) = self.session.record_tick(&path, time, record.duration) {
                    self.report(e);
                    return;
                }
            }
        }
        self.session.record_watch_seconds(WATCH_STEP_SECONDS);
    }

    pub fn next_lesson(&mut self) {
        match self.session.next_lesson() {
            Ok(Some(_)) => self.after_navigation(),
            Ok(None) => self.info("This is the last lesson."),
            Err(e) => self.report(e),
        }
    }

    pub fn previous_lesson(&mut self) {
        match self.session.previous_lesson() {
            Ok(Some(_)) => self.after_navigation(),
            Ok(None) => self.info("This is the first lesson."),
            Err(e) => self.report(e),
        }
    }

    fn after_navigation(&mut self) {
        self.follow_current();
        let name = self.current_name();
        self.info(format!("Playing {name}"));
    }

    pub fn play_now(&mut self) {
        match self.session.play_next_now() {
            Ok(Some(_)) => self.after_navigation(),
            Ok(None) => {}
            Err(e) => self.report(e),
        }
    }

    pub fn cancel_autoplay(&mut self) {
        if self.session.cancel_autoplay() {
            self.info("Autoplay cancelled");
        }
    }

    /// Called on every event-loop tick; drives the countdown once a second.
    pub fn on_tick(&mut self) {
        if self.last_second.elapsed() < Duration::from_secs(1) {
            return;
        }
        self.last_second = Instant::now();
        match self.session.autoplay_tick() {
            Ok(Some(_)) => self.after_navigation(),
            Ok(None) => {}
            Err(e) => self.report(e),
        }
    }

    // --- settings ---

    pub fn toggle_theme(&mut self) {
        let mode = self.session.toggle_theme();
        self.theme = Theme::for_mode(mode, &self.session.config().theme);
    }

    pub fn change_speed(&mut self, faster: bool) {
        let rate = step_speed(self.session.settings().playback_speed, faster);
        self.session.set_playback_speed(rate);
        self.info(format!("Playback speed {rate}x"));
    }

    pub fn quit(&mut self) {
        self.session.shutdown();
        self.should_quit = true;
    }
}

/// Next entry of the speed list above or below `current`, clamped at the ends.
pub fn step_speed(current: f64, faster: bool) -> f64 {
    if faster {
        PLAYBACK_SPEEDS
            .iter()
            .copied()
            .find(|s| *s > current + f64::EPSILON)
            .unwrap_or(PLAYBACK_SPEEDS[PLAYBACK_SPEEDS.len() - 1])
    } else {
        PLAYBACK_SPEEDS
            .iter()
            .rev()
            .copied()
            .find(|s| *s < current - f64::EPSILON)
            .unwrap_or(PLAYBACK_SPEEDS[0])
    }
}

fn expand_home(input: &str) -> PathBuf {
    match input.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(input)),
        None => PathBuf::from(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseplayer::Config;
    use courseplayer::session::access::LocalFolderAccess;
    use courseplayer::session::playback::FileMediaOpener;
    use courseplayer::store::gateway::DurableStateGateway;
    use courseplayer::store::kv::MemoryKvStore;
    use courseplayer::store::structured::MemoryStructuredStore;
    use std::fs;
    use tempfile::TempDir;

    fn make_app() -> App {
        let gateway = DurableStateGateway::new(
            Box::new(MemoryKvStore::new()),
            Box::new(MemoryStructuredStore::default()),
        );
        let mut session = Session::new(
            Config::default(),
            gateway,
            Box::new(LocalFolderAccess),
            Box::new(FileMediaOpener),
        )
        .unwrap();
        let report = session.bootstrap();
        App::new(session, &report)
    }

    fn course_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Basics")).unwrap();
        fs::write(dir.path().join("Basics/1 Intro.mp4"), b"").unwrap();
        fs::write(dir.path().join("Basics/2 Setup.mp4"), b"").unwrap();
        dir
    }

    #[test]
    fn speed_steps_through_list() {
        assert_eq!(step_speed(1.0, true), 1.25);
        assert_eq!(step_speed(1.0, false), 0.75);
        assert_eq!(step_speed(2.0, true), 2.0);
        assert_eq!(step_speed(0.5, false), 0.5);
        assert_eq!(step_speed(1.1, true), 1.25);
    }

    #[test]
    fn open_and_walk_course() {
        let dir = course_dir();
        let mut app = make_app();
        app.open_folder(dir.path().to_str().unwrap());
        assert_eq!(app.rows.len(), 3);

        app.activate();
        assert_eq!(app.selected, 1);
        app.activate();
        assert_eq!(app.session.current_path(), Some("Basics/1 Intro.mp4"));

        app.mark_ended();
        assert!(app.session.autoplay().is_counting());
        app.activate();
        assert_eq!(app.session.current_path(), Some("Basics/2 Setup.mp4"));
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn open_missing_folder_reports_error() {
        let mut app = make_app();
        app.open_folder("/definitely/not/here");
        assert_eq!(app.message.as_ref().unwrap().kind, MessageKind::Error);
        assert!(app.rows.is_empty());
    }

    #[test]
    fn watch_step_needs_open_lesson() {
        let dir = course_dir();
        let mut app = make_app();
        app.open_folder(dir.path().to_str().unwrap());
        app.watch_step();
        assert_eq!(app.session.watch_stats().total_watch_seconds, 0);

        app.open_lesson("Basics/1 Intro.mp4");
        app.session
            .record_tick("Basics/1 Intro.mp4", 0.0, 100.0)
            .unwrap();
        app.watch_step();
        assert_eq!(app.session.watch_stats().total_watch_seconds, 10);
        assert_eq!(
            app.session
                .progress()
                .get("Basics/1 Intro.mp4")
                .unwrap()
                .current_time,
            10.0
        );
    }

    #[test]
    fn now_playing_follows_open_lesson() {
        let dir = course_dir();
        let mut app = make_app();
        app.open_folder(dir.path().to_str().unwrap());
        assert_eq!(app.now_playing(), None);

        app.open_lesson("Basics/2 Setup.mp4");
        assert_eq!(app.now_playing().as_deref(), Some("> Setup  not started"));

        app.session
            .record_tick("Basics/2 Setup.mp4", 65.0, 130.0)
            .unwrap();
        assert_eq!(app.now_playing().as_deref(), Some("> Setup  1:05 / 2:10"));
    }
}
