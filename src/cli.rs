use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Subcommand;

use courseplayer::config::Config;
use courseplayer::course::Course;
use courseplayer::course::builder::build_from_grant;
use courseplayer::engine::progress::{LessonStatus, ProgressChange};
use courseplayer::engine::watch_stats::{format_duration, format_time};
use courseplayer::session::access::{FolderAccess, LocalFolderAccess};
use courseplayer::store::gateway::ResetOutcome;
use courseplayer::store::schema::ThemeMode;
use courseplayer::{BootstrapReport, Session, SessionState};

use crate::ui::components::course_tree::status_glyph;

#[derive(Subcommand)]
pub enum Command {
    /// Print the course tree a folder would produce, without saving anything
    Scan { dir: PathBuf },
    /// Make a folder the current course
    Open { dir: PathBuf },
    /// Show the current course and lesson progress
    Status,
    /// Forget the current course folder (progress is kept)
    Clear,
    /// Delete progress records for every lesson of the current course
    Forget,
    /// Destroy and recreate the course database
    ResetDb,
    /// Record a playback position for a lesson
    Tick {
        path: String,
        time: f64,
        duration: f64,
        /// Seconds of viewing to add to watch statistics
        #[arg(long, default_value_t = 0)]
        watched: u64,
    },
    /// Mark a lesson as played to the end
    Ended { path: String },
    /// Flip a lesson's completed flag
    Toggle { path: String },
    /// Show or change player settings
    Settings {
        #[arg(long)]
        speed: Option<f64>,
        #[arg(long)]
        volume: Option<f64>,
        #[arg(long, help = "dark or light")]
        theme: Option<String>,
        #[arg(long)]
        mini_player: Option<bool>,
        #[arg(long)]
        pip: Option<bool>,
    },
    /// Show watch time statistics
    Stats,
    /// Write the default configuration file
    InitConfig,
}

pub fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Scan { dir } => scan(&dir),
        Command::InitConfig => {
            config.save()?;
            println!("wrote {}", Config::config_path().display());
            Ok(())
        }
        command => {
            let mut session = Session::open(config)?;
            let report = session.bootstrap();
            print_bootstrap_problems(&report);
            let result = run_with_session(command, &mut session);
            session.shutdown();
            result
        }
    }
}

fn run_with_session(command: Command, session: &mut Session) -> Result<()> {
    match command {
        Command::Open { dir } => {
            let course = session
                .open_folder(&dir)
                .with_context(|| format!("cannot open {}", dir.display()))?;
            println!(
                "opened {}: {} lessons in {} sections",
                course.name,
                course.lesson_count(),
                course.sections.len()
            );
        }
        Command::Status => print_status(session),
        Command::Clear => {
            if !session.clear_course() {
                eprintln!("warning: stored course records could not be deleted");
            }
            println!("course cleared");
        }
        Command::Forget => {
            require_course(session)?;
            let removed = session.forget_course_progress();
            println!("removed {removed} progress records");
        }
        Command::ResetDb => match session.reset_database() {
            ResetOutcome::Reinitialized => println!("course database recreated"),
            ResetOutcome::Failed => bail!("course database could not be reset"),
        },
        Command::Tick {
            path,
            time,
            duration,
            watched,
        } => {
            require_course(session)?;
            let change = session.record_tick(&path, time, duration)?;
            if watched > 0 {
                session.select_lesson(&path)?;
                session.record_watch_seconds(watched);
            }
            let record = session.progress().get(&path).cloned().unwrap_or_default();
            println!(
                "{path}: {} / {} ({:.0}%){}",
                format_time(record.current_time),
                format_time(record.duration),
                record.percentage,
                if change == ProgressChange::NewlyCompleted {
                    " - completed"
                } else {
                    ""
                }
            );
        }
        Command::Ended { path } => {
            require_course(session)?;
            session.record_ended(&path)?;
            match session.autoplay().target() {
                Some(next) => println!("{path}: completed, next up {next}"),
                None => println!("{path}: completed"),
            }
        }
        Command::Toggle { path } => {
            require_course(session)?;
            let completed = session.toggle_completed(&path)?;
            println!(
                "{path}: {}",
                if completed { "completed" } else { "not completed" }
            );
        }
        Command::Settings {
            speed,
            volume,
            theme,
            mini_player,
            pip,
        } => {
            if let Some(speed) = speed {
                if !session.set_playback_speed(speed) {
                    bail!("playback speed must be a positive number");
                }
            }
            if let Some(volume) = volume {
                session.set_volume(volume);
            }
            if let Some(theme) = theme {
                let mode = ThemeMode::from_name(&theme)
                    .with_context(|| format!("unknown theme mode {theme:?}"))?;
                session.set_theme(mode);
            }
            if let Some(enabled) = mini_player {
                session.set_mini_player(enabled);
            }
            if let Some(enabled) = pip {
                session.set_pip(enabled);
            }
            let settings = session.settings();
            println!("speed        {}x", settings.playback_speed);
            println!("volume       {:.0}%", settings.volume * 100.0);
            println!("theme        {}", settings.theme.as_str());
            println!("mini player  {}", settings.mini_player_enabled);
            println!("pip          {}", settings.pip_enabled);
        }
        Command::Stats => {
            let stats = session.watch_stats();
            println!("today         {}", format_duration(stats.today_seconds()));
            println!("total         {}", format_duration(stats.total_watch_seconds));
            match stats.most_watched_section() {
                Some((section, secs)) => {
                    println!("most watched  {section} ({})", format_duration(secs))
                }
                None => println!("most watched  -"),
            }
            for (day, secs) in stats.daily_watch_seconds.iter().rev().take(7) {
                println!("  {day}  {}", format_duration(*secs));
            }
        }
        Command::Scan { .. } | Command::InitConfig => {}
    }
    Ok(())
}

fn require_course(session: &Session) -> Result<()> {
    if session.state() != SessionState::CourseLoaded {
        bail!("no course is loaded; run `courseplayer open <dir>` first");
    }
    Ok(())
}

fn print_bootstrap_problems(report: &BootstrapReport) {
    if report.permission_lost {
        eprintln!("warning: access to the stored course folder was lost; it has been cleared");
    }
    if let Some(e) = &report.tree_error {
        eprintln!("warning: {e}");
    }
}

fn scan(dir: &std::path::Path) -> Result<()> {
    let access = LocalFolderAccess;
    let grant = access.grant(dir)?;
    let course = build_from_grant(&access, &grant)?;
    print_tree(&course, |_| None);
    Ok(())
}

fn print_status(session: &Session) {
    let Some(course) = session.course() else {
        match session.course_info() {
            Some(info) => println!("no course loaded (last course: {})", info.name),
            None => println!("no course loaded"),
        }
        return;
    };
    if let Some(summary) = session.summary() {
        println!(
            "{}: {}/{} lessons completed ({:.0}%)",
            course.name,
            summary.completed,
            summary.total,
            summary.ratio() * 100.0
        );
    }
    print_tree(course, |path| Some(session.lesson_status(path)));
}

fn print_tree(course: &Course, status: impl Fn(&str) -> Option<LessonStatus>) {
    for section in &course.sections {
        println!("{}", section.name);
        for lesson in &section.lessons {
            let glyph = status(&lesson.path).map(status_glyph).unwrap_or("-");
            println!(
                "  {glyph} [{}] {}  ({})",
                lesson.kind.as_str(),
                lesson.name,
                lesson.path
            );
        }
    }
}
