mod app;
mod cli;
mod event;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use app::{App, MessageKind};
use courseplayer::{Config, Session};
use event::{AppEvent, EventHandler};
use ui::components::course_tree::CourseTree;
use ui::components::lesson_panel::{AutoplayOverlay, LessonPanel};
use ui::components::progress_bar::ProgressBar;
use ui::layout::{AppLayout, pack_hint_lines};

const LOG_FILE: &str = "courseplayer.log";

#[derive(Parser)]
#[command(
    name = "courseplayer",
    version,
    about = "Play a local folder of course videos and PDFs with progress tracking"
)]
struct Cli {
    #[arg(long, help = "Directory for saved progress and course records")]
    data_dir: Option<PathBuf>,

    #[arg(short, long, help = "Theme used in dark mode")]
    theme: Option<String>,

    #[arg(long, help = "Do not advance to the next lesson automatically")]
    no_autoplay: bool,

    #[arg(long, help = "Log filter, e.g. debug or courseplayer=trace")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<cli::Command>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if cli.no_autoplay {
        config.autoplay_enabled = false;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    match cli.command {
        Some(command) => {
            init_tracing(&config, false);
            cli::run(command, config)
        }
        None => {
            init_tracing(&config, true);
            run_tui(config)
        }
    }
}

/// `RUST_LOG` wins over the configured level. The TUI owns the terminal, so
/// in that mode logs go to a file in the data directory.
fn init_tracing(config: &Config, to_file: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let log_file = to_file
        .then(|| {
            let dir = config.data_dir();
            fs::create_dir_all(&dir).ok()?;
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE))
                .ok()
        })
        .flatten();

    let registry = tracing_subscriber::registry().with(filter);
    match log_file {
        Some(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init(),
        // no usable log file: stay silent rather than draw over the UI
        None if to_file => registry.init(),
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
    }
}

fn run_tui(config: Config) -> Result<()> {
    let mut session = Session::open(config)?;
    let report = session.bootstrap();
    let mut app = App::new(session, &report);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &events);
    if !app.should_quit {
        app.quit();
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    if app.path_input.is_some() {
        handle_path_input(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Enter => app.activate(),
        KeyCode::Char(' ') => app.watch_step(),
        KeyCode::Char('e') => app.mark_ended(),
        KeyCode::Char('c') => app.toggle_completed(),
        KeyCode::Char('n') => app.next_lesson(),
        KeyCode::Char('p') => app.previous_lesson(),
        KeyCode::Char('x') | KeyCode::Esc => app.cancel_autoplay(),
        KeyCode::Char('t') => app.toggle_theme(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.change_speed(true),
        KeyCode::Char('-') => app.change_speed(false),
        KeyCode::Char('o') => app.path_input = Some(String::new()),
        KeyCode::Char('r') => app.retry_restore(),
        KeyCode::Char('D') => app.clear_course(),
        _ => {}
    }
}

fn handle_path_input(app: &mut App, key: KeyEvent) {
    let Some(input) = app.path_input.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => app.path_input = None,
        KeyCode::Enter => {
            let path = std::mem::take(input);
            app.path_input = None;
            if !path.trim().is_empty() {
                app.open_folder(&path);
            }
        }
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Char(ch) => input.push(ch),
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    let layout = AppLayout::new(area);

    // header
    let course = app
        .session
        .course_name()
        .map(|name| format!(" {name} "))
        .unwrap_or_else(|| " no course ".to_string());
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " courseplayer ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("|{course}| {}", app.session.state().label()),
            Style::default().fg(colors.muted()).bg(colors.header_bg()),
        ),
    ]))
    .block(Block::bordered().border_style(Style::default().fg(colors.border())))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, layout.header);

    // course tree or prompt
    match app.session.course() {
        Some(course) => {
            let tree = CourseTree::new(
                course,
                &app.rows,
                app.session.progress(),
                app.selected,
                app.session.current_path(),
                &app.theme,
            );
            frame.render_widget(tree, layout.tree);
        }
        None => {
            let prompt = Paragraph::new(vec![
                Line::default(),
                Line::from(Span::styled(
                    "  No course loaded.",
                    Style::default().fg(colors.fg()),
                )),
                Line::from(Span::styled(
                    "  Press o and type the path of a course folder.",
                    Style::default().fg(colors.muted()),
                )),
            ])
            .block(Block::bordered().border_style(Style::default().fg(colors.border())));
            frame.render_widget(prompt, layout.tree);
        }
    }

    if let Some(lesson_area) = layout.lesson {
        frame.render_widget(LessonPanel::new(&app.session, &app.theme), lesson_area);
        if let (Some(remaining), Some(target)) = (
            app.session.autoplay().remaining(),
            app.session.autoplay().target(),
        ) {
            let next_name = app
                .session
                .course()
                .and_then(|c| c.find_lesson(target))
                .map(|l| l.name.as_str())
                .unwrap_or(target);
            frame.render_widget(
                AutoplayOverlay {
                    remaining,
                    next_name,
                    theme: &app.theme,
                },
                lesson_area,
            );
        }
    }

    // overall progress, or the current section's when a lesson is open
    let (label, done, total) = match (app.session.summary(), app.session.current_lesson()) {
        (Some(summary), Some(lesson)) => {
            let section = lesson.section_name();
            match summary.sections.iter().find(|s| s.name == section) {
                Some(s) => (
                    format!("{section}  ·  course {}%", (summary.ratio() * 100.0).round()),
                    s.completed,
                    s.total,
                ),
                None => ("Course".to_string(), summary.completed, summary.total),
            }
        }
        (Some(summary), None) => ("Course".to_string(), summary.completed, summary.total),
        (None, _) => ("Course".to_string(), 0, 0),
    };
    frame.render_widget(
        ProgressBar::new(&label, done, total, &app.theme),
        layout.progress,
    );

    // footer: input prompt, message and key hints
    let width = layout.footer.width as usize;
    let mut lines: Vec<Line> = Vec::new();
    if let Some(input) = &app.path_input {
        lines.push(Line::from(vec![
            Span::styled(" Open folder: ", Style::default().fg(colors.accent())),
            Span::styled(format!("{input}_"), Style::default().fg(colors.fg())),
        ]));
    } else if let Some(message) = &app.message {
        let color = match message.kind {
            MessageKind::Info => colors.success(),
            MessageKind::Error => colors.error(),
        };
        lines.push(Line::from(Span::styled(
            format!(" {}", message.text),
            Style::default().fg(color),
        )));
    } else if let (None, Some(summary)) = (layout.lesson, app.now_playing()) {
        // narrow terminals have no lesson panel
        lines.push(Line::from(Span::styled(
            format!(" {summary}"),
            Style::default().fg(colors.accent()),
        )));
    }
    let hints = [
        "[j/k] Move",
        "[Enter] Open",
        "[e] Ended",
        "[c] Done",
        "[n/p] Next/Prev",
        "[space] +10s",
        "[x] Cancel",
        "[t] Theme",
        "[+/-] Speed",
        "[o] Folder",
        "[q] Quit",
    ];
    if let Some(first) = pack_hint_lines(&hints, width).into_iter().next() {
        lines.push(Line::from(Span::styled(
            first,
            Style::default().fg(colors.muted()),
        )));
    }
    frame.render_widget(Paragraph::new(lines), layout.footer);
}
