use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};

use courseplayer::Session;
use courseplayer::engine::progress::LessonStatus;
use courseplayer::engine::watch_stats::{format_duration, format_time};

use crate::ui::layout::centered_box;
use crate::ui::theme::Theme;

/// Details of the current lesson, player preferences and watch time.
pub struct LessonPanel<'a> {
    session: &'a Session,
    theme: &'a Theme,
}

impl<'a> LessonPanel<'a> {
    pub fn new(session: &'a Session, theme: &'a Theme) -> Self {
        Self { session, theme }
    }

    fn lesson_lines(&self) -> Vec<Line<'a>> {
        let colors = &self.theme.colors;
        let label = Style::default().fg(colors.muted());
        let value = Style::default().fg(colors.fg());

        let Some(lesson) = self.session.current_lesson() else {
            return vec![Line::from(Span::styled(
                "No lesson open. Select one and press Enter.",
                label,
            ))];
        };

        let mut lines = vec![
            Line::from(Span::styled(
                lesson.name.clone(),
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled("Section   ", label),
                Span::styled(lesson.section_name().to_string(), value),
            ]),
            Line::from(vec![
                Span::styled("Type      ", label),
                Span::styled(lesson.kind.as_str(), value),
            ]),
        ];

        let (status_text, status_color) = match self.session.lesson_status(&lesson.path) {
            LessonStatus::Completed => ("completed", colors.completed()),
            LessonStatus::InProgress => ("in progress", colors.in_progress()),
            LessonStatus::NotStarted => ("not started", colors.not_started()),
        };
        lines.push(Line::from(vec![
            Span::styled("Status    ", label),
            Span::styled(status_text, Style::default().fg(status_color)),
        ]));

        if let Some(record) = self.session.progress().get(&lesson.path) {
            let position = if record.duration > 0.0 {
                format!(
                    "{} / {}  ({:.0}%)",
                    format_time(record.current_time),
                    format_time(record.duration),
                    record.percentage
                )
            } else {
                format_time(record.current_time)
            };
            lines.push(Line::from(vec![
                Span::styled("Position  ", label),
                Span::styled(position, value),
            ]));
        }

        let file = match self.session.media_location() {
            Some(path) => Span::styled(path.display().to_string(), value),
            None => Span::styled("not opened", Style::default().fg(colors.error())),
        };
        lines.push(Line::from(vec![Span::styled("File      ", label), file]));
        lines
    }

    fn footer_lines(&self) -> Vec<Line<'a>> {
        let colors = &self.theme.colors;
        let label = Style::default().fg(colors.muted());
        let value = Style::default().fg(colors.fg());
        let settings = self.session.settings();
        let stats = self.session.watch_stats();

        let mut lines = vec![
            Line::default(),
            Line::from(vec![
                Span::styled("Speed ", label),
                Span::styled(format!("{}x", settings.playback_speed), value),
                Span::styled("   Volume ", label),
                Span::styled(format!("{:.0}%", settings.volume * 100.0), value),
                Span::styled("   Theme ", label),
                Span::styled(settings.theme.as_str(), value),
            ]),
        ];
        if self.session.config().track_watch_stats {
            let mut watched = vec![
                Span::styled("Today ", label),
                Span::styled(format_duration(stats.today_seconds()), value),
                Span::styled("   Total ", label),
                Span::styled(format_duration(stats.total_watch_seconds), value),
            ];
            if let Some((section, _)) = stats.most_watched_section() {
                watched.push(Span::styled("   Most watched ", label));
                watched.push(Span::styled(section.to_string(), value));
            }
            lines.push(Line::from(watched));
        }
        lines
    }
}

impl Widget for LessonPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Lesson ")
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines = self.lesson_lines();
        lines.extend(self.footer_lines());
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

/// "Next lesson in N s" box drawn over the lesson panel.
pub struct AutoplayOverlay<'a> {
    pub remaining: u32,
    pub next_name: &'a str,
    pub theme: &'a Theme,
}

impl Widget for AutoplayOverlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let popup = centered_box(44, 5, area);
        Clear.render(popup, buf);

        let block = Block::bordered()
            .title(" Up next ")
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.header_bg()));
        let inner = block.inner(popup);
        block.render(popup, buf);

        let lines = vec![
            Line::from(Span::styled(
                format!("{} in {}s", self.next_name, self.remaining),
                Style::default().fg(colors.header_fg()),
            )),
            Line::from(Span::styled(
                "[Enter] Play now  [x] Cancel",
                Style::default().fg(colors.muted()),
            )),
        ];
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(inner, buf);
    }
}
