use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use courseplayer::course::{Course, LessonKind};
use courseplayer::engine::progress::{LessonStatus, ProgressStore};

use crate::ui::theme::Theme;

/// One selectable line of the sidebar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeRow {
    Section(usize),
    Lesson(String),
}

pub fn tree_rows(course: &Course) -> Vec<TreeRow> {
    let mut rows = Vec::with_capacity(course.sections.len() + course.lesson_count());
    for (i, section) in course.sections.iter().enumerate() {
        rows.push(TreeRow::Section(i));
        rows.extend(
            section
                .lessons
                .iter()
                .map(|lesson| TreeRow::Lesson(lesson.path.clone())),
        );
    }
    rows
}

pub fn status_glyph(status: LessonStatus) -> &'static str {
    match status {
        LessonStatus::Completed => "✓",
        LessonStatus::InProgress => "◐",
        LessonStatus::NotStarted => "○",
    }
}

pub struct CourseTree<'a> {
    course: &'a Course,
    rows: &'a [TreeRow],
    progress: &'a ProgressStore,
    selected: usize,
    current: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> CourseTree<'a> {
    pub fn new(
        course: &'a Course,
        rows: &'a [TreeRow],
        progress: &'a ProgressStore,
        selected: usize,
        current: Option<&'a str>,
        theme: &'a Theme,
    ) -> Self {
        Self {
            course,
            rows,
            progress,
            selected,
            current,
            theme,
        }
    }

    fn row_line(&self, row: &TreeRow) -> Line<'a> {
        let colors = &self.theme.colors;
        match row {
            TreeRow::Section(i) => {
                let section = &self.course.sections[*i];
                let done = section
                    .lessons
                    .iter()
                    .filter(|l| self.progress.is_completed(&l.path))
                    .count();
                Line::from(vec![
                    Span::styled(
                        section.name.clone(),
                        Style::default()
                            .fg(colors.accent())
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {done}/{}", section.lessons.len()),
                        Style::default().fg(colors.muted()),
                    ),
                ])
            }
            TreeRow::Lesson(path) => {
                let Some(lesson) = self.course.find_lesson(path) else {
                    return Line::default();
                };
                let status = self.progress.status(path);
                let glyph_color = match status {
                    LessonStatus::Completed => colors.completed(),
                    LessonStatus::InProgress => colors.in_progress(),
                    LessonStatus::NotStarted => colors.not_started(),
                };
                let kind = match lesson.kind {
                    LessonKind::Video => "▶",
                    LessonKind::Pdf => "▤",
                };
                let mut name_style = Style::default().fg(colors.fg());
                if self.current == Some(path.as_str()) {
                    name_style = name_style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                }
                Line::from(vec![
                    Span::raw("  "),
                    Span::styled(status_glyph(status), Style::default().fg(glyph_color)),
                    Span::styled(format!(" {kind} "), Style::default().fg(colors.muted())),
                    Span::styled(lesson.name.clone(), name_style),
                ])
            }
        }
    }
}

impl Widget for CourseTree<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(" {} ", self.course.name))
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let height = inner.height as usize;
        if height == 0 {
            return;
        }

        // keep the selection on screen
        let offset = self.selected.saturating_sub(height.saturating_sub(1));
        let lines: Vec<Line> = self
            .rows
            .iter()
            .enumerate()
            .skip(offset)
            .take(height)
            .map(|(i, row)| {
                let line = self.row_line(row);
                if i == self.selected {
                    line.style(Style::default().bg(colors.selection_bg()))
                } else {
                    line
                }
            })
            .collect();

        Paragraph::new(lines).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courseplayer::course::builder::build_course;
    use courseplayer::course::listing::{Entry, FolderListing};
    use courseplayer::course::SourceRef;

    fn course() -> Course {
        let file = |name: &str| Entry::File {
            name: name.to_string(),
            source: SourceRef::new(name),
        };
        build_course(&FolderListing {
            name: "MyCourse".to_string(),
            entries: vec![
                Entry::Directory {
                    name: "Basics".to_string(),
                    entries: vec![file("1 Intro.mp4"), file("2 Setup.pdf")],
                },
                Entry::Directory {
                    name: "Advanced".to_string(),
                    entries: vec![file("1 Deep.mp4")],
                },
            ],
        })
    }

    #[test]
    fn rows_interleave_sections_and_lessons() {
        let rows = tree_rows(&course());
        assert_eq!(
            rows,
            vec![
                TreeRow::Section(0),
                TreeRow::Lesson("Advanced/1 Deep.mp4".to_string()),
                TreeRow::Section(1),
                TreeRow::Lesson("Basics/1 Intro.mp4".to_string()),
                TreeRow::Lesson("Basics/2 Setup.pdf".to_string()),
            ]
        );
    }

    #[test]
    fn renders_status_glyphs() {
        let course = course();
        let rows = tree_rows(&course);
        let mut progress = ProgressStore::default();
        progress.record_ended("Basics/1 Intro.mp4");
        let theme = Theme::default();

        let area = Rect::new(0, 0, 40, 8);
        let mut buf = Buffer::empty(area);
        CourseTree::new(&course, &rows, &progress, 0, None, &theme).render(area, &mut buf);

        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|(x, y)| buf[(x, y)].symbol().to_string())
            .collect();
        assert!(text.contains("✓"));
        assert!(text.contains("Intro"));
        assert!(text.contains("1/2"));
    }
}
