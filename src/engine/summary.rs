use crate::course::Course;
use crate::engine::progress::ProgressStore;

#[derive(Clone, Debug, PartialEq)]
pub struct SectionSummary {
    pub name: String,
    pub completed: usize,
    pub total: usize,
}

impl SectionSummary {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Whole-number percentage, as shown next to section bars.
    pub fn percentage(&self) -> u32 {
        (self.ratio() * 100.0).round() as u32
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CourseSummary {
    pub completed: usize,
    pub total: usize,
    pub sections: Vec<SectionSummary>,
}

impl CourseSummary {
    pub fn build(course: &Course, progress: &ProgressStore) -> Self {
        let sections: Vec<SectionSummary> = course
            .sections
            .iter()
            .map(|section| SectionSummary {
                name: section.name.clone(),
                completed: section
                    .lessons
                    .iter()
                    .filter(|l| progress.is_completed(&l.path))
                    .count(),
                total: section.lessons.len(),
            })
            .collect();
        Self {
            completed: sections.iter().map(|s| s.completed).sum(),
            total: sections.iter().map(|s| s.total).sum(),
            sections,
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Lesson, LessonKind, Section, SourceRef};

    #[test]
    fn counts_completed_per_section() {
        let course = Course {
            name: "C".to_string(),
            sections: vec![
                Section {
                    name: "A".to_string(),
                    lessons: vec![
                        Lesson::new("A", "1.mp4", LessonKind::Video, SourceRef::new("1.mp4")),
                        Lesson::new("A", "2.pdf", LessonKind::Pdf, SourceRef::new("2.pdf")),
                        Lesson::new("A", "3.mp4", LessonKind::Video, SourceRef::new("3.mp4")),
                    ],
                },
                Section {
                    name: "B".to_string(),
                    lessons: vec![],
                },
            ],
        };
        let mut progress = ProgressStore::default();
        progress.record_ended("A/1.mp4");
        progress.record_tick("A/2.pdf", 10.0, 100.0);
        progress.record_ended("Elsewhere/x.mp4");

        let summary = CourseSummary::build(&course, &progress);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.sections[0].percentage(), 33);
        assert_eq!(summary.sections[1].ratio(), 0.0);
    }
}
