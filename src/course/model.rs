use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::course::path_key;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov", "avi", "mkv"];
pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    Video,
    Pdf,
}

impl LessonKind {
    /// Extension-based classification. `None` means the file is not a lesson.
    pub fn classify(file_name: &str) -> Option<Self> {
        let ext = path_key::extension(file_name)?;
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(LessonKind::Video)
        } else if PDF_EXTENSIONS.contains(&ext.as_str()) {
            Some(LessonKind::Pdf)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LessonKind::Video => "video",
            LessonKind::Pdf => "pdf",
        }
    }
}

/// Where a lesson's bytes live. Only valid for the session that built the
/// tree; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRef(PathBuf);

impl SourceRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lesson {
    pub name: String,
    pub kind: LessonKind,
    pub path: String,
    pub source: SourceRef,
}

impl Lesson {
    pub fn new(section: &str, file_name: &str, kind: LessonKind, source: SourceRef) -> Self {
        Self {
            name: path_key::display_name(file_name),
            kind,
            path: path_key::path_key(section, file_name),
            source,
        }
    }

    pub fn section_name(&self) -> &str {
        path_key::section_of(&self.path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Course {
    pub name: String,
    pub sections: Vec<Section>,
}

impl Course {
    pub fn lesson_count(&self) -> usize {
        self.sections.iter().map(|s| s.lessons.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lesson_count() == 0
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.sections.iter().flat_map(|s| s.lessons.iter())
    }

    pub fn find_lesson(&self, path: &str) -> Option<&Lesson> {
        self.lessons().find(|l| l.path == path)
    }

    pub fn section_for(&self, path: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.lessons.iter().any(|l| l.path == path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.find_lesson(path).is_some()
    }
}
