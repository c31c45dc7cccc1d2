use std::collections::BTreeMap;

use tracing::debug;

use crate::course::listing::{Entry, FolderListing, RelativeFile};
use crate::course::natural::natural_cmp;
use crate::course::{Course, Lesson, LessonKind, Section, SourceRef};
use crate::error::TreeBuildError;
use crate::session::access::FolderAccess;
use crate::store::schema::FolderGrant;

pub const DEFAULT_COURSE_NAME: &str = "My Course";

/// Enumerate the granted folder and build its course tree. Fails as a whole;
/// a partially read folder never produces a tree.
pub fn build_from_grant(
    access: &dyn FolderAccess,
    grant: &FolderGrant,
) -> Result<Course, TreeBuildError> {
    let listing = access.list(grant)?;
    Ok(build_course(&listing))
}

/// Direct child directories become sections; files in the root and
/// unsupported files inside sections are skipped.
pub fn build_course(listing: &FolderListing) -> Course {
    let mut sections = Vec::new();
    for entry in &listing.entries {
        let Entry::Directory { name, entries } = entry else {
            continue;
        };
        let files = entries.iter().filter_map(|child| match child {
            Entry::File { name, source } => Some((name.as_str(), source.clone())),
            Entry::Directory { .. } => None,
        });
        sections.push(build_section(name, files));
    }
    finish_course(listing.name.clone(), sections)
}

/// Build a course from a flat whole-folder file selection. The first path
/// component is the course, the second the section; only files sitting
/// directly inside a section folder of the first file's course count.
/// Returns `None` for an empty selection.
pub fn build_course_from_files(files: &[RelativeFile]) -> Option<Course> {
    let first = files.first()?;
    let root = first.relative_path.split('/').next().unwrap_or_default();
    let course_name = if root.is_empty() {
        DEFAULT_COURSE_NAME.to_string()
    } else {
        root.to_string()
    };

    let mut grouped: BTreeMap<&str, Vec<(&str, SourceRef)>> = BTreeMap::new();
    for file in files {
        let parts: Vec<&str> = file.relative_path.split('/').collect();
        if parts.len() != 3 {
            debug!(path = %file.relative_path, "skipping file outside a section folder");
            continue;
        }
        if parts[0] != root {
            debug!(path = %file.relative_path, course = %course_name, "skipping file from another course folder");
            continue;
        }
        // Sections are created even when none of their files qualify, like a
        // directory listing would.
        let bucket = grouped.entry(parts[1]).or_default();
        bucket.push((parts[2], file.source.clone()));
    }

    let sections = grouped
        .into_iter()
        .map(|(name, files)| build_section(name, files.into_iter()))
        .collect();
    Some(finish_course(course_name, sections))
}

fn build_section<'a>(name: &str, files: impl Iterator<Item = (&'a str, SourceRef)>) -> Section {
    let mut lessons: Vec<Lesson> = files
        .filter_map(|(file_name, source)| {
            let kind = LessonKind::classify(file_name)?;
            Some(Lesson::new(name, file_name, kind, source))
        })
        .collect();
    lessons.sort_by(|a, b| natural_cmp(&a.path, &b.path));
    Section {
        name: name.to_string(),
        lessons,
    }
}

fn finish_course(name: String, mut sections: Vec<Section>) -> Course {
    sections.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    Course { name, sections }
}
