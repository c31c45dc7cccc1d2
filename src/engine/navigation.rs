//! Linear lesson order across section boundaries.
//!
//! Everything works on the flattened sequence (sections in order, lessons in
//! order within each), so empty sections simply contribute nothing.

use crate::course::{Course, Lesson};

pub fn flatten(course: &Course) -> Vec<&Lesson> {
    course.lessons().collect()
}

/// Position of `path` in flattened order, `None` for keys that are not part
/// of this tree (stale state from a differently shaped folder).
pub fn index_of(course: &Course, path: &str) -> Option<usize> {
    course.lessons().position(|l| l.path == path)
}

pub fn next<'a>(course: &'a Course, path: &str) -> Option<&'a Lesson> {
    let idx = index_of(course, path)?;
    course.lessons().nth(idx + 1)
}

pub fn previous<'a>(course: &'a Course, path: &str) -> Option<&'a Lesson> {
    let idx = index_of(course, path)?;
    idx.checked_sub(1).and_then(|i| course.lessons().nth(i))
}

/// True when there is no lesson after `path`, including when `path` is not
/// in the tree at all.
pub fn is_last(course: &Course, path: &str) -> bool {
    next(course, path).is_none()
}

pub fn first(course: &Course) -> Option<&Lesson> {
    course.lessons().next()
}
