pub mod builder;
pub mod listing;
pub mod model;
pub mod natural;
pub mod path_key;

pub use model::{Course, Lesson, LessonKind, Section, SourceRef};
