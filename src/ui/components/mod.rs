pub mod course_tree;
pub mod lesson_panel;
pub mod progress_bar;
