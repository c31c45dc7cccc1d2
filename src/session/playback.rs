//! The currently opened lesson file.
//!
//! Exactly one media resource is held at a time. Loading a lesson releases the
//! previous resource before the new one is opened, so switching lessons many
//! times never accumulates open files.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::course::Lesson;
use crate::error::MediaLoadError;

/// An opened lesson file. Dropping it releases the underlying resource.
pub trait MediaResource {
    fn location(&self) -> &Path;
}

pub trait MediaOpener {
    fn open(&self, lesson: &Lesson) -> Result<Box<dyn MediaResource>, MediaLoadError>;
}

struct OpenedFile {
    path: PathBuf,
    _file: File,
}

impl MediaResource for OpenedFile {
    fn location(&self) -> &Path {
        &self.path
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FileMediaOpener;

impl MediaOpener for FileMediaOpener {
    fn open(&self, lesson: &Lesson) -> Result<Box<dyn MediaResource>, MediaLoadError> {
        let path = lesson.source.as_path().to_path_buf();
        let file = File::open(&path).map_err(|source| MediaLoadError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Box::new(OpenedFile { path, _file: file }))
    }
}

pub struct PlaybackSession {
    opener: Box<dyn MediaOpener>,
    current: Option<(String, Box<dyn MediaResource>)>,
}

impl PlaybackSession {
    pub fn new(opener: Box<dyn MediaOpener>) -> Self {
        Self {
            opener,
            current: None,
        }
    }

    /// Release whatever is loaded, then open `lesson`. On failure nothing is
    /// loaded afterwards.
    pub fn load(&mut self, lesson: &Lesson) -> Result<(), MediaLoadError> {
        self.release();
        match self.opener.open(lesson) {
            Ok(resource) => {
                debug!(lesson = %lesson.path, location = %resource.location().display(), "media opened");
                self.current = Some((lesson.path.clone(), resource));
                Ok(())
            }
            Err(e) => {
                warn!(lesson = %lesson.path, error = %e, "media failed to open");
                Err(e)
            }
        }
    }

    pub fn release(&mut self) {
        if let Some((path, resource)) = self.current.take() {
            debug!(lesson = %path, "media released");
            drop(resource);
        }
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current.as_ref().map(|(path, _)| path.as_str())
    }

    pub fn current_location(&self) -> Option<&Path> {
        self.current.as_ref().map(|(_, resource)| resource.location())
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new(Box::new(FileMediaOpener))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{LessonKind, SourceRef};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counted {
        path: PathBuf,
        live: Rc<Cell<i32>>,
    }

    impl MediaResource for Counted {
        fn location(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    struct CountingOpener {
        live: Rc<Cell<i32>>,
    }

    impl MediaOpener for CountingOpener {
        fn open(&self, lesson: &Lesson) -> Result<Box<dyn MediaResource>, MediaLoadError> {
            if lesson.path.contains("broken") {
                return Err(MediaLoadError::Open {
                    path: lesson.source.as_path().to_path_buf(),
                    source: std::io::Error::other("unreadable"),
                });
            }
            self.live.set(self.live.get() + 1);
            Ok(Box::new(Counted {
                path: lesson.source.as_path().to_path_buf(),
                live: Rc::clone(&self.live),
            }))
        }
    }

    fn lesson(file: &str) -> Lesson {
        Lesson::new("Basics", file, LessonKind::Video, SourceRef::new(file))
    }

    #[test]
    fn switching_lessons_keeps_one_resource_open() {
        let live = Rc::new(Cell::new(0));
        let mut playback = PlaybackSession::new(Box::new(CountingOpener {
            live: Rc::clone(&live),
        }));

        for i in 0..50 {
            playback.load(&lesson(&format!("{i} Part.mp4"))).unwrap();
            assert_eq!(live.get(), 1);
        }
        assert_eq!(playback.current_path(), Some("Basics/49 Part.mp4"));

        playback.release();
        assert_eq!(live.get(), 0);
        assert!(!playback.is_loaded());
    }

    #[test]
    fn failed_load_leaves_nothing_loaded() {
        let live = Rc::new(Cell::new(0));
        let mut playback = PlaybackSession::new(Box::new(CountingOpener {
            live: Rc::clone(&live),
        }));
        playback.load(&lesson("1 Intro.mp4")).unwrap();
        assert!(playback.load(&lesson("broken.mp4")).is_err());
        assert_eq!(live.get(), 0);
        assert_eq!(playback.current_path(), None);
    }

    #[test]
    fn missing_file_is_a_media_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("gone.mp4");
        let lesson = Lesson::new(
            "Basics",
            "gone.mp4",
            LessonKind::Video,
            SourceRef::new(&missing),
        );
        let mut playback = PlaybackSession::default();
        assert!(matches!(
            playback.load(&lesson),
            Err(MediaLoadError::Open { .. })
        ));
    }
}
