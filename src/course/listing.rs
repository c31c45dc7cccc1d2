use crate::course::SourceRef;

/// One entry of an enumerated folder. Directories below the section level
/// are listed with no children; the tree only looks two levels deep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    Directory { name: String, entries: Vec<Entry> },
    File { name: String, source: SourceRef },
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Directory { name, .. } | Entry::File { name, .. } => name,
        }
    }
}

/// Enumeration of a granted root folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderListing {
    pub name: String,
    pub entries: Vec<Entry>,
}

/// A file picked as part of a whole-folder selection, with its path relative
/// to the picked folder's parent (`"MyCourse/Basics/1 Intro.mp4"`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelativeFile {
    pub relative_path: String,
    pub source: SourceRef,
}

impl RelativeFile {
    pub fn new(relative_path: impl Into<String>, source: SourceRef) -> Self {
        Self {
            relative_path: relative_path.into(),
            source,
        }
    }
}
