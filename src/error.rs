//! Error taxonomy for the player core.
//!
//! Only [`UnsupportedEnvironmentError`] is fatal. Everything else is caught
//! where it happens and turned into a message plus a safe fallback state.

use std::io;
use std::path::PathBuf;

/// The granted folder could not be enumerated (I/O failure, device removed).
/// The grant itself is kept so the user can retry.
#[derive(Debug, thiserror::Error)]
pub enum TreeBuildError {
    #[error("failed to read course folder {path}: {source}")]
    Enumerate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no course folder has been granted")]
    NoGrant,
}

/// A folder access grant exists but cannot be used. Treated as course loss.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("course folder {0} no longer exists")]
    Missing(PathBuf),
    #[error("{0} is not a folder")]
    NotADirectory(PathBuf),
    #[error("read permission for {0} was denied")]
    Denied(PathBuf),
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single lesson's file could not be opened. Local to that lesson.
#[derive(Debug, thiserror::Error)]
pub enum MediaLoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Any storage read or write failure. Never reaches playback logic; the
/// gateway logs it and falls back.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("stored data is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown store partition {0:?}")]
    UnknownPartition(String),
    #[error("store is at version {found}, newer than supported version {supported}")]
    VersionTooNew { found: u32, supported: u32 },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A required platform capability is missing. Blocks start-up entirely.
#[derive(Debug, thiserror::Error)]
pub enum UnsupportedEnvironmentError {
    #[error("no writable data directory is available for saving progress")]
    NoDataDirectory,
    #[error("this platform cannot read local course folders: {0}")]
    NoFolderAccess(String),
}

/// Failures a caller of an interactive session operation can see.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    TreeBuild(#[from] TreeBuildError),
    #[error(transparent)]
    Media(#[from] MediaLoadError),
    #[error("no course is loaded")]
    NoCourse,
    #[error("lesson {0} is not part of the loaded course")]
    UnknownLesson(String),
    #[error("the selected files contain no course lessons")]
    EmptySelection,
}
