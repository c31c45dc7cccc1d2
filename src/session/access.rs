//! Folder access: turning a picked folder into a durable grant, re-checking
//! the grant later, and enumerating what it covers.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::course::SourceRef;
use crate::course::listing::{Entry, FolderListing};
use crate::error::{AccessError, TreeBuildError, UnsupportedEnvironmentError};
use crate::store::schema::FolderGrant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

pub trait FolderAccess {
    /// Fails when this platform cannot offer durable folder access at all.
    fn check_environment(&self) -> Result<(), UnsupportedEnvironmentError>;

    /// The user picked `root`: produce a grant for it.
    fn grant(&self, root: &Path) -> Result<FolderGrant, AccessError>;

    /// Re-validate a stored grant. `Err` means the grant itself is unusable
    /// and is cleared like a denial.
    fn request_permission(&self, grant: &FolderGrant) -> Result<Permission, AccessError>;

    /// Enumerate the root and each of its direct child directories.
    fn list(&self, grant: &FolderGrant) -> Result<FolderListing, TreeBuildError>;
}

/// Access to folders on the local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFolderAccess;

impl FolderAccess for LocalFolderAccess {
    fn check_environment(&self) -> Result<(), UnsupportedEnvironmentError> {
        let dir = env::temp_dir();
        fs::read_dir(&dir).map(drop).map_err(|e| {
            UnsupportedEnvironmentError::NoFolderAccess(format!(
                "cannot enumerate {}: {e}",
                dir.display()
            ))
        })
    }

    fn grant(&self, root: &Path) -> Result<FolderGrant, AccessError> {
        let root = fs::canonicalize(root).map_err(|source| match source.kind() {
            ErrorKind::NotFound => AccessError::Missing(root.to_path_buf()),
            _ => AccessError::Io {
                path: root.to_path_buf(),
                source,
            },
        })?;
        if !root.is_dir() {
            return Err(AccessError::NotADirectory(root));
        }
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.to_string_lossy().into_owned());
        Ok(FolderGrant { name, root })
    }

    /// Only an explicit permission refusal counts as `Denied`. A vanished
    /// root or any other I/O failure stays `Granted`: `list` then reports it
    /// as a tree build error and the grant survives for a retry.
    fn request_permission(&self, grant: &FolderGrant) -> Result<Permission, AccessError> {
        match fs::read_dir(&grant.root) {
            Ok(_) => Ok(Permission::Granted),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Ok(Permission::Denied),
            Err(e) => {
                debug!(root = %grant.root.display(), error = %e, "course folder not readable right now");
                Ok(Permission::Granted)
            }
        }
    }

    fn list(&self, grant: &FolderGrant) -> Result<FolderListing, TreeBuildError> {
        let mut entries = Vec::new();
        for (name, path, is_dir) in read_entries(&grant.root)? {
            if is_dir {
                let children = read_entries(&path)?
                    .into_iter()
                    .map(|(name, path, is_dir)| {
                        if is_dir {
                            Entry::Directory {
                                name,
                                entries: Vec::new(),
                            }
                        } else {
                            Entry::File {
                                name,
                                source: SourceRef::new(path),
                            }
                        }
                    })
                    .collect();
                entries.push(Entry::Directory {
                    name,
                    entries: children,
                });
            } else {
                entries.push(Entry::File {
                    name,
                    source: SourceRef::new(path),
                });
            }
        }
        debug!(root = %grant.root.display(), entries = entries.len(), "folder enumerated");
        Ok(FolderListing {
            name: grant.name.clone(),
            entries,
        })
    }
}

fn read_entries(dir: &Path) -> Result<Vec<(String, std::path::PathBuf, bool)>, TreeBuildError> {
    let enumerate = |source| TreeBuildError::Enumerate {
        path: dir.to_path_buf(),
        source,
    };
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(enumerate)? {
        let entry = entry.map_err(enumerate)?;
        // follows symlinks, so a linked section folder still counts
        let is_dir = entry.path().is_dir();
        out.push((
            entry.file_name().to_string_lossy().into_owned(),
            entry.path(),
            is_dir,
        ));
    }
    Ok(out)
}

/// Check that `dir` can hold saved state: create and remove a scratch file,
/// then enumerate the directory.
pub fn probe_data_dir(dir: &Path) -> Result<(), UnsupportedEnvironmentError> {
    let scratch = dir.join(".courseplayer-probe");
    let result = fs::write(&scratch, b"")
        .and_then(|()| fs::remove_file(&scratch))
        .and_then(|()| fs::read_dir(dir).map(drop));
    result.map_err(|e| {
        warn!(dir = %dir.display(), error = %e, "data directory is not usable");
        UnsupportedEnvironmentError::NoDataDirectory
    })
}
