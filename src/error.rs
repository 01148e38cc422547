//! Error taxonomy for watching and backing up a file.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to start watching a file. Fatal to a single `arm` call.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("unable to watch {}: {reason}", path.display())]
    Unwatchable { path: PathBuf, reason: String },
}

/// Failure to make the backup directory available for one backup cycle.
#[derive(Debug, Error)]
pub enum BackupDirError {
    #[error("permission denied creating backup directory {}", path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("backup directory {} collides with an existing file", path.display())]
    PathCollision {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to create backup directory {}: {source}", path.display())]
    Other {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BackupDirError {
    pub(crate) fn classify(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        // A file squatting on the directory path, or on one of its parents.
        if (path.exists() && !path.is_dir()) || source.kind() == io::ErrorKind::NotADirectory {
            return Self::PathCollision { path, source };
        }
        match source.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied { path, source }
            }
            _ => Self::Other { path, source },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied { path, .. }
            | Self::PathCollision { path, .. }
            | Self::Other { path, .. } => path,
        }
    }
}

/// Failure to copy the watched file into the backup directory.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("source file {} is locked by another process", source_path.display())]
    SourceLocked {
        source_path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no space left to write {}", destination.display())]
    DiskFull {
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("permission denied copying to {}", destination.display())]
    PermissionDenied {
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to copy {} to {}: {source}", source_path.display(), destination.display())]
    Other {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },
}

// Windows sharing and lock violations.
#[cfg(windows)]
fn is_locked(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(windows))]
fn is_locked(_err: &io::Error) -> bool {
    false
}

impl CopyError {
    pub(crate) fn classify(source_path: &Path, destination: &Path, source: io::Error) -> Self {
        if is_locked(&source) || source.kind() == io::ErrorKind::ResourceBusy {
            return Self::SourceLocked {
                source_path: source_path.to_path_buf(),
                source,
            };
        }
        match source.kind() {
            io::ErrorKind::StorageFull => Self::DiskFull {
                destination: destination.to_path_buf(),
                source,
            },
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied {
                    destination: destination.to_path_buf(),
                    source,
                }
            }
            _ => Self::Other {
                source_path: source_path.to_path_buf(),
                destination: destination.to_path_buf(),
                source,
            },
        }
    }
}
