use crate::error::BackupDirError;
use std::fs;
use std::io;
use std::path::Path;

/// What `ensure_exists` had to do to make the directory available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirStatus {
    Existing,
    Created,
}

/// Makes sure `path` is a directory, creating it and any missing parents.
///
/// Creation is attempted directly instead of checking first, so concurrent
/// callers racing on the same path all succeed.
pub fn ensure_exists(path: &Path) -> Result<DirStatus, BackupDirError> {
    match fs::create_dir(path) {
        Ok(()) => Ok(DirStatus::Created),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {
            Ok(DirStatus::Existing)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => match fs::create_dir_all(path) {
            Ok(()) => Ok(DirStatus::Created),
            Err(e) => Err(BackupDirError::classify(path, e)),
        },
        Err(e) => Err(BackupDirError::classify(path, e)),
    }
}
