use crate::backup_dir::{ensure_exists, DirStatus};
use crate::error::{BackupDirError, CopyError};
use crate::logger::{log, LogLevel};
use crate::namer::compute_backup_path;
use crate::watcher::WatchedFile;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Result of handling one genuine change.
#[derive(Debug)]
pub enum BackupOutcome {
    Created(PathBuf),
    SkippedDuplicate(PathBuf),
    DirectoryError(BackupDirError),
    CopyError(CopyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Created,
    SkippedDuplicate,
    DirectoryError,
    CopyError,
}

impl BackupOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Created(_) => OutcomeKind::Created,
            Self::SkippedDuplicate(_) => OutcomeKind::SkippedDuplicate,
            Self::DirectoryError(_) => OutcomeKind::DirectoryError,
            Self::CopyError(_) => OutcomeKind::CopyError,
        }
    }

    /// The backup destination, for outcomes that got as far as naming one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Created(path) | Self::SkippedDuplicate(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::DirectoryError(_) | Self::CopyError(_))
    }
}

/// Values shared between the caller and the notification path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub backup_dir: PathBuf,
    pub enabled: bool,
}

/// Turns genuine changes into backup artifacts.
///
/// Owns the enabled flag and the backup directory. Callers take one
/// `snapshot` per change and hand its directory to `on_change`.
pub struct BackupOrchestrator {
    settings: Mutex<BackupSettings>,
}

impl BackupOrchestrator {
    /// Creates an orchestrator with monitoring disabled
    pub fn new(backup_dir: PathBuf) -> Self {
        Self {
            settings: Mutex::new(BackupSettings {
                backup_dir,
                enabled: false,
            }),
        }
    }

    pub fn snapshot(&self) -> BackupSettings {
        self.settings.lock().clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.settings.lock().enabled = enabled;
    }

    /// Flips the enabled flag and returns the new value.
    pub fn toggle(&self) -> bool {
        let mut settings = self.settings.lock();
        settings.enabled = !settings.enabled;
        settings.enabled
    }

    pub fn set_backup_dir(&self, backup_dir: PathBuf) {
        self.settings.lock().backup_dir = backup_dir;
    }

    /// Backs up `file` into `backup_dir`, never overwriting an existing artifact.
    ///
    /// Performs at most one directory creation and one copy. Nothing is retried;
    /// the next genuine change is the retry.
    pub fn on_change(&self, file: &WatchedFile, backup_dir: &Path) -> BackupOutcome {
        match ensure_exists(backup_dir) {
            Ok(DirStatus::Created) => log(
                LogLevel::Info,
                &format!(
                    "Backup directory doesn't exist; created {}",
                    backup_dir.display()
                ),
            ),
            Ok(DirStatus::Existing) => {}
            Err(e) => return BackupOutcome::DirectoryError(e),
        }

        let taken_at = DateTime::<Local>::from(file.modified.unwrap_or_else(SystemTime::now));
        let destination =
            compute_backup_path(&file.name, &file.extension, backup_dir, taken_at.naive_local());

        match copy_new(&file.path, &destination) {
            Ok(()) => BackupOutcome::Created(destination),
            Err(CopyFailure::Exists) => BackupOutcome::SkippedDuplicate(destination),
            Err(CopyFailure::Io(e)) => {
                BackupOutcome::CopyError(CopyError::classify(&file.path, &destination, e))
            }
        }
    }
}

enum CopyFailure {
    Exists,
    Io(io::Error),
}

/// Copies `source` into a file that must not exist yet.
///
/// A partially written destination is removed on failure.
fn copy_new(source: &Path, destination: &Path) -> Result<(), CopyFailure> {
    let mut writer = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
    {
        Ok(writer) => writer,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(CopyFailure::Exists),
        Err(e) => return Err(CopyFailure::Io(e)),
    };

    let copied = File::open(source)
        .and_then(|mut reader| io::copy(&mut reader, &mut writer))
        .and_then(|_| writer.sync_all());

    if let Err(e) = copied {
        drop(writer);
        let _ = fs::remove_file(destination);
        return Err(CopyFailure::Io(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    /// Writes `name` into `dir` with an mtime of 2024-06-01 10:00:00 local time.
    fn source_at(dir: &Path, name: &str, contents: &[u8]) -> WatchedFile {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        let naive = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let local = Local.from_local_datetime(&naive).single().unwrap();
        set_file_mtime(&path, FileTime::from_system_time(local.into())).unwrap();
        WatchedFile::from_path(&path).unwrap()
    }

    #[test]
    fn creates_named_backup() {
        let tmp = TempDir::new().unwrap();
        let file = source_at(tmp.path(), "map.ut2", b"level data");
        let backups = tmp.path().join("backups");

        let orchestrator = BackupOrchestrator::new(backups.clone());
        let outcome = orchestrator.on_change(&file, &backups);

        let expected = backups.join("map 2024-06-01 10.00.00.ut2");
        assert!(matches!(&outcome, BackupOutcome::Created(p) if *p == expected));
        assert_eq!(outcome.path(), Some(expected.as_path()));
        assert_eq!(fs::read(&expected).unwrap(), b"level data");
    }

    #[test]
    fn existing_destination_is_left_alone() {
        let tmp = TempDir::new().unwrap();
        let file = source_at(tmp.path(), "map.ut2", b"new bytes");
        let backups = tmp.path().join("backups");
        fs::create_dir(&backups).unwrap();
        let existing = backups.join("map 2024-06-01 10.00.00.ut2");
        fs::write(&existing, b"old bytes").unwrap();

        let outcome = BackupOrchestrator::new(backups.clone()).on_change(&file, &backups);

        assert_eq!(outcome.kind(), OutcomeKind::SkippedDuplicate);
        assert!(!outcome.is_error());
        assert_eq!(fs::read(&existing).unwrap(), b"old bytes");
    }

    #[test]
    fn directory_failure_then_recovery() {
        let tmp = TempDir::new().unwrap();
        let file = source_at(tmp.path(), "map.ut2", b"level data");
        let backups = tmp.path().join("backups");
        fs::write(&backups, b"in the way").unwrap();

        let orchestrator = BackupOrchestrator::new(backups.clone());
        let outcome = orchestrator.on_change(&file, &backups);
        assert!(matches!(
            outcome,
            BackupOutcome::DirectoryError(BackupDirError::PathCollision { .. })
        ));
        assert!(outcome.is_error());
        assert!(backups.is_file());

        fs::remove_file(&backups).unwrap();
        let outcome = orchestrator.on_change(&file, &backups);
        assert_eq!(outcome.kind(), OutcomeKind::Created);
    }

    #[test]
    fn vanished_source_leaves_no_partial_backup() {
        let tmp = TempDir::new().unwrap();
        let file = source_at(tmp.path(), "map.ut2", b"level data");
        fs::remove_file(&file.path).unwrap();
        let backups = tmp.path().join("backups");

        let outcome = BackupOrchestrator::new(backups.clone()).on_change(&file, &backups);

        assert!(matches!(outcome, BackupOutcome::CopyError(CopyError::Other { .. })));
        assert_eq!(fs::read_dir(&backups).unwrap().count(), 0);
    }

    #[test]
    fn settings_snapshot_and_toggle() {
        let orchestrator = BackupOrchestrator::new(PathBuf::from("/backups"));
        assert!(!orchestrator.snapshot().enabled);

        assert!(orchestrator.toggle());
        orchestrator.set_backup_dir(PathBuf::from("/elsewhere"));
        assert_eq!(
            orchestrator.snapshot(),
            BackupSettings {
                backup_dir: PathBuf::from("/elsewhere"),
                enabled: true,
            }
        );

        orchestrator.set_enabled(false);
        assert!(!orchestrator.snapshot().enabled);
    }
}
