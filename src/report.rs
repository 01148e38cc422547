use chrono::{DateTime, Local};
use filemonitor::logger::{log, LogLevel};
use filemonitor::{BackupOutcome, OutcomeKind, WatchedFile};
use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;

/// One processed change, as printed with `--json`.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub time: String,
    pub source: PathBuf,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutcomeRecord {
    pub fn new(file: &WatchedFile, outcome: &BackupOutcome) -> Self {
        let label = match outcome.kind() {
            OutcomeKind::Created => "created",
            OutcomeKind::SkippedDuplicate => "skipped_duplicate",
            OutcomeKind::DirectoryError => "directory_error",
            OutcomeKind::CopyError => "copy_error",
        };
        let error = match outcome {
            BackupOutcome::DirectoryError(e) => Some(e.to_string()),
            BackupOutcome::CopyError(e) => Some(e.to_string()),
            _ => None,
        };
        Self {
            time: Local::now().to_rfc3339(),
            source: file.path.clone(),
            outcome: label,
            path: outcome.path().map(PathBuf::from),
            error,
        }
    }
}

/// Prints one outcome for a human reader.
pub fn print_outcome(file: &WatchedFile, outcome: &BackupOutcome, verbose: Option<bool>) {
    match outcome {
        BackupOutcome::Created(path) => {
            log(LogLevel::Info, &format!("Created backup {}", path.display()))
        }
        BackupOutcome::SkippedDuplicate(path) => {
            if verbose == Some(true) {
                log(
                    LogLevel::Debug,
                    &format!("Backup {} already exists; skipped", path.display()),
                );
            }
        }
        BackupOutcome::DirectoryError(e) => {
            log(LogLevel::Error, &format!("Unable to create backup folder; {}", e));
            log(
                LogLevel::Error,
                &format!(
                    "{} was NOT backed up. Fix the backup folder; the next change will retry.",
                    file.path.display()
                ),
            );
        }
        BackupOutcome::CopyError(e) => {
            log(LogLevel::Error, &format!("Backup failed; {}", e));
        }
    }
}

pub fn print_json(file: &WatchedFile, outcome: &BackupOutcome) {
    match serde_json::to_string(&OutcomeRecord::new(file, outcome)) {
        Ok(line) => println!("{}", line),
        Err(e) => log(LogLevel::Error, &format!("Unable to encode outcome: {}", e)),
    }
}

/// File details shown after loading a file.
pub fn describe_file(file: &WatchedFile) {
    log(LogLevel::Info, &format!("Loaded file {}", file.path.display()));
    println!("  name:      {}", file.name);
    println!("  directory: {}", file.directory.display());
    println!("  size:      {}", file.display_size());
    println!("  created:   {}", format_time(file.created));
    println!("  modified:  {}", format_time(file.modified));
}

fn format_time(time: Option<SystemTime>) -> String {
    time.map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use filemonitor::CopyError;
    use std::io;

    fn file() -> WatchedFile {
        WatchedFile {
            path: PathBuf::from("/maps/map.ut2"),
            directory: PathBuf::from("/maps"),
            name: "map".into(),
            extension: ".ut2".into(),
            size: 10,
            created: None,
            modified: None,
        }
    }

    #[test]
    fn created_record_carries_path() {
        let outcome = BackupOutcome::Created(PathBuf::from("/backups/map 2024-06-01 10.00.00.ut2"));
        let record = OutcomeRecord::new(&file(), &outcome);
        assert_eq!(record.outcome, "created");
        assert_eq!(
            record.path,
            Some(PathBuf::from("/backups/map 2024-06-01 10.00.00.ut2"))
        );

        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"], "/maps/map.ut2");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_record_carries_message() {
        let outcome = BackupOutcome::CopyError(CopyError::DiskFull {
            destination: PathBuf::from("/backups/x.ut2"),
            source: io::Error::from(io::ErrorKind::Other),
        });
        let record = OutcomeRecord::new(&file(), &outcome);
        assert_eq!(record.outcome, "copy_error");
        assert!(record.path.is_none());
        assert!(record.error.unwrap().contains("no space left"));
    }

    #[test]
    fn unknown_times_are_labelled() {
        assert_eq!(format_time(None), "unknown");
    }
}
