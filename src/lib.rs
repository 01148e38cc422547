//! Watches a single file and keeps a timestamped backup of every change.
//!
//! [`BackupMonitor`] is the entry point: arm it on a file, enable it, and
//! register an outcome handler to hear about every backup attempt.

pub mod backup_dir;
pub mod dedup;
pub mod error;
pub mod logger;
pub mod monitor;
pub mod namer;
pub mod orchestrator;
pub mod watcher;

pub use error::{BackupDirError, CopyError, WatchError};
pub use monitor::{BackupMonitor, OutcomeHandler};
pub use orchestrator::{BackupOrchestrator, BackupOutcome, BackupSettings, OutcomeKind};
pub use watcher::{FileWatchSession, WatchedFile};
