//! The caller-facing monitor.
//!
//! Wires a [`FileWatchSession`] to a [`BackupOrchestrator`] through a worker
//! thread, so file copies never run on the notification thread. Every arm and
//! disarm bumps a generation counter; work queued under an older generation is
//! dropped instead of being reported.

use crate::error::WatchError;
use crate::logger::{verbose_log, LogLevel};
use crate::orchestrator::{BackupOrchestrator, BackupOutcome, BackupSettings};
use crate::watcher::{FileWatchSession, WatchedFile};
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Callback receiving the outcome of every processed change.
///
/// Runs on the monitor's worker thread and must not call back into the monitor.
pub type OutcomeHandler = Arc<dyn Fn(&WatchedFile, &BackupOutcome) + Send + Sync>;

struct Job {
    generation: u64,
    file: WatchedFile,
    settings: BackupSettings,
}

struct Dispatch {
    orchestrator: BackupOrchestrator,
    // Also serializes outcome delivery against invalidation.
    generation: Mutex<u64>,
    outcome_handler: Mutex<Option<OutcomeHandler>>,
    verbose: Option<bool>,
}

impl Dispatch {
    fn current_generation(&self) -> u64 {
        *self.generation.lock()
    }

    fn invalidate(&self) {
        *self.generation.lock() += 1;
    }

    fn is_stale(&self, job: &Job) -> bool {
        self.current_generation() != job.generation
    }

    fn execute(&self, job: &Job) -> BackupOutcome {
        self.orchestrator.on_change(&job.file, &job.settings.backup_dir)
    }

    /// Hands `outcome` to the handler unless the job's generation has passed.
    fn deliver(&self, job: &Job, outcome: BackupOutcome) -> bool {
        let generation = self.generation.lock();
        if *generation != job.generation {
            verbose_log(
                LogLevel::Debug,
                &format!(
                    "Discarding backup outcome for {}: watch was reset",
                    job.file.path.display()
                ),
                self.verbose,
            );
            return false;
        }
        let handler = self.outcome_handler.lock().clone();
        if let Some(handler) = handler {
            handler(&job.file, &outcome);
        }
        true
    }

    fn run(&self, jobs: Receiver<Job>) {
        for job in jobs {
            if self.is_stale(&job) {
                continue;
            }
            let outcome = self.execute(&job);
            self.deliver(&job, outcome);
        }
    }
}

/// Watches one file and backs it up on every genuine change while enabled.
pub struct BackupMonitor {
    session: FileWatchSession,
    dispatch: Arc<Dispatch>,
    worker: Option<JoinHandle<()>>,
}

impl BackupMonitor {
    /// Creates an idle, disabled monitor backing up into `backup_dir`.
    ///
    /// # Returns
    /// - An error if the backup worker thread cannot be started
    pub fn new(backup_dir: PathBuf, verbose: Option<bool>) -> io::Result<Self> {
        let dispatch = Arc::new(Dispatch {
            orchestrator: BackupOrchestrator::new(backup_dir),
            generation: Mutex::new(0),
            outcome_handler: Mutex::new(None),
            verbose,
        });

        let (tx, rx) = channel::<Job>();
        let worker = {
            let dispatch = Arc::clone(&dispatch);
            thread::Builder::new()
                .name("filemonitor-backup".into())
                .spawn(move || dispatch.run(rx))?
        };

        let session = FileWatchSession::new(verbose);
        let notify_dispatch = Arc::clone(&dispatch);
        session.set_change_handler(move |file| {
            let settings = notify_dispatch.orchestrator.snapshot();
            if !settings.enabled {
                verbose_log(
                    LogLevel::Debug,
                    &format!("{} changed; monitoring is disabled", file.path.display()),
                    notify_dispatch.verbose,
                );
                return;
            }
            let job = Job {
                generation: notify_dispatch.current_generation(),
                file,
                settings,
            };
            if tx.send(job).is_err() {
                verbose_log(
                    LogLevel::Error,
                    "Backup worker is gone; change not backed up",
                    notify_dispatch.verbose,
                );
            }
        });

        Ok(Self {
            session,
            dispatch,
            worker: Some(worker),
        })
    }

    pub fn set_outcome_handler<F>(&self, handler: F)
    where
        F: Fn(&WatchedFile, &BackupOutcome) + Send + Sync + 'static,
    {
        *self.dispatch.outcome_handler.lock() = Some(Arc::new(handler));
    }

    /// Starts watching `path`, replacing any previously watched file.
    ///
    /// On error the previous watch stays in place and keeps backing up.
    pub fn arm(&mut self, path: &Path) -> Result<WatchedFile, WatchError> {
        let file = self.session.arm(path)?;
        self.dispatch.invalidate();
        Ok(file)
    }

    /// Stops watching and drops any backup work still in flight.
    pub fn disarm(&mut self) {
        self.session.disarm();
        self.dispatch.invalidate();
    }

    pub fn is_armed(&self) -> bool {
        self.session.is_armed()
    }

    pub fn enable(&self) {
        self.dispatch.orchestrator.set_enabled(true);
    }

    pub fn disable(&self) {
        self.dispatch.orchestrator.set_enabled(false);
    }

    /// Flips monitoring on or off and returns whether it is now enabled.
    pub fn toggle(&self) -> bool {
        self.dispatch.orchestrator.toggle()
    }

    pub fn is_enabled(&self) -> bool {
        self.dispatch.orchestrator.snapshot().enabled
    }

    pub fn set_backup_dir(&self, backup_dir: PathBuf) {
        self.dispatch.orchestrator.set_backup_dir(backup_dir);
    }

    pub fn settings(&self) -> BackupSettings {
        self.dispatch.orchestrator.snapshot()
    }

    pub fn current_file(&self) -> Option<WatchedFile> {
        self.session.current()
    }
}

impl Drop for BackupMonitor {
    fn drop(&mut self) {
        self.disarm();
        // Dropping the change handler closes the job channel and ends the worker.
        self.session.clear_change_handler();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
