use crate::dedup::ChangeDeduplicator;
use crate::error::WatchError;
use crate::logger::{verbose_log, LogLevel};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Snapshot of the file under observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Directory containing the file
    pub directory: PathBuf,
    /// File name without its extension
    pub name: String,
    /// Extension including the leading dot, or empty
    pub extension: String,
    pub size: u64,
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
}

impl WatchedFile {
    /// Reads the current metadata of the file at `path`.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            directory,
            name,
            extension,
            size: metadata.len(),
            created: metadata.created().ok(),
            modified: metadata.modified().ok(),
        })
    }

    /// Human readable size: plain bytes below 1 kB, whole kilobytes above.
    pub fn display_size(&self) -> String {
        if self.size < 1024 {
            format!("{} bytes", self.size)
        } else {
            format!("{} kB", group_thousands(self.size / 1024))
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Callback receiving the file snapshot for every genuine change.
pub type ChangeHandler = Arc<dyn Fn(WatchedFile) + Send + Sync>;

struct Armed {
    file_name: OsString,
    snapshot: WatchedFile,
}

struct Shared {
    // Held for the whole of a delivery, so `disarm` cannot return mid-delivery.
    armed: Mutex<Option<Armed>>,
    dedup: ChangeDeduplicator,
    handler: Mutex<Option<ChangeHandler>>,
    verbose: Option<bool>,
}

impl Shared {
    fn deliver(&self, res: notify::Result<Event>) {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                verbose_log(LogLevel::Warn, &format!("Watcher error: {}", e), self.verbose);
                return;
            }
        };

        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return;
        }

        let mut armed = self.armed.lock();
        let Some(armed) = armed.as_mut() else {
            return;
        };

        // The watch covers the whole directory; only the target file counts.
        // A late event from a replaced backend may name a same-named file elsewhere.
        if !event.paths.iter().any(|p| {
            p.file_name() == Some(armed.file_name.as_os_str())
                && p.parent() == Some(armed.snapshot.directory.as_path())
        }) {
            return;
        }

        let snapshot = match WatchedFile::from_path(&armed.snapshot.path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                verbose_log(
                    LogLevel::Debug,
                    &format!("Unable to read {}: {}", armed.snapshot.path.display(), e),
                    self.verbose,
                );
                return;
            }
        };
        let Some(modified) = snapshot.modified else {
            return;
        };

        if !self.dedup.accept(modified) {
            verbose_log(
                LogLevel::Debug,
                &format!("Ignoring duplicate notification ({:?})", event.kind),
                self.verbose,
            );
            return;
        }

        armed.snapshot = snapshot.clone();
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(snapshot);
        }
    }
}

/// Watches exactly one file and reports each genuine change to a handler.
///
/// The handler runs on the watcher's notification thread while the session
/// is locked. It must return quickly and must not call back into the session.
pub struct FileWatchSession {
    shared: Arc<Shared>,
    watcher: Option<RecommendedWatcher>,
}

impl FileWatchSession {
    /// Creates an idle session
    pub fn new(verbose: Option<bool>) -> Self {
        Self {
            shared: Arc::new(Shared {
                armed: Mutex::new(None),
                dedup: ChangeDeduplicator::new(),
                handler: Mutex::new(None),
                verbose,
            }),
            watcher: None,
        }
    }

    pub fn set_change_handler<F>(&self, handler: F)
    where
        F: Fn(WatchedFile) + Send + Sync + 'static,
    {
        *self.shared.handler.lock() = Some(Arc::new(handler));
    }

    pub fn clear_change_handler(&self) {
        *self.shared.handler.lock() = None;
    }

    /// Starts watching `path`, replacing any previous watch.
    ///
    /// The previous watch is only torn down once the new one is established;
    /// on error the session keeps watching whatever it watched before.
    ///
    /// # Returns
    /// - The snapshot of the file as it was when the watch started
    pub fn arm(&mut self, path: &Path) -> Result<WatchedFile, WatchError> {
        let armed = prepare(path)?;
        let directory = armed.snapshot.directory.clone();

        let shared = Arc::clone(&self.shared);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| shared.deliver(res),
            Config::default(),
        )
        .map_err(|e| unwatchable(path, e))?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| unwatchable(path, e))?;

        let snapshot = armed.snapshot.clone();
        // Swapped under the session lock, so no delivery sees a half-replaced watch.
        self.install(armed);
        let previous = self.watcher.replace(watcher);
        drop(previous);
        Ok(snapshot)
    }

    /// Stops watching. No handler invocation happens after this returns.
    pub fn disarm(&mut self) {
        self.shared.armed.lock().take();
        // Dropped outside the lock: the backend may still be finishing a delivery.
        self.watcher.take();
    }

    pub fn is_armed(&self) -> bool {
        self.shared.armed.lock().is_some()
    }

    /// Snapshot of the watched file as of the last accepted change.
    pub fn current(&self) -> Option<WatchedFile> {
        self.shared
            .armed
            .lock()
            .as_ref()
            .map(|armed| armed.snapshot.clone())
    }

    fn install(&self, armed: Armed) {
        let mut slot = self.shared.armed.lock();
        self.shared.dedup.reset();
        *slot = Some(armed);
    }
}

impl Drop for FileWatchSession {
    fn drop(&mut self) {
        self.disarm();
    }
}

fn prepare(path: &Path) -> Result<Armed, WatchError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(WatchError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(unwatchable(path, e)),
    };
    if !metadata.is_file() {
        return Err(unwatchable(path, "not a regular file"));
    }

    let path = fs::canonicalize(path).map_err(|e| unwatchable(path, e))?;
    let file_name = path
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| unwatchable(&path, "path has no file name"))?;
    let snapshot = WatchedFile::from_path(&path).map_err(|e| unwatchable(&path, e))?;

    Ok(Armed {
        file_name,
        snapshot,
    })
}

fn unwatchable(path: &Path, reason: impl ToString) -> WatchError {
    WatchError::Unwatchable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
