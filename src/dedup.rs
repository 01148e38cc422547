use parking_lot::Mutex;
use std::time::SystemTime;

/// Collapses the burst of notifications produced by a single write.
///
/// A notification is a genuine change only if the file's modification time
/// differs from the last accepted one.
#[derive(Debug, Default)]
pub struct ChangeDeduplicator {
    last_seen: Mutex<Option<SystemTime>>,
}

impl ChangeDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `observed` if it differs from the last accepted mtime.
    pub fn accept(&self, observed: SystemTime) -> bool {
        let mut last_seen = self.last_seen.lock();
        if *last_seen == Some(observed) {
            return false;
        }
        *last_seen = Some(observed);
        true
    }

    /// Forgets the last accepted mtime so the next observation is always accepted.
    pub fn reset(&self) {
        *self.last_seen.lock() = None;
    }

    pub fn last_seen(&self) -> Option<SystemTime> {
        *self.last_seen.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn same_mtime_is_accepted_once() {
        let dedup = ChangeDeduplicator::new();
        assert!(dedup.accept(t(100)));
        assert!(!dedup.accept(t(100)));
        assert!(!dedup.accept(t(100)));
    }

    #[test]
    fn distinct_mtimes_are_all_accepted() {
        let dedup = ChangeDeduplicator::new();
        assert!(dedup.accept(t(100)));
        assert!(dedup.accept(t(200)));
        // Going back in time (file restored from elsewhere) still counts.
        assert!(dedup.accept(t(100)));
    }

    #[test]
    fn reset_accepts_previous_mtime_again() {
        let dedup = ChangeDeduplicator::new();
        assert!(dedup.accept(t(100)));
        dedup.reset();
        assert_eq!(dedup.last_seen(), None);
        assert!(dedup.accept(t(100)));
    }

    #[test]
    fn racing_duplicates_accept_exactly_one() {
        let dedup = Arc::new(ChangeDeduplicator::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let dedup = Arc::clone(&dedup);
                thread::spawn(move || dedup.accept(t(42)))
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|accepted| *accepted)
            .count();
        assert_eq!(accepted, 1);
    }
}
