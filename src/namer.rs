use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Timestamp layout embedded in backup names, second precision.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

/// Computes where a backup of `source_name` taken at `timestamp` goes.
///
/// The result is `<backup_dir>/<source_name> <timestamp><source_extension>`.
/// `source_extension` keeps its leading dot (or is empty). Two calls within
/// the same second yield the same path; callers treat that as a duplicate.
pub fn compute_backup_path(
    source_name: &str,
    source_extension: &str,
    backup_dir: &Path,
    timestamp: NaiveDateTime,
) -> PathBuf {
    let file_name = format!(
        "{} {}{}",
        source_name,
        timestamp.format(BACKUP_TIMESTAMP_FORMAT),
        source_extension
    );
    backup_dir.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn formats_name_and_timestamp() {
        let taken = at(2024, 1, 2, 3, 4, 5);
        let path = compute_backup_path("Level01", ".ext", Path::new("/backups"), taken);
        assert_eq!(path, PathBuf::from("/backups/Level01 2024-01-02 03.04.05.ext"));
    }

    #[test]
    fn keeps_casing_and_missing_extension() {
        let taken = at(2024, 12, 31, 23, 59, 59);
        let path = compute_backup_path("CTF-Face", "", Path::new("/b"), taken);
        assert_eq!(path, PathBuf::from("/b/CTF-Face 2024-12-31 23.59.59"));

        let path = compute_backup_path("MAP", ".UNR", Path::new("/b"), at(2024, 6, 1, 10, 0, 0));
        assert_eq!(path, PathBuf::from("/b/MAP 2024-06-01 10.00.00.UNR"));
    }

    #[test]
    fn sub_second_changes_collide() {
        let base = at(2024, 6, 1, 10, 0, 0);
        let later = base + chrono::Duration::milliseconds(750);
        assert_eq!(
            compute_backup_path("map", ".ut2", Path::new("/b"), base),
            compute_backup_path("map", ".ut2", Path::new("/b"), later)
        );
    }
}
