//! Log file cleanup
//!
//! Finds files carrying the log extension anywhere below a root directory
//! and deletes them, optionally only those older than a retention period.
//! A file that cannot be deleted, or a subdirectory that cannot be read, is
//! recorded in the report and skipped; the rest of the cleanup carries on.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::{LogError, Result};

/// Options controlling which files a cleanup removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Extension to match, with or without the leading dot
    pub extension: String,
    /// Only delete files last modified longer ago than this
    pub max_age: Option<Duration>,
}

impl CleanupOptions {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            max_age: None,
        }
    }

    /// Keep files modified within the given number of days
    pub fn older_than_days(mut self, days: u64) -> Self {
        self.max_age = Some(Duration::from_secs(days * 24 * 60 * 60));
        self
    }
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::new("log")
    }
}

/// Outcome of a cleanup run
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Files that were removed
    pub deleted: Vec<PathBuf>,
    /// Per-file failures, in the order they happened
    pub failed: Vec<LogError>,
    /// Subdirectories that could not be read while scanning
    pub skipped: Vec<LogError>,
}

impl CleanupReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Every problem met during the run, scan errors first
    pub fn problems(&self) -> impl Iterator<Item = &LogError> {
        self.skipped.iter().chain(self.failed.iter())
    }
}

/// `log` and `.log` both become `.log`
pub fn normalize_extension(extension: &str) -> String {
    format!(".{}", extension.trim_start_matches('.'))
}

/// Files found below a root, plus the subdirectories that could not be read
#[derive(Debug, Default)]
pub struct LogScan {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<LogError>,
}

/// Recursively collect files under `root` whose name ends with `extension`
///
/// A missing root yields no files. An unreadable root is an error; unreadable
/// subdirectories are recorded in `skipped` and the walk continues.
pub fn find_log_files(root: &Path, extension: &str) -> Result<LogScan> {
    let mut scan = LogScan::default();
    if !root.exists() {
        return Ok(scan);
    }

    let suffix = normalize_extension(extension);
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if dir == root => {
                return Err(LogError::Scan { path: dir, source });
            }
            Err(source) => {
                scan.skipped.push(LogError::Scan { path: dir, source });
                continue;
            }
        };

        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && has_suffix(&path, &suffix) {
                scan.files.push(path);
            }
        }
    }

    scan.files.sort();
    Ok(scan)
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |name| name.ends_with(suffix) && name.len() > suffix.len())
}

/// Delete each file that still exists, continuing past failures
pub fn delete_files(files: &[PathBuf]) -> CleanupReport {
    let mut report = CleanupReport::default();

    for path in files {
        if !path.exists() {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => report.deleted.push(path.clone()),
            Err(source) => report.failed.push(LogError::Delete {
                path: path.clone(),
                source,
            }),
        }
    }

    report
}

/// Delete matching log files below `root`
pub fn clean_up_in(root: &Path, options: &CleanupOptions) -> Result<CleanupReport> {
    let LogScan { mut files, skipped } = find_log_files(root, &options.extension)?;

    if let Some(max_age) = options.max_age {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        files.retain(|path| {
            fs::metadata(path)
                .and_then(|m| m.modified())
                .map_or(false, |modified| modified < cutoff)
        });
    }

    let mut report = delete_files(&files);
    report.skipped = skipped;
    Ok(report)
}

/// Delete matching log files below the current working directory
pub fn clean_up(options: &CleanupOptions) -> Result<CleanupReport> {
    let root = std::env::current_dir().map_err(|source| LogError::Scan {
        path: PathBuf::from("."),
        source,
    })?;
    clean_up_in(&root, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(path).unwrap().write_all(b"test").unwrap();
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("log"), ".log");
        assert_eq!(normalize_extension(".log"), ".log");
    }

    #[test]
    fn test_cleanup_deletes_logs_in_tree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("a.log"));
        touch(&root.join("b.txt"));
        touch(&root.join("sub").join("c.log"));

        let report = clean_up_in(root, &CleanupOptions::default()).unwrap();

        assert_eq!(report.deleted_count(), 2);
        assert!(report.is_clean());
        assert!(!root.join("a.log").exists());
        assert!(!root.join("sub").join("c.log").exists());
        assert!(root.join("b.txt").exists());
    }

    #[test]
    fn test_find_ignores_lookalike_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("catalog"));
        touch(&root.join(".log"));
        touch(&root.join("deep").join("er").join("x.log"));

        let scan = find_log_files(root, "log").unwrap();
        assert_eq!(scan.files, vec![root.join("deep").join("er").join("x.log")]);
        assert!(scan.skipped.is_empty());
    }

    #[test]
    fn test_cleanup_nonexistent_dir() {
        let path = Path::new("/nonexistent/path/for/testing");
        let report = clean_up_in(path, &CleanupOptions::default()).unwrap();
        assert_eq!(report.deleted_count(), 0);
    }

    #[test]
    fn test_cleanup_keeps_recent_files_with_retention() {
        let temp_dir = TempDir::new().unwrap();
        let log_file = temp_dir.path().join("event.log");
        touch(&log_file);

        let options = CleanupOptions::default().older_than_days(7);
        let report = clean_up_in(temp_dir.path(), &options).unwrap();

        assert_eq!(report.deleted_count(), 0);
        assert!(log_file.exists());
    }

    #[test]
    fn test_delete_files_skips_missing() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("present.log");
        touch(&present);
        let missing = temp_dir.path().join("missing.log");

        let report = delete_files(&[missing, present.clone()]);
        assert_eq!(report.deleted, vec![present]);
        assert!(report.is_clean());
    }

    #[test]
    fn test_delete_failure_does_not_abort() {
        let temp_dir = TempDir::new().unwrap();
        // A directory named like a log file cannot be removed with remove_file
        let stubborn = temp_dir.path().join("stubborn.log");
        fs::create_dir(&stubborn).unwrap();
        let plain = temp_dir.path().join("plain.log");
        touch(&plain);

        let report = delete_files(&[stubborn.clone(), plain.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0], LogError::Delete { .. }));
        assert_eq!(report.deleted, vec![plain]);
        assert!(stubborn.exists());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_problems_lists_scan_errors_first() {
        let denied = || std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let report = CleanupReport {
            deleted: Vec::new(),
            failed: vec![LogError::Delete {
                path: PathBuf::from("a.log"),
                source: denied(),
            }],
            skipped: vec![LogError::Scan {
                path: PathBuf::from("locked"),
                source: denied(),
            }],
        };

        let kinds: Vec<&str> = report.problems().map(LogError::kind).collect();
        assert_eq!(kinds, vec!["scan", "delete"]);
        assert!(!report.is_clean());
    }
}
