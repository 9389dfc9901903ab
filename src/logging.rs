//! Dated log file backend for the `log` facade.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Appends one line per record to a log file
pub struct FileLogger {
    file: Mutex<File>,
    level: LevelFilter,
}

impl FileLogger {
    pub fn new(file: File, level: LevelFilter) -> Self {
        FileLogger {
            file: Mutex::new(file),
            level,
        }
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format!(
            "{} {:<5} {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        );
        // A failed log write has nowhere better to go
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", line);
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Log file name for a given day, e.g. `261015.log`
pub fn log_file_name(date: NaiveDate) -> String {
    date.format("%y%m%d.log").to_string()
}

/// Create `log_dir` if needed and open today's log file for appending
pub fn open_log_file(log_dir: &Path, date: NaiveDate) -> Result<(PathBuf, File)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let path = log_dir.join(log_file_name(date));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Ok((path, file))
}

/// Install a [`FileLogger`] writing to today's file in `log_dir`.
/// Returns the path of the log file.
pub fn init(log_dir: &Path) -> Result<PathBuf> {
    let (path, file) = open_log_file(log_dir, Local::now().date_naive())?;

    log::set_boxed_logger(Box::new(FileLogger::new(file, LevelFilter::Info)))
        .context("Failed to install logger")?;
    log::set_max_level(LevelFilter::Info);

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use tempfile::tempdir;

    #[test]
    fn test_log_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(log_file_name(date), "261015.log");
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();

        let (path, _file) = open_log_file(&log_dir, date).unwrap();
        assert_eq!(path, log_dir.join("260102.log"));
        assert!(path.is_file());
    }

    #[test]
    fn test_file_logger_writes_and_filters() {
        let dir = tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let (path, file) = open_log_file(dir.path(), date).unwrap();
        let logger = FileLogger::new(file, LevelFilter::Info);

        logger.log(
            &Record::builder()
                .args(format_args!("Deleted file: /tmp/a"))
                .level(Level::Info)
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("walking /tmp"))
                .level(Level::Debug)
                .build(),
        );
        logger.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("INFO  Deleted file: /tmp/a"));
        assert!(!contents.contains("walking"));
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn test_open_log_file_appends() {
        let dir = tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let (path, mut first) = open_log_file(dir.path(), date).unwrap();
        writeln!(first, "first run").unwrap();
        drop(first);

        let (_, mut second) = open_log_file(dir.path(), date).unwrap();
        writeln!(second, "second run").unwrap();
        drop(second);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first run\nsecond run\n");
    }
}
