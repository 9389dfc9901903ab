//! Reporting of deletion attempts.
//!
//! The cleaner never logs on its own: every attempt and every unreadable
//! entry is handed to a [`Reporter`], which decides where it goes.

use std::fmt;
use std::io;
use std::path::Path;

/// What kind of entry a deletion attempt targeted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
        }
    }
}

/// Result of a single deletion attempt
#[derive(Debug)]
pub enum Outcome {
    Deleted,
    Failed(io::Error),
}

impl Outcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Outcome::Deleted)
    }
}

impl From<io::Result<()>> for Outcome {
    fn from(result: io::Result<()>) -> Self {
        match result {
            Ok(()) => Outcome::Deleted,
            Err(err) => Outcome::Failed(err),
        }
    }
}

/// Receives the outcome of everything the cleaner tried to do.
pub trait Reporter {
    /// Called once per deletion attempt, successful or not
    fn attempt(&self, kind: EntryKind, path: &Path, outcome: &Outcome);

    /// Called when an entry could not be listed or inspected and was skipped
    fn unreadable(&self, path: Option<&Path>, err: &io::Error);
}

/// Forwards attempts to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn attempt(&self, kind: EntryKind, path: &Path, outcome: &Outcome) {
        match outcome {
            Outcome::Deleted => log::info!("Deleted {}: {}", kind, path.display()),
            Outcome::Failed(err) => {
                log::warn!("Failed to delete {} {}: {}", kind, path.display(), err)
            }
        }
    }

    fn unreadable(&self, path: Option<&Path>, err: &io::Error) {
        match path {
            Some(path) => log::warn!("Skipping unreadable entry {}: {}", path.display(), err),
            None => log::warn!("Skipping unreadable entry: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        assert!(Outcome::from(Ok(())).is_deleted());

        let failed = Outcome::from(Err(io::Error::from(io::ErrorKind::PermissionDenied)));
        match failed {
            Outcome::Failed(err) => assert_eq!(err.kind(), io::ErrorKind::PermissionDenied),
            Outcome::Deleted => panic!("expected a failure"),
        }
    }

    #[test]
    fn test_entry_kind_display() {
        assert_eq!(EntryKind::File.to_string(), "file");
        assert_eq!(EntryKind::Directory.to_string(), "directory");
    }
}
