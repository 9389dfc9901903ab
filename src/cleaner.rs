//! Post-order traversal that deletes expired files and emptied directories.

use crate::config::CleanupConfig;
use crate::report::{EntryKind, Outcome, Reporter};
use crate::time::AgeFilter;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// Cleans one directory tree according to a [`CleanupConfig`].
///
/// Every directory is finished in post-order: its subdirectories first, then
/// its files, and only then (with `delete_empty`) the directory itself. A
/// directory emptied during the run is therefore removed in the same run,
/// and the cascade reaches the root.
pub struct TreeCleaner<'a, R: Reporter + ?Sized> {
    config: &'a CleanupConfig,
    reporter: &'a R,
    age: AgeFilter,
}

impl<'a, R: Reporter + ?Sized> TreeCleaner<'a, R> {
    pub fn new(config: &'a CleanupConfig, reporter: &'a R) -> Self {
        Self::with_now(config, reporter, SystemTime::now())
    }

    /// Measure file ages against `now` instead of the current time
    pub fn with_now(config: &'a CleanupConfig, reporter: &'a R, now: SystemTime) -> Self {
        TreeCleaner {
            config,
            reporter,
            age: AgeFilter::with_now(config.max_age, now),
        }
    }

    /// Walk the whole tree. Per-entry failures go to the reporter and never
    /// stop the walk.
    pub fn run(&self) {
        log::debug!(
            "Cleaning {} (max age {:?}, delete empty: {})",
            self.config.root.display(),
            self.age.max_age(),
            self.config.delete_empty
        );

        // Symlinks are never followed, so a link cycle cannot loop the walk.
        // Listings are read and sorted up front, which also means no handle
        // on a directory is open by the time it is removed.
        let walker = WalkDir::new(&self.config.root)
            .follow_links(false)
            .contents_first(true)
            .sort_by(subdirectories_first);

        // Directories whose listing failed. walkdir still yields them after
        // the error, and they were already reported.
        let mut unlisted: HashSet<PathBuf> = HashSet::new();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    if let Some(path) = err.path() {
                        unlisted.insert(path.to_path_buf());
                    }
                    self.report_walk_error(err);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if unlisted.remove(entry.path()) {
                    continue;
                }
                if self.config.delete_empty {
                    self.prune_if_empty(entry.path());
                }
            } else {
                self.process_file(&entry);
            }
        }

        log::debug!("Finished cleaning {}", self.config.root.display());
    }

    /// Delete a file (or symlink) if it is expired and not ignored
    fn process_file(&self, entry: &DirEntry) {
        let path = entry.path();

        // For symlinks this is the link's own mtime
        let modified = match entry
            .metadata()
            .map_err(io::Error::from)
            .and_then(|metadata| metadata.modified())
        {
            Ok(modified) => modified,
            Err(err) => {
                self.reporter.unreadable(Some(path), &err);
                return;
            }
        };

        if !self.age.is_expired(modified) || self.config.ignore.is_ignored(path) {
            return;
        }

        let outcome = Outcome::from(delete_file(path));
        self.reporter.attempt(EntryKind::File, path, &outcome);
    }

    /// Re-list the directory and remove it if nothing is left in it
    fn prune_if_empty(&self, dir: &Path) {
        match is_empty_dir(dir) {
            Ok(true) => {
                if self.config.ignore.is_ignored(dir) {
                    return;
                }
                let outcome = Outcome::from(fs::remove_dir(dir));
                self.reporter.attempt(EntryKind::Directory, dir, &outcome);
            }
            Ok(false) => {}
            Err(err) => self.reporter.unreadable(Some(dir), &err),
        }
    }

    fn report_walk_error(&self, err: walkdir::Error) {
        let path = err.path().map(Path::to_path_buf);
        let err = io::Error::from(err);
        self.reporter.unreadable(path.as_deref(), &err);
    }
}

/// Order directory listings so subdirectories are walked before files
fn subdirectories_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    b.file_type()
        .is_dir()
        .cmp(&a.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

/// Remove a file. If that is refused and the file is marked read-only,
/// make it writable and try exactly once more. Every other failure is
/// returned as is, and a failed retry puts the original permissions back.
pub fn delete_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => retry_writable(path, err),
        Err(err) => Err(err),
    }
}

fn retry_writable(path: &Path, err: io::Error) -> io::Result<()> {
    let original = match fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.file_type().is_symlink() => metadata.permissions(),
        _ => return Err(err),
    };
    let Some(writable) = writable_permissions(&original) else {
        return Err(err);
    };
    if fs::set_permissions(path, writable).is_err() {
        return Err(err);
    }

    fs::remove_file(path).inspect_err(|_| {
        let _ = fs::set_permissions(path, original);
    })
}

/// Owner write bit only; group and other bits are left alone
#[cfg(unix)]
fn writable_permissions(original: &fs::Permissions) -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;

    let mode = original.mode();
    if mode & 0o200 != 0 {
        return None;
    }
    Some(fs::Permissions::from_mode(mode | 0o200))
}

/// Clears the read-only file attribute
#[cfg(windows)]
#[allow(clippy::permissions_set_readonly_false)]
fn writable_permissions(original: &fs::Permissions) -> Option<fs::Permissions> {
    if !original.readonly() {
        return None;
    }
    let mut writable = original.clone();
    writable.set_readonly(false);
    Some(writable)
}

#[cfg(not(any(unix, windows)))]
fn writable_permissions(_original: &fs::Permissions) -> Option<fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_delete_file_removes_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("old.log");
        fs::write(&file, "data").unwrap();

        delete_file(&file).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_delete_file_missing_reports_first_error() {
        let dir = tempdir().unwrap();
        let err = delete_file(&dir.path().join("gone.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_file_read_only() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("locked.txt");
        fs::write(&file, "data").unwrap();
        let mut permissions = fs::metadata(&file).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&file, permissions).unwrap();

        delete_file(&file).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_delete_file_writable_needs_no_retry() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("writable.txt");
        fs::write(&file, "data").unwrap();
        assert!(writable_permissions(&fs::metadata(&file).unwrap().permissions()).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_writable_permissions_sets_owner_bit_only() {
        use std::os::unix::fs::PermissionsExt;

        let writable = writable_permissions(&fs::Permissions::from_mode(0o444)).unwrap();
        assert_eq!(writable.mode() & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_delete_keeps_original_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let file = locked.join("data.txt");
        fs::write(&file, "data").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let result = delete_file(&file);

        // Root ignores directory permissions and deletes the file outright
        if result.is_err() {
            let mode = fs::metadata(&file).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o444);
        }
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_is_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(is_empty_dir(dir.path()).unwrap());
        fs::write(dir.path().join("f"), "").unwrap();
        assert!(!is_empty_dir(dir.path()).unwrap());
        assert!(is_empty_dir(&dir.path().join("missing")).is_err());
    }
}
