//! Cleanup settings: raw values from the command line or a TOML file, and
//! the validated configuration handed to the cleaner.

use crate::patterns::IgnoreSet;
use crate::time::parse_duration;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors that stop a run before anything is touched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no path to clean was given")]
    MissingPath,

    #[error("path does not exist: {}", .path.display())]
    PathNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("no maximum age was given")]
    MissingMaxAge,

    #[error("invalid maximum age '{value}': {reason}")]
    InvalidMaxAge { value: String, reason: String },

    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read settings file {}: {source}", .path.display())]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings file {}: {source}", .path.display())]
    ParseSettings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Unvalidated settings, as read from a settings file or the command line.
///
/// ```toml
/// path = "/var/spool/reports"
/// max-age = "14d"
/// delete-empty = true
/// ignore = ['\.keep$', '/pinned/']
/// log-dir = "/var/log/agesweep"
/// quiet = true
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
    pub path: Option<PathBuf>,
    pub max_age: Option<String>,
    pub delete_empty: bool,
    pub ignore: Vec<String>,
    pub log_dir: Option<PathBuf>,
    pub quiet: bool,
}

impl Settings {
    /// Parse settings from TOML text. `origin` is only used in error messages.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::ParseSettings {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read and parse a settings file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Layer `overrides` on top of these settings.
    ///
    /// Values present in `overrides` win, ignore lists are concatenated
    /// (ours first) and flags are enabled if either side enables them.
    pub fn overridden_by(self, overrides: Settings) -> Settings {
        let mut ignore = self.ignore;
        ignore.extend(overrides.ignore);

        Settings {
            path: overrides.path.or(self.path),
            max_age: overrides.max_age.or(self.max_age),
            delete_empty: self.delete_empty || overrides.delete_empty,
            ignore,
            log_dir: overrides.log_dir.or(self.log_dir),
            quiet: self.quiet || overrides.quiet,
        }
    }

    /// Validate the settings into a [`CleanupConfig`].
    ///
    /// The maximum age is checked before the filesystem is consulted, and the
    /// root is canonicalized so that ignore patterns see absolute paths.
    pub fn into_config(self) -> Result<CleanupConfig, ConfigError> {
        let path = self.path.ok_or(ConfigError::MissingPath)?;
        let max_age_str = self.max_age.ok_or(ConfigError::MissingMaxAge)?;

        let max_age = parse_duration(&max_age_str).map_err(|err| ConfigError::InvalidMaxAge {
            value: max_age_str.clone(),
            reason: format!("{:#}", err),
        })?;

        let ignore = IgnoreSet::new(&self.ignore)?;

        let root = fs::canonicalize(&path).map_err(|source| ConfigError::PathNotFound {
            path: path.clone(),
            source,
        })?;
        if !root.is_dir() {
            return Err(ConfigError::NotADirectory(path));
        }

        Ok(CleanupConfig {
            root,
            max_age,
            delete_empty: self.delete_empty,
            ignore,
            quiet: self.quiet,
        })
    }
}

/// Validated, read-only configuration for one cleanup run
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Absolute path of an existing directory
    pub root: PathBuf,
    /// Files at most this old are kept
    pub max_age: Duration,
    /// Remove directories that are empty once their contents were processed
    pub delete_empty: bool,
    /// Paths matching any of these are never deleted
    pub ignore: IgnoreSet,
    /// Suppress the startup banner
    pub quiet: bool,
}
