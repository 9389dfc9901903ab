//! agesweep - Age-based directory tree cleanup
//!
//! agesweep walks a directory tree and deletes files whose last modification
//! is older than a maximum age. Paths matching user-supplied regular
//! expressions are never touched, and directories left empty can optionally
//! be removed in the same pass.
//!
//! ## Architecture
//!
//! - `time`: parses maximum ages ("7d", "12h", "1.02:00:00") and decides eligibility
//! - `patterns`: ignore patterns matched against full paths
//! - `cleaner`: the post-order walk that performs deletions
//! - `report`: the collaborator that receives each deletion attempt
//! - `config`: settings from the command line or a TOML file, validated once
//! - `logging`: the dated log file backend

pub mod cleaner;
pub mod config;
pub mod logging;
pub mod patterns;
pub mod report;
pub mod time;

// Re-export commonly used items
pub use cleaner::{delete_file, TreeCleaner};
pub use config::{CleanupConfig, ConfigError, Settings};
pub use patterns::IgnoreSet;
pub use report::{EntryKind, LogReporter, Outcome, Reporter};
pub use time::{parse_duration, AgeFilter};
