//! Ignore-pattern matching against full entry paths.

use crate::config::ConfigError;
use regex::Regex;
use std::path::Path;

/// Ordered set of compiled ignore patterns.
///
/// Patterns are unanchored regular expressions searched within the full path
/// string, so `\.keep$` protects every `*.keep` file and `cache` protects
/// anything with "cache" anywhere in its path.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Regex>,
}

impl IgnoreSet {
    /// Compile the patterns in order. The first invalid pattern is reported.
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IgnoreSet { patterns })
    }

    /// Check if a path matches any pattern. Stops at the first match.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();
        self.patterns.iter().any(|re| re.is_match(&path_str))
    }

    /// Source text of each pattern, in configuration order
    pub fn as_strs(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_set_ignores_nothing() {
        let set = IgnoreSet::default();
        assert!(set.is_empty());
        assert!(!set.is_ignored(Path::new("/some/path/file.txt")));
    }

    #[test]
    fn test_suffix_pattern() {
        let set = IgnoreSet::new([r"\.keep$"]).unwrap();
        assert!(set.is_ignored(Path::new("/old/data.keep")));
        assert!(!set.is_ignored(Path::new("/old/data.tmp")));
        assert!(!set.is_ignored(Path::new("/old/data.keep.tmp")));
    }

    #[test]
    fn test_unanchored_substring_match() {
        let set = IgnoreSet::new(["cache"]).unwrap();
        assert!(set.is_ignored(Path::new("/var/cache/app/blob")));
        assert!(set.is_ignored(Path::new("/home/user/mycache.db")));
        assert!(!set.is_ignored(Path::new("/var/log/app.log")));
    }

    #[test]
    fn test_matches_directory_component() {
        let set = IgnoreSet::new(["/important/"]).unwrap();
        let path: PathBuf = ["/", "srv", "important", "report.csv"].iter().collect();
        assert!(set.is_ignored(&path));
    }

    #[test]
    fn test_any_pattern_matches() {
        let set = IgnoreSet::new([r"\.log$", r"\.lock$", "^/never"]).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.is_ignored(Path::new("/tmp/run.lock")));
        assert!(set.is_ignored(Path::new("/tmp/app.log")));
        assert!(!set.is_ignored(Path::new("/tmp/app.txt")));
    }

    #[test]
    fn test_patterns_keep_order() {
        let set = IgnoreSet::new(["b", "a", "c"]).unwrap();
        assert_eq!(set.as_strs().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_invalid_pattern_reports_source() {
        let err = IgnoreSet::new(["ok", "(unclosed"]).unwrap_err();
        match err {
            ConfigError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
