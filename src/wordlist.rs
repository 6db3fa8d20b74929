use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::constants::DEFAULT_WORDLIST_DIR;
use crate::error::ConfigurationError;

/// Wordlist size selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Low,
    Mid,
    High,
    Test,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Low, Mode::Mid, Mode::High, Mode::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Low => "low",
            Mode::Mid => "mid",
            Mode::High => "high",
            Mode::Test => "test",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.txt", self.as_str())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownMode(s.to_string()))
    }
}

/// Directory holding one `<mode>.txt` file per [`Mode`].
#[derive(Debug, Clone)]
pub struct WordlistSource {
    dir: PathBuf,
}

impl WordlistSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The lists shipped in the crate's `wordlists/subs` directory.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_WORDLIST_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, mode: Mode) -> PathBuf {
        self.dir.join(mode.file_name())
    }

    /// Reads the list for `mode`: one label per line, trimmed, blank lines
    /// skipped, file order kept. Duplicate lines are kept so that every
    /// non-empty line yields exactly one result.
    pub fn load(&self, mode: Mode) -> Result<Vec<String>, ConfigurationError> {
        let path = self.path_for(mode);
        let raw = fs::read_to_string(&path)
            .map_err(|source| ConfigurationError::WordlistUnreadable { path: path.clone(), source })?;

        let labels: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        debug!(path = %path.display(), labels = labels.len(), "wordlist loaded");
        Ok(labels)
    }
}

impl Default for WordlistSource {
    fn default() -> Self {
        Self::bundled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_modes_case_insensitively() {
        assert_eq!("low".parse::<Mode>().unwrap(), Mode::Low);
        assert_eq!("HIGH".parse::<Mode>().unwrap(), Mode::High);
        assert_eq!(" test ".parse::<Mode>().unwrap(), Mode::Test);
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = "huge".parse::<Mode>().unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownMode(ref m) if m == "huge"));
    }

    #[test]
    fn loads_trimmed_non_empty_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("mid.txt")).unwrap();
        write!(file, "www\n\n  api  \r\n\t\nmail\nwww\n").unwrap();

        let labels = WordlistSource::new(dir.path()).load(Mode::Mid).unwrap();
        assert_eq!(labels, vec!["www", "api", "mail", "www"]);
    }

    #[test]
    fn missing_wordlist_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WordlistSource::new(dir.path()).load(Mode::High).unwrap_err();
        match err {
            ConfigurationError::WordlistUnreadable { path, .. } => {
                assert!(path.ends_with("high.txt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bundled_lists_exist_for_every_mode() {
        let source = WordlistSource::bundled();
        for mode in Mode::ALL {
            let labels = source.load(mode).unwrap();
            assert!(!labels.is_empty(), "{mode} list is empty");
        }
        assert_eq!(source.load(Mode::Test).unwrap().len(), 7);
    }
}
