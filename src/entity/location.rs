//! `Location`: a normalized (path, line, column) value with the
//! equality rule from spec §3 — absent column is distinct from
//! column 0, and path comparison is case-sensitive on POSIX but
//! case-insensitive with separator normalization on Windows-style
//! paths (detected by a drive-letter prefix or backslash).

use std::fmt;

#[derive(Debug, Clone, Eq)]
pub struct Location {
    pub path: String,
    pub line: i64,
    pub column: Option<i64>,
}

impl Location {
    pub fn new(path: impl Into<String>, line: i64, column: Option<i64>) -> Self {
        Self {
            path: path.into(),
            line,
            column,
        }
    }

    fn looks_like_windows_path(path: &str) -> bool {
        path.contains('\\')
            || path
                .as_bytes()
                .get(1)
                .map(|b| *b == b':')
                .unwrap_or(false)
    }

    fn normalized_path(&self) -> String {
        if Self::looks_like_windows_path(&self.path) {
            self.path.replace('\\', "/").to_ascii_lowercase()
        } else {
            self.path.clone()
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_path() == other.normalized_path()
            && self.line == other.line
            && self.column == other.column
    }
}

impl std::hash::Hash for Location {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized_path().hash(state);
        self.line.hash(state);
        self.column.hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(col) => write!(f, "{}:{}:{}", self.path, self.line, col),
            None => write!(f, "{}:{}", self.path, self.line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_column_is_not_column_zero() {
        let with_none = Location::new("/a.rs", 10, None);
        let with_zero = Location::new("/a.rs", 10, Some(0));
        assert_ne!(with_none, with_zero);
    }

    #[test]
    fn posix_paths_are_case_sensitive() {
        let lower = Location::new("/src/a.rs", 1, None);
        let upper = Location::new("/src/A.rs", 1, None);
        assert_ne!(lower, upper);
    }

    #[test]
    fn windows_paths_normalize_separators_and_case() {
        let backslash = Location::new(r"C:\src\a.rs", 1, None);
        let forward = Location::new("c:/src/A.RS", 1, None);
        assert_eq!(backslash, forward);
    }
}
