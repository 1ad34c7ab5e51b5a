//! Record of source files already downloaded.
//!
//! There is no separate state store: the raw directory is the record. At
//! start-up it is scanned once, afterwards the set only grows as downloads
//! complete.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::download::PARTIAL_SUFFIX;

#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    names: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the set from the regular files in `raw_dir`.
    ///
    /// A missing directory yields an empty set. In-flight `.partial`
    /// downloads are not counted.
    pub fn scan(raw_dir: &Path) -> io::Result<Self> {
        let mut names = HashSet::new();

        let entries = match std::fs::read_dir(raw_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self { names }),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(PARTIAL_SUFFIX) {
                    names.insert(name.to_string());
                }
            }
        }

        debug!(dir = %raw_dir.display(), count = names.len(), "Scanned raw directory");
        Ok(Self { names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Record `name`; returns `false` if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_skips_partial_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.hdf"), b"x").unwrap();
        std::fs::write(dir.path().join("b.hdf.partial"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let seen = SeenSet::scan(dir.path()).unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("a.hdf"));
        assert!(!seen.contains("b.hdf"));
    }

    #[test]
    fn test_scan_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let seen = SeenSet::scan(&dir.path().join("absent")).unwrap();
        assert!(seen.is_empty());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut seen = SeenSet::new();
        assert!(seen.insert("a.hdf"));
        assert!(!seen.insert("a.hdf"));
        assert_eq!(seen.len(), 1);
    }
}
