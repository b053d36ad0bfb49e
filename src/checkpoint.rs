//! Persistent checkpoint of migrated record identifiers.
//!
//! Two plain-text files under the configured data directory, one
//! identifier per line:
//!
//! - `completed.out` accumulates across runs (append-only, no dedup at
//!   write time; membership, not count, is the semantic).
//! - `failed.out` reflects only the most recent run (overwritten).

use crate::error::CheckpointError;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// File holding identifiers of successfully migrated records.
pub const COMPLETED_FILE: &str = "completed.out";

/// File holding identifiers that failed in the most recent run.
pub const FAILED_FILE: &str = "failed.out";

/// Persists the completed and failed identifier sets across process
/// restarts.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    data_dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at the given data directory.
    ///
    /// The directory is created lazily on first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The base data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the completed-identifiers file.
    pub fn completed_path(&self) -> PathBuf {
        self.data_dir.join(COMPLETED_FILE)
    }

    /// Path of the failed-identifiers file.
    pub fn failed_path(&self) -> PathBuf {
        self.data_dir.join(FAILED_FILE)
    }

    /// Load the set of previously completed identifiers.
    ///
    /// An absent file reads as an empty set; any other I/O error is
    /// stage-fatal for the caller, since proceeding would risk
    /// reprocessing already-migrated records.
    pub fn load_completed(&self) -> Result<HashSet<String>, CheckpointError> {
        let path = self.completed_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no previous checkpoint");
                return Ok(HashSet::new());
            }
            Err(source) => return Err(CheckpointError::Read { path, source }),
        };

        let completed: HashSet<String> = contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();

        info!(size = completed.len(), "loaded previous completed checkpoint");
        Ok(completed)
    }

    /// Append the given identifiers to the completed file, one per line.
    ///
    /// The file grows monotonically across runs. Duplicates are harmless
    /// and are not filtered here.
    pub fn append_completed(&self, ids: &BTreeSet<String>) -> Result<(), CheckpointError> {
        let path = self.completed_path();
        self.ensure_dir(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| CheckpointError::Write {
                path: path.clone(),
                source,
            })?;

        write_lines(file, ids.iter()).map_err(|source| CheckpointError::Write { path, source })
    }

    /// Replace the failed file entirely with the current run's failures.
    ///
    /// Stale failures from a previous run are discarded once they either
    /// succeed or fail again.
    pub fn overwrite_failed(
        &self,
        failed: &BTreeMap<String, String>,
    ) -> Result<(), CheckpointError> {
        let path = self.failed_path();
        self.ensure_dir(&path)?;

        let file = File::create(&path).map_err(|source| CheckpointError::Write {
            path: path.clone(),
            source,
        })?;

        write_lines(file, failed.keys()).map_err(|source| CheckpointError::Write { path, source })
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), CheckpointError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| CheckpointError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn write_lines<'a>(file: File, lines: impl Iterator<Item = &'a String>) -> std::io::Result<()> {
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_absent_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());

        assert!(store.load_completed().unwrap().is_empty());
    }

    #[test]
    fn test_append_accumulates_across_runs() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());

        store.append_completed(&ids(&["k1", "k2"])).unwrap();
        store.append_completed(&ids(&["k2", "k3"])).unwrap();

        let completed = store.load_completed().unwrap();
        assert_eq!(completed.len(), 3);
        assert!(completed.contains("k1"));
        assert!(completed.contains("k3"));

        // No dedup at write time: k2 appears twice in the raw file.
        let raw = fs::read_to_string(store.completed_path()).unwrap();
        assert_eq!(raw.lines().filter(|l| *l == "k2").count(), 2);
    }

    #[test]
    fn test_overwrite_failed_replaces_previous_run() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());

        let mut run1 = BTreeMap::new();
        run1.insert("k1".to_string(), "content missing".to_string());
        store.overwrite_failed(&run1).unwrap();

        let mut run2 = BTreeMap::new();
        run2.insert("k2".to_string(), "timeout".to_string());
        store.overwrite_failed(&run2).unwrap();

        let raw = fs::read_to_string(store.failed_path()).unwrap();
        assert_eq!(raw, "k2\n");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("nested/data"));

        store.append_completed(&ids(&["k1"])).unwrap();

        assert!(store.completed_path().is_file());
    }

    #[test]
    fn test_ignores_blank_lines() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());

        fs::write(store.completed_path(), "k1\n\nk2\n").unwrap();

        let completed = store.load_completed().unwrap();
        assert_eq!(completed.len(), 2);
    }
}
