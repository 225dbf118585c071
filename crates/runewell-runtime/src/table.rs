//! Provider data tables with atomic wholesale replacement.
//!
//! A [`DataTable`] holds a versioned, immutable snapshot of records. Reload
//! builds the complete replacement in a scratch map and publishes it with a
//! single atomic reference swap, so readers invoked from latency-sensitive
//! game-event callbacks never lock and never observe a partially built table:
//! every read sees either the fully-old or the fully-new snapshot.

use crate::error::{RuntimeError, RuntimeResult};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// One immutable published table state.
#[derive(Debug)]
pub struct TableSnapshot<R> {
    version: u64,
    records: HashMap<String, R>,
}

impl<R> TableSnapshot<R> {
    /// Monotonic version of this snapshot; 0 is the empty initial table.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Look up a record by key.
    pub fn get(&self, key: &str) -> Option<&R> {
        self.records.get(key)
    }

    /// Whether a record with the key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over record keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|k| k.as_str())
    }

    /// Iterate over key/record pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Result of a completed reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadOutcome {
    /// Version of the newly published snapshot.
    pub version: u64,
    /// Records loaded into the new snapshot.
    pub loaded: usize,
    /// Malformed source records skipped.
    pub skipped: usize,
}

/// A provider-owned, atomically reloadable record collection.
pub struct DataTable<R> {
    current: ArcSwap<TableSnapshot<R>>,
}

impl<R> Default for DataTable<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R> DataTable<R> {
    /// Create an empty table at version 0.
    pub fn empty() -> Self {
        Self {
            current: ArcSwap::from_pointee(TableSnapshot {
                version: 0,
                records: HashMap::new(),
            }),
        }
    }

    /// The currently published snapshot.
    ///
    /// Cheap and lock-free; hold the `Arc` for a consistent view across
    /// multiple lookups.
    pub fn snapshot(&self) -> Arc<TableSnapshot<R>> {
        self.current.load_full()
    }

    /// Version of the currently published snapshot.
    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Publish a fully built replacement table in one atomic swap.
    pub fn replace(&self, records: HashMap<String, R>) -> u64 {
        let version = self.current.load().version + 1;
        self.current.store(Arc::new(TableSnapshot { version, records }));
        version
    }

    /// Rebuild the table from per-record results.
    ///
    /// Malformed records (`Err`) are skipped with a warning and the rest
    /// still load. The replacement is published only after the whole scratch
    /// map is built.
    pub fn reload_with<E: Display>(
        &self,
        source: impl IntoIterator<Item = std::result::Result<(String, R), E>>,
    ) -> ReloadOutcome {
        let mut scratch = HashMap::new();
        let mut skipped = 0usize;

        for record in source {
            match record {
                Ok((key, value)) => {
                    scratch.insert(key, value);
                }
                Err(e) => {
                    warn!("skipping malformed record: {}", e);
                    skipped += 1;
                }
            }
        }

        let loaded = scratch.len();
        let version = self.replace(scratch);
        ReloadOutcome {
            version,
            loaded,
            skipped,
        }
    }

    /// Rebuild the table from a JSON file holding an array of records.
    ///
    /// `parse` maps each array element to a keyed record or a description of
    /// why it is malformed. A total failure (missing file, unreadable JSON,
    /// or a non-array document) returns an error and leaves the previous
    /// snapshot published.
    pub fn reload_from_json_file(
        &self,
        path: &Path,
        parse: impl Fn(&serde_json::Value) -> std::result::Result<(String, R), String>,
    ) -> RuntimeResult<ReloadOutcome> {
        let content = std::fs::read_to_string(path)?;
        let document: serde_json::Value = serde_json::from_str(&content)?;

        let records = document.as_array().ok_or_else(|| {
            RuntimeError::ReloadFailed(format!("{}: expected a JSON array of records", path.display()))
        })?;

        let outcome = self.reload_with(records.iter().map(|value| parse(value)));
        info!(
            "reloaded {} records from {:?} (v{}, {} skipped)",
            outcome.loaded, path, outcome.version, outcome.skipped
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_empty_table() {
        let table: DataTable<u32> = DataTable::empty();
        assert_eq!(table.version(), 0);
        assert!(table.snapshot().is_empty());
    }

    #[test]
    fn test_replace_bumps_version() {
        let table: DataTable<u32> = DataTable::empty();
        let mut records = HashMap::new();
        records.insert("a".to_string(), 1);

        assert_eq!(table.replace(records), 1);
        let snapshot = table.snapshot();
        assert_eq!(snapshot.version(), 1);
        assert_eq!(snapshot.get("a"), Some(&1));
    }

    #[test]
    fn test_reload_skips_malformed() {
        let table: DataTable<u32> = DataTable::empty();
        let source: Vec<Result<(String, u32), String>> = vec![
            Ok(("a".to_string(), 1)),
            Err("missing field 'weight'".to_string()),
            Ok(("b".to_string(), 2)),
        ];

        let outcome = table.reload_with(source);
        assert_eq!(outcome.loaded, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(table.snapshot().len(), 2);
    }

    #[test]
    fn test_old_snapshot_stays_consistent_after_reload() {
        let table: DataTable<u32> = DataTable::empty();
        let mut first = HashMap::new();
        first.insert("a".to_string(), 1);
        table.replace(first);

        let held = table.snapshot();

        let mut second = HashMap::new();
        second.insert("a".to_string(), 2);
        table.replace(second);

        // A reader that grabbed the old snapshot keeps the old view.
        assert_eq!(held.get("a"), Some(&1));
        assert_eq!(table.snapshot().get("a"), Some(&2));
    }

    #[test]
    fn test_json_reload_total_failure_retains_previous() {
        let table: DataTable<u32> = DataTable::empty();
        let mut records = HashMap::new();
        records.insert("keep".to_string(), 7);
        table.replace(records);

        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.json");
        let result = table.reload_from_json_file(&missing, |_| Err("unused".to_string()));
        assert!(result.is_err());
        assert_eq!(table.snapshot().get("keep"), Some(&7));
        assert_eq!(table.version(), 1);

        let not_array = temp.path().join("object.json");
        let mut file = std::fs::File::create(&not_array).unwrap();
        file.write_all(b"{\"not\": \"an array\"}").unwrap();
        assert!(table
            .reload_from_json_file(&not_array, |_| Err("unused".to_string()))
            .is_err());
        assert_eq!(table.version(), 1);
    }

    #[test]
    fn test_json_reload_from_file() {
        let table: DataTable<u64> = DataTable::empty();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "value": 1}, {"id": "b"}, {"id": "c", "value": 3}]"#,
        )
        .unwrap();

        let outcome = table
            .reload_from_json_file(&path, |value| {
                let id = value["id"].as_str().ok_or("missing 'id'")?.to_string();
                let n = value["value"].as_u64().ok_or("missing 'value'")?;
                Ok((id, n))
            })
            .unwrap();

        assert_eq!(outcome.loaded, 2);
        assert_eq!(outcome.skipped, 1);
        assert!(table.snapshot().contains("a"));
        assert!(!table.snapshot().contains("b"));
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let table: Arc<DataTable<u64>> = Arc::new(DataTable::empty());
        let mut initial = HashMap::new();
        initial.insert("a".to_string(), 0);
        initial.insert("b".to_string(), 0);
        table.replace(initial);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let table = Arc::clone(&table);
            handles.push(std::thread::spawn(move || {
                for _ in 0..2000 {
                    let snapshot = table.snapshot();
                    let a = *snapshot.get("a").unwrap();
                    let b = *snapshot.get("b").unwrap();
                    // Both keys always belong to the same published state.
                    assert_eq!(a, b);
                }
            }));
        }

        let writer = {
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                for i in 1..=200u64 {
                    let mut records = HashMap::new();
                    records.insert("a".to_string(), i);
                    records.insert("b".to_string(), i);
                    table.replace(records);
                }
            })
        };

        writer.join().unwrap();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(table.snapshot().get("a"), table.snapshot().get("b"));
    }
}
