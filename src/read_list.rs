//! The persisted read list (`read.json`).
//!
//! Loading never fails: a missing file is an empty list, and a file that is
//! not a JSON array is reported and treated as empty. Individual entries
//! that do not carry an id are skipped.

use crate::item::ReadEntry;
use crate::json_writer::JsonStyle;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Layout of the persisted file.
pub const READ_LIST_STYLE: JsonStyle = JsonStyle::Pretty(4);

/// Entries of a previous run, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadList {
    entries: Vec<ReadEntry>,
}

impl ReadList {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No existing {:?} found. Starting fresh.", path);
                return ReadList::default();
            }
            Err(e) => {
                warn!("Could not read {:?}: {}. Starting fresh.", path, e);
                return ReadList::default();
            }
        };

        let values: Vec<Value> = match serde_json::from_str(&text) {
            Ok(values) => values,
            Err(e) => {
                warn!("Could not parse existing {:?}: {}. Starting fresh.", path, e);
                return ReadList::default();
            }
        };

        let entries: Vec<ReadEntry> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping malformed read-list entry: {}", e);
                    None
                }
            })
            .collect();
        info!("Loaded {} existing books.", entries.len());
        ReadList { entries }
    }

    pub fn from_entries(entries: Vec<ReadEntry>) -> Self {
        ReadList { entries }
    }

    pub fn entries(&self) -> &[ReadEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ReadEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers as stored, for the scraper's seen-set.
    pub fn ids(&self) -> HashSet<String> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    /// Identifiers that parse as rating-site ids, for edition filtering.
    pub fn numeric_ids(&self) -> HashSet<u64> {
        self.entries
            .iter()
            .filter_map(|entry| entry.id.trim().parse().ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;

    fn entry(id: &str) -> ReadEntry {
        ReadEntry::new(id, Some(Number::from(3)))
    }

    #[test]
    fn missing_and_corrupt_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReadList::load(dir.path().join("absent.json")).is_empty());

        let corrupt = dir.path().join("read.json");
        fs::write(&corrupt, "{not json").unwrap();
        assert!(ReadList::load(&corrupt).is_empty());

        fs::write(&corrupt, r#"{"id": "1"}"#).unwrap();
        assert!(ReadList::load(&corrupt).is_empty());
    }

    #[test]
    fn entries_without_ids_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("read.json");
        fs::write(
            &path,
            r#"[{"id": "9", "rating": 5}, {"rating": 2}, {"id": 8, "rating": null}]"#,
        )
        .unwrap();

        let list = ReadList::load(&path);
        assert_eq!(list.len(), 2);
        let expected: HashSet<String> = ["9", "8"].iter().map(|s| s.to_string()).collect();
        assert_eq!(list.ids(), expected);
        assert_eq!(list.numeric_ids(), HashSet::from([9u64, 8]));
    }

    #[test]
    fn from_entries_keeps_order() {
        let list = ReadList::from_entries(vec![entry("3"), entry("1")]);
        let ids: Vec<&str> = list.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert_eq!(list.into_entries().len(), 2);
    }
}
