//! Whole-store snapshot documents.
//!
//! Each store is written as one JSON document, fully overwritten on every
//! persist and read once on startup.

use crate::{
    collector::CollectorStats,
    errors::MemoryError,
    learner::LearnerStats,
    model::{FailureRecord, Pattern},
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const ERROR_HISTORY_FILE: &str = "error-history.json";
pub const PATTERN_STORE_FILE: &str = "patterns.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorHistoryDocument {
    pub errors: Vec<FailureRecord>,
    #[serde(default)]
    pub stats: CollectorStats,
    pub saved_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatternStoreDocument {
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub stats: LearnerStats,
    pub saved_at: DateTime<Utc>,
}

/// Read a document; `Ok(None)` when the file is missing or empty.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, MemoryError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Write a document through a sibling temp file renamed over `path`, so a
/// reader sees either the previous document or the new one.
pub fn save<T: Serialize>(path: &Path, document: &T) -> Result<(), MemoryError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let json = serde_json::to_vec_pretty(document)?;
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(&json)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| MemoryError::Io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::ErrorCategory;

    #[test]
    fn missing_and_empty_files_load_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.json");
        assert!(load::<ErrorHistoryDocument>(&missing).expect("load").is_none());

        let empty = dir.path().join("empty.json");
        fs::write(&empty, "  \n").expect("write");
        assert!(load::<ErrorHistoryDocument>(&empty).expect("load").is_none());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(ERROR_HISTORY_FILE);
        fs::write(&path, "{not json").expect("write");
        let err = load::<ErrorHistoryDocument>(&path).unwrap_err();
        assert!(matches!(err, MemoryError::Malformed(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn saves_into_nested_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/deeper").join(ERROR_HISTORY_FILE);
        let document = ErrorHistoryDocument {
            errors: vec![FailureRecord::new(
                "click",
                ErrorCategory::SelectorNotFound,
                "Element not found: #a",
            )],
            stats: CollectorStats::default(),
            saved_at: Utc::now(),
        };
        save(&path, &document).expect("save");
        let loaded: ErrorHistoryDocument = load(&path).expect("load").expect("document");
        assert_eq!(loaded.errors, document.errors);
    }

    #[test]
    fn save_replaces_whole_document_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(PATTERN_STORE_FILE);
        fs::write(&path, "{\"patterns\": [").expect("write");

        let document = PatternStoreDocument {
            patterns: Vec::new(),
            stats: LearnerStats::default(),
            saved_at: Utc::now(),
        };
        save(&path, &document).expect("save");

        let loaded: PatternStoreDocument = load(&path).expect("load").expect("document");
        assert!(loaded.patterns.is_empty());
        let entries: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(PATTERN_STORE_FILE)]);
    }
}
