//! Persisted customization store.
//!
//! A versioned JSON document keyed by file path — the only state that
//! survives between runs. Lifecycle is explicit and scoped to one run:
//! [`SwizzleStore::load`] once at start, [`SwizzleStore::merge`] as
//! detections accumulate, [`SwizzleStore::flush`] once at the end. The flush
//! writes the whole document to a temporary file and renames it into place,
//! so a reader never observes a half-written store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::CustomizationRecord;
use crate::errors::SwizzleError;

/// Current on-disk schema version.
const SCHEMA_VERSION: u32 = 1;

/// The on-disk document shape.
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    schema_version: u32,
    last_sync_at: Option<DateTime<Utc>>,
    entries: BTreeMap<String, CustomizationRecord>,
}

/// In-memory handle to the persisted path→record mapping.
#[derive(Debug, Clone)]
pub struct SwizzleStore {
    path: PathBuf,
    last_sync_at: Option<DateTime<Utc>>,
    entries: BTreeMap<String, CustomizationRecord>,
}

impl SwizzleStore {
    /// Load the store from `path`. A missing file yields an empty store; a
    /// present but unreadable file is an error (silently starting over would
    /// discard the operator's customizations).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SwizzleError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no swizzle store on disk, starting empty");
            return Ok(Self {
                path: path.to_path_buf(),
                last_sync_at: None,
                entries: BTreeMap::new(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let doc: StoreDocument =
            serde_json::from_str(&contents).map_err(|e| SwizzleError::ParseError {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;

        if doc.schema_version > SCHEMA_VERSION {
            return Err(SwizzleError::UnsupportedSchema {
                found: doc.schema_version,
                supported: SCHEMA_VERSION,
            });
        }

        info!(
            path = %path.display(),
            entries = doc.entries.len(),
            "loaded swizzle store"
        );
        Ok(Self {
            path: path.to_path_buf(),
            last_sync_at: doc.last_sync_at,
            entries: doc.entries,
        })
    }

    /// An empty in-memory store writing to `path` (used when starting fresh
    /// and by tests).
    pub fn empty<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last_sync_at: None,
            entries: BTreeMap::new(),
        }
    }

    /// Look up the record for a path.
    pub fn get(&self, path: &str) -> Option<&CustomizationRecord> {
        self.entries.get(path)
    }

    /// All records, ordered by path.
    pub fn entries(&self) -> impl Iterator<Item = &CustomizationRecord> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at
    }

    /// Merge freshly detected records into the store. New entries win on
    /// path collision; unrelated existing entries are preserved.
    pub fn merge<I: IntoIterator<Item = CustomizationRecord>>(&mut self, detected: I) {
        for record in detected {
            if self.entries.contains_key(&record.path) {
                debug!(path = %record.path, "replacing swizzle entry");
            }
            self.entries.insert(record.path.clone(), record);
        }
    }

    /// Write the merged set back to disk, atomically for this run: the full
    /// document goes to a sibling temp file which is then renamed over the
    /// store path.
    pub fn flush(&mut self) -> Result<(), SwizzleError> {
        self.last_sync_at = Some(Utc::now());

        let doc = StoreDocument {
            schema_version: SCHEMA_VERSION,
            last_sync_at: self.last_sync_at,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(error = %e, "atomic rename failed, removing temp store");
            let _ = std::fs::remove_file(&tmp);
            return Err(SwizzleError::IoError(e));
        }

        info!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "flushed swizzle store"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swizzle::SwizzleEvent;

    fn record(path: &str, event: SwizzleEvent) -> CustomizationRecord {
        CustomizationRecord {
            path: path.into(),
            event,
            active: true,
            shared_ancestor_id: Some("a1".into()),
            fork_last_commit_id: Some("f1".into()),
            boilerplate_last_commit_id: "b1".into(),
            boilerplate_content_hash: "h1".into(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SwizzleStore::load(dir.path().join("swizzles.json")).unwrap();
        assert!(store.is_empty());
        assert!(store.last_sync_at().is_none());
    }

    #[test]
    fn test_flush_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swizzles.json");

        let mut store = SwizzleStore::empty(&path);
        store.merge([record("a.txt", SwizzleEvent::Edited)]);
        store.flush().unwrap();

        let reloaded = SwizzleStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("a.txt").unwrap().event, SwizzleEvent::Edited);
        assert!(reloaded.last_sync_at().is_some());
    }

    #[test]
    fn test_merge_new_wins_on_collision_others_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swizzles.json");

        let mut store = SwizzleStore::empty(&path);
        store.merge([
            record("a.txt", SwizzleEvent::Edited),
            record("b.txt", SwizzleEvent::Removed),
        ]);
        store.flush().unwrap();

        let mut store = SwizzleStore::load(&path).unwrap();
        store.merge([record("a.txt", SwizzleEvent::Removed)]);
        store.flush().unwrap();

        let final_store = SwizzleStore::load(&path).unwrap();
        assert_eq!(final_store.len(), 2);
        assert_eq!(
            final_store.get("a.txt").unwrap().event,
            SwizzleEvent::Removed,
            "new detection must replace the old record"
        );
        assert_eq!(
            final_store.get("b.txt").unwrap().event,
            SwizzleEvent::Removed,
            "unrelated entry must survive"
        );
    }

    #[test]
    fn test_write_read_write_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swizzles.json");

        let mut store = SwizzleStore::empty(&path);
        store.merge([record("a.txt", SwizzleEvent::Edited)]);
        store.flush().unwrap();

        let mut second = SwizzleStore::load(&path).unwrap();
        second.flush().unwrap();

        let third = SwizzleStore::load(&path).unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(
            third.get("a.txt").unwrap(),
            store.get("a.txt").unwrap(),
            "entries must survive a write-read-write cycle untouched"
        );
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swizzles.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = SwizzleStore::load(&path);
        assert!(matches!(result, Err(SwizzleError::ParseError { .. })));
    }

    #[test]
    fn test_future_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swizzles.json");
        std::fs::write(
            &path,
            r#"{"schema_version": 99, "last_sync_at": null, "entries": {}}"#,
        )
        .unwrap();

        let result = SwizzleStore::load(&path);
        assert!(matches!(result, Err(SwizzleError::UnsupportedSchema { found: 99, .. })));
    }
}
