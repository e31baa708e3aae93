//! Persistence for in-progress scans and finished reports.
//!
//! Scan state and the final report live under separate keys so resuming a
//! scan and viewing the last report never interfere with each other.

use crate::results::{PageResult, ProjectRef};
use crate::scan::ScanState;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Key of the resumable scan state
pub const STATE_KEY: &str = "qa_scanner_state.json";

/// Key of the last finalized report
pub const REPORT_KEY: &str = "qa_report_data.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Finalized report: the project and every analyzed page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub project: ProjectRef,
    pub pages: Vec<PageResult>,
}

/// Durable key-value storage for scans; every save overwrites the previous value
pub trait ReportStore: Send + Sync {
    fn save_state(&self, state: &ScanState) -> Result<(), StoreError>;

    fn load_state(&self) -> Result<Option<ScanState>, StoreError>;

    fn save_report(&self, project: &ProjectRef, pages: &[PageResult]) -> Result<(), StoreError>;

    fn load_report(&self) -> Result<Option<StoredReport>, StoreError>;
}

#[derive(Serialize)]
struct ReportRef<'a> {
    project: &'a ProjectRef,
    pages: &'a [PageResult],
}

/// Stores each key as a pretty-printed JSON file in one directory
#[derive(Debug, Clone)]
pub struct FileReportStore {
    dir: PathBuf,
}

impl FileReportStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.dir.join(key);
        let tmp = self.dir.join(format!("{}.tmp", key));
        let body = serde_json::to_vec_pretty(value)?;

        // Readers never observe a half-written file
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        ::log::trace!("Wrote {}", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.dir.join(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

impl ReportStore for FileReportStore {
    fn save_state(&self, state: &ScanState) -> Result<(), StoreError> {
        self.write_json(STATE_KEY, state)
    }

    fn load_state(&self) -> Result<Option<ScanState>, StoreError> {
        self.read_json(STATE_KEY)
    }

    fn save_report(&self, project: &ProjectRef, pages: &[PageResult]) -> Result<(), StoreError> {
        self.write_json(REPORT_KEY, &ReportRef { project, pages })
    }

    fn load_report(&self) -> Result<Option<StoredReport>, StoreError> {
        self.read_json(REPORT_KEY)
    }
}

/// In-process store holding serialized JSON per key
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    entries: Mutex<HashMap<&'static str, String>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn put<T: Serialize + ?Sized>(&self, key: &'static str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?
            .insert(key, json);
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        match entries.get(key) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }
}

impl ReportStore for MemoryReportStore {
    fn save_state(&self, state: &ScanState) -> Result<(), StoreError> {
        self.put(STATE_KEY, state)
    }

    fn load_state(&self) -> Result<Option<ScanState>, StoreError> {
        self.get(STATE_KEY)
    }

    fn save_report(&self, project: &ProjectRef, pages: &[PageResult]) -> Result<(), StoreError> {
        self.put(REPORT_KEY, &ReportRef { project, pages })
    }

    fn load_report(&self) -> Result<Option<StoredReport>, StoreError> {
        self.get(REPORT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Issue;
    use crate::scan::ScanPhase;
    use tempfile::tempdir;

    fn sample_state() -> ScanState {
        let mut state = ScanState::new(ProjectRef::new("Shop", "https://beta.example.com", None));
        state.phase = ScanPhase::Scanning;
        state.selected_urls = vec!["https://beta.example.com".to_string()];
        state.results = vec![PageResult::new(
            "https://beta.example.com",
            "Home",
            vec![Issue::warning("SEO", "Missing Meta Description")],
            None,
            None,
        )];
        state
    }

    fn exercise(store: &dyn ReportStore) {
        assert!(store.load_state().unwrap().is_none());
        assert!(store.load_report().unwrap().is_none());

        let state = sample_state();
        store.save_state(&state).unwrap();
        assert_eq!(store.load_state().unwrap(), Some(state.clone()));

        // Saving a report leaves the scan state untouched
        let project = state.project.clone().unwrap();
        store.save_report(&project, &state.results).unwrap();
        let report = store.load_report().unwrap().unwrap();
        assert_eq!(report.project, project);
        assert_eq!(report.pages, state.results);
        assert_eq!(store.load_state().unwrap(), Some(state.clone()));

        let mut next = state.clone();
        next.phase = ScanPhase::Completed;
        store.save_state(&next).unwrap();
        assert_eq!(store.load_state().unwrap().unwrap().phase, ScanPhase::Completed);
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryReportStore::new());
    }

    #[test]
    fn test_file_store() {
        let dir = tempdir().unwrap();
        let store = FileReportStore::new(dir.path().join("reports")).unwrap();
        exercise(&store);

        assert!(store.dir().join(STATE_KEY).exists());
        assert!(store.dir().join(REPORT_KEY).exists());
        assert!(!store.dir().join(format!("{}.tmp", STATE_KEY)).exists());
    }

    #[test]
    fn test_report_file_layout() {
        let dir = tempdir().unwrap();
        let store = FileReportStore::new(dir.path()).unwrap();
        store
            .save_report(&ProjectRef::new("Shop", "https://beta.example.com", None), &[])
            .unwrap();

        let raw = fs::read_to_string(dir.path().join(REPORT_KEY)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["project"]["name"], "Shop");
        assert!(value["pages"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_state_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STATE_KEY), "{not json").unwrap();
        let store = FileReportStore::new(dir.path()).unwrap();

        assert!(matches!(store.load_state(), Err(StoreError::Json(_))));
    }
}
