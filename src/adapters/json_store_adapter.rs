//! Prediction store backed by a single JSON document keyed by date.
//!
//! The whole document is read on open and rewritten on every `put`.
//! Writes go to a sibling `.tmp` file which is then renamed over the target.

use crate::domain::error::PredtrackError;
use crate::domain::prediction::PredictionSet;
use crate::ports::store_port::PredictionStore;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct JsonFileStore {
    path: PathBuf,
    pretty: bool,
    sets: BTreeMap<NaiveDate, PredictionSet>,
}

impl JsonFileStore {
    /// Load the document at `path`. A missing file is an empty store; a file
    /// that fails to parse is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PredtrackError> {
        let path = path.as_ref().to_path_buf();
        let sets = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| PredtrackError::StoreCorrupt {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!("opened {} with {} dates", path.display(), sets.len());
        Ok(Self {
            path,
            pretty: true,
            sets,
        })
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), PredtrackError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(&self.sets)
        } else {
            serde_json::to_string(&self.sets)
        }
        .map_err(|e| PredtrackError::Store {
            reason: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            PredtrackError::Store {
                reason: format!("atomic rename to {} failed: {e}", self.path.display()),
            }
        })
    }
}

impl PredictionStore for JsonFileStore {
    fn get(&self, date: NaiveDate) -> Result<Option<PredictionSet>, PredtrackError> {
        Ok(self.sets.get(&date).cloned())
    }

    fn put(&mut self, set: &PredictionSet) -> Result<(), PredtrackError> {
        self.sets.insert(set.reference_date, set.clone());
        self.save()
    }

    fn all_dates(&self) -> Result<Vec<NaiveDate>, PredtrackError> {
        Ok(self.sets.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prediction::{Direction, Horizon, PredictionRecord, PriceTarget};
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record() -> PredictionRecord {
        PredictionRecord::new("2330", "台積電", d(2025, 10, 14), Direction::Up)
            .with_target(PriceTarget::new(600.0, 610.0).unwrap())
            .with_prev_close(590.0)
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("predictions.json")).unwrap();
        assert!(store.all_dates().unwrap().is_empty());
    }

    #[test]
    fn put_persists_and_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("predictions.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        let set = store.upsert(d(2025, 10, 14), vec![record()]).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get(d(2025, 10, 14)).unwrap(), Some(set));
    }

    #[test]
    fn document_is_keyed_by_date_with_horizon_labels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.json");
        let mut store = JsonFileStore::open(&path).unwrap().with_pretty(false);
        store.upsert(d(2025, 10, 14), vec![record()]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let set = &value["2025-10-14"];
        assert_eq!(set["predictions"][0]["symbol"], "2330");
        assert_eq!(set["predictions"][0]["verification"]["T+1"]["result"], "pending");
        assert_eq!(set["summary"]["T+5"]["total"], 1);
        assert!(!raw.contains('\n'));
    }

    #[test]
    fn upsert_replaces_existing_date() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("p.json")).unwrap();
        store.upsert(d(2025, 10, 14), vec![record(), record()]).unwrap();
        store.upsert(d(2025, 10, 14), vec![record()]).unwrap();

        let set = store.get(d(2025, 10, 14)).unwrap().unwrap();
        assert_eq!(set.predictions.len(), 1);
        assert_eq!(set.summary[&Horizon::T0].total, 1);
    }

    #[test]
    fn dates_are_ascending() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open(dir.path().join("p.json")).unwrap();
        store.upsert(d(2025, 10, 15), vec![]).unwrap();
        store.upsert(d(2025, 10, 13), vec![]).unwrap();
        assert_eq!(store.all_dates().unwrap(), vec![d(2025, 10, 13), d(2025, 10, 15)]);
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::open(&path).err().unwrap();
        assert!(matches!(err, PredtrackError::StoreCorrupt { .. }));
        // file left untouched
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
