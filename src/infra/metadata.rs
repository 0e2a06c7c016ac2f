//! JSON build record store
//!
//! Keeps one [`BuildRecord`] per package in
//! `<state_dir>/build-records.json`. Lookups read the snapshot taken at
//! open. Each update takes an exclusive lock on
//! `build-records.json.lock`, re-reads the file, merges the new record, and
//! replaces the file, so concurrent runs keep each other's records.

use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::defaults;
use crate::core::rebuild::{BuildRecord, MetadataStore};
use crate::error::MetadataError;

type Records = BTreeMap<String, BuildRecord>;

/// Build records backed by a JSON file
#[derive(Debug)]
pub struct JsonMetadataStore {
    path: PathBuf,
    records: Mutex<Records>,
}

impl JsonMetadataStore {
    /// Open the store in `state_dir`, creating the directory if absent
    pub fn open(state_dir: &Path) -> Result<Self, MetadataError> {
        let path = state_dir.join(defaults::BUILD_RECORDS_FILE);
        std::fs::create_dir_all(state_dir).map_err(|e| MetadataError::Write {
            path: state_dir.to_path_buf(),
            error: e.to_string(),
        })?;
        let records = read_records(&path)?;

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_err(&self, e: impl ToString) -> MetadataError {
        MetadataError::Write {
            path: self.path.clone(),
            error: e.to_string(),
        }
    }

    /// Merge `record` into the file on disk and return the merged records
    fn merge(&self, record: BuildRecord) -> Result<Records, MetadataError> {
        let lock_path = self.path.with_extension("json.lock");
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| self.write_err(e))?;
        lock.lock_exclusive().map_err(|e| self.write_err(e))?;

        let mut records = read_records(&self.path)?;
        records.insert(record.name.clone(), record);
        let content = serde_json::to_string_pretty(&records).map_err(|e| self.write_err(e))?;

        // Write to a sibling and rename so readers never see a partial file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| self.write_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.write_err(e))?;

        lock.unlock().map_err(|e| self.write_err(e))?;
        Ok(records)
    }
}

fn read_records(path: &Path) -> Result<Records, MetadataError> {
    if !path.exists() {
        return Ok(Records::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| MetadataError::Read {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| MetadataError::Parse {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

impl MetadataStore for JsonMetadataStore {
    fn lookup(&self, name: &str) -> Result<Option<BuildRecord>, MetadataError> {
        let records = self.records.lock().map_err(|e| MetadataError::Read {
            path: self.path.clone(),
            error: e.to_string(),
        })?;
        Ok(records.get(name).cloned())
    }

    fn record(&self, record: BuildRecord) -> Result<(), MetadataError> {
        let mut records = self.records.lock().map_err(|e| self.write_err(e))?;
        *records = self.merge(record)?;
        Ok(())
    }
}
