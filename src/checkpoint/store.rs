//! Run storage
//!
//! Saves and loads are all-or-nothing: a load either returns a validated
//! record or an error, never a partially read one.

#[cfg(feature = "checkpoint")]
use std::fs::{self, File};
#[cfg(feature = "checkpoint")]
use std::io::{BufWriter, Write};
#[cfg(feature = "checkpoint")]
use std::path::{Path, PathBuf};

use super::state::{PersistedRun, RUN_RECORD_VERSION};
use crate::error::StorageError;
use crate::idea::RunId;

/// Storage backend for run records
pub trait RunStore {
    /// Persist a run, replacing any earlier record with the same id
    fn save(&self, run: &PersistedRun) -> Result<(), StorageError>;

    /// Load and validate a run
    fn load(&self, run_id: RunId) -> Result<PersistedRun, StorageError>;
}

/// Serialize a run to pretty JSON
pub fn to_json(run: &PersistedRun) -> Result<String, StorageError> {
    serde_json::to_string_pretty(run).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Parse and validate a run record
///
/// The version field is checked before the body is decoded.
pub fn from_json(json: &str) -> Result<PersistedRun, StorageError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| StorageError::Deserialization(e.to_string()))?;

    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| StorageError::Deserialization("missing record version".to_string()))?;
    let version = u32::try_from(version).unwrap_or(u32::MAX);
    if version > RUN_RECORD_VERSION {
        return Err(StorageError::VersionTooNew(version));
    }

    let run: PersistedRun =
        serde_json::from_value(value).map_err(|e| StorageError::Deserialization(e.to_string()))?;
    run.validate()?;
    Ok(run)
}

/// Directory of `<run_id>.json` files
#[cfg(feature = "checkpoint")]
#[derive(Clone, Debug)]
pub struct FileRunStore {
    directory: PathBuf,
}

#[cfg(feature = "checkpoint")]
impl FileRunStore {
    /// Store rooted at `directory`, created on first save
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File holding a run
    pub fn path_for(&self, run_id: RunId) -> PathBuf {
        self.directory.join(format!("{run_id}.json"))
    }

    /// Ids of every stored run, sorted
    pub fn list(&self) -> Result<Vec<RunId>, StorageError> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<RunId> = fs::read_dir(&self.directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                uuid::Uuid::parse_str(stem).ok().map(RunId)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(feature = "checkpoint")]
fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

#[cfg(feature = "checkpoint")]
impl RunStore for FileRunStore {
    /// Write to a temporary file, then rename over the old record
    ///
    /// A failed save leaves the previous record untouched.
    fn save(&self, run: &PersistedRun) -> Result<(), StorageError> {
        fs::create_dir_all(&self.directory)?;

        let path = self.path_for(run.run_id());
        let tmp = path.with_extension("json.tmp");
        let json = to_json(run)?;

        if let Err(err) = write_synced(&tmp, json.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        fs::rename(&tmp, &path)?;

        tracing::debug!(run_id = %run.run_id(), path = %path.display(), "Run saved");
        Ok(())
    }

    fn load(&self, run_id: RunId) -> Result<PersistedRun, StorageError> {
        let path = self.path_for(run_id);
        if !path.exists() {
            return Err(StorageError::NotFound(run_id.to_string()));
        }

        let json = fs::read_to_string(&path)?;
        let run = from_json(&json)?;
        tracing::debug!(run_id = %run_id, events = run.events.len(), "Run loaded");
        Ok(run)
    }
}
