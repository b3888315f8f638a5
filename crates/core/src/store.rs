//! Record store.
//!
//! The store is a flat, ordered list of [`PatientRecord`]s. Order is insertion order and a
//! save with an existing id replaces that record in place. Every mutation rewrites the whole
//! list, so a reader never observes a partially written list.
//!
//! [`FileRecordStore`] keeps the list as one JSON array on disk. It reads leniently and
//! writes strictly:
//!
//! - a missing file reads as an empty list;
//! - an array entry that does not parse as a record is skipped (with a warning) by `list`
//!   and `find`, but is carried through unchanged by `save` and `delete`;
//! - a file that is not a JSON array reads as empty, and is moved aside to
//!   `<key>.corrupt-<timestamp>.json` before the next write replaces it;
//! - a write whose serialised size exceeds the configured quota is refused with
//!   [`ScribeError::QuotaExceeded`] and the file is left as it was.

use crate::config::CoreConfig;
use crate::lab::json_kind;
use crate::record::PatientRecord;
use crate::{ScribeError, ScribeResult};
use chrono::Utc;
use scribe_types::RecordId;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// What a [`RecordStore::save`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Replaced,
}

/// Access to the persisted record list.
pub trait RecordStore {
    /// All readable records in insertion order.
    fn list(&self) -> ScribeResult<Vec<PatientRecord>>;

    /// Ids of every stored entry, including entries `list` skips as unreadable.
    fn ids(&self) -> ScribeResult<HashSet<RecordId>> {
        Ok(self.list()?.into_iter().map(|record| record.id).collect())
    }

    /// Looks a record up by id.
    fn find(&self, id: &RecordId) -> ScribeResult<Option<PatientRecord>> {
        Ok(self.list()?.into_iter().find(|record| &record.id == id))
    }

    /// Replaces the record with the same id in place, or appends it.
    fn save(&mut self, record: &PatientRecord) -> ScribeResult<SaveOutcome>;

    /// Removes the record with `id`. Returns `false` if there was none.
    fn delete(&mut self, id: &RecordId) -> ScribeResult<bool>;
}

/// File-backed record store holding a JSON array.
#[derive(Clone, Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    quota_bytes: u64,
}

/// Raw contents of the store file.
enum Blob {
    Missing,
    Entries(Vec<Value>),
    Corrupt,
}

impl FileRecordStore {
    pub fn new(path: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            path: path.into(),
            quota_bytes,
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.store_path(), cfg.quota_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_blob(&self) -> ScribeResult<Blob> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Blob::Missing),
            Err(e) => return Err(ScribeError::FileRead(e)),
        };

        if contents.trim().is_empty() {
            return Ok(Blob::Missing);
        }

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Array(entries)) => Ok(Blob::Entries(entries)),
            Ok(other) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "store holds a JSON {} instead of an array; treating it as empty",
                    json_kind(&other)
                );
                Ok(Blob::Corrupt)
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "store is not valid JSON; treating it as empty"
                );
                Ok(Blob::Corrupt)
            }
        }
    }

    /// Serialises `entries` and writes them over the store file.
    ///
    /// The quota is checked before anything on disk changes. A corrupt file is moved aside
    /// only once the replacement is known to fit.
    fn write_entries(&self, entries: &[Value], replacing_corrupt: bool) -> ScribeResult<()> {
        let bytes = serde_json::to_vec(entries).map_err(ScribeError::Serialization)?;
        let attempted = bytes.len() as u64;
        if attempted > self.quota_bytes {
            return Err(ScribeError::QuotaExceeded {
                limit: self.quota_bytes,
                attempted,
            });
        }

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(ScribeError::StorageDirCreation)?;

        if replacing_corrupt {
            self.quarantine(dir)?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(ScribeError::FileWrite)?;
        tmp.write_all(&bytes).map_err(ScribeError::FileWrite)?;
        tmp.as_file().sync_all().map_err(ScribeError::FileWrite)?;
        tmp.persist(&self.path)
            .map_err(|e| ScribeError::FileWrite(e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            records = entries.len(),
            bytes = attempted,
            "store written"
        );
        Ok(())
    }

    fn quarantine(&self, dir: &Path) -> ScribeResult<()> {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let target = dir.join(format!("{}.corrupt-{}.json", stem, stamp));

        fs::rename(&self.path, &target).map_err(|source| ScribeError::Quarantine {
            path: target.clone(),
            source,
        })?;

        tracing::warn!(
            from = %self.path.display(),
            to = %target.display(),
            "moved unreadable store aside before overwriting it"
        );
        Ok(())
    }
}

impl RecordStore for FileRecordStore {
    fn list(&self) -> ScribeResult<Vec<PatientRecord>> {
        match self.read_blob()? {
            Blob::Entries(entries) => Ok(parse_entries(entries)),
            Blob::Missing | Blob::Corrupt => Ok(Vec::new()),
        }
    }

    fn ids(&self) -> ScribeResult<HashSet<RecordId>> {
        match self.read_blob()? {
            Blob::Entries(entries) => Ok(entries.iter().filter_map(entry_id).collect()),
            Blob::Missing | Blob::Corrupt => Ok(HashSet::new()),
        }
    }

    fn save(&mut self, record: &PatientRecord) -> ScribeResult<SaveOutcome> {
        let (mut entries, corrupt) = match self.read_blob()? {
            Blob::Entries(entries) => (entries, false),
            Blob::Missing => (Vec::new(), false),
            Blob::Corrupt => (Vec::new(), true),
        };

        let value = serde_json::to_value(record).map_err(ScribeError::Serialization)?;
        let outcome = match entries.iter().position(|e| entry_has_id(e, &record.id)) {
            Some(index) => {
                entries[index] = value;
                SaveOutcome::Replaced
            }
            None => {
                entries.push(value);
                SaveOutcome::Inserted
            }
        };

        self.write_entries(&entries, corrupt)?;
        tracing::info!(id = %record.id, outcome = ?outcome, "record saved");
        Ok(outcome)
    }

    fn delete(&mut self, id: &RecordId) -> ScribeResult<bool> {
        let mut entries = match self.read_blob()? {
            Blob::Entries(entries) => entries,
            Blob::Missing | Blob::Corrupt => return Ok(false),
        };

        let before = entries.len();
        entries.retain(|e| !entry_has_id(e, id));
        if entries.len() == before {
            return Ok(false);
        }

        self.write_entries(&entries, false)?;
        tracing::info!(id = %id, "record deleted");
        Ok(true)
    }
}

/// In-memory record store with the same semantics as [`FileRecordStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryRecordStore {
    records: Vec<PatientRecord>,
    quota_bytes: Option<u64>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes whose JSON form would exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            records: Vec::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn from_records(records: Vec<PatientRecord>) -> Self {
        Self {
            records,
            quota_bytes: None,
        }
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    fn check_quota(&self, candidate: &[PatientRecord]) -> ScribeResult<()> {
        let Some(limit) = self.quota_bytes else {
            return Ok(());
        };
        let attempted = serde_json::to_vec(candidate)
            .map_err(ScribeError::Serialization)?
            .len() as u64;
        if attempted > limit {
            return Err(ScribeError::QuotaExceeded { limit, attempted });
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn list(&self) -> ScribeResult<Vec<PatientRecord>> {
        Ok(self.records.clone())
    }

    fn save(&mut self, record: &PatientRecord) -> ScribeResult<SaveOutcome> {
        let mut next = self.records.clone();
        let outcome = match next.iter().position(|r| r.id == record.id) {
            Some(index) => {
                next[index] = record.clone();
                SaveOutcome::Replaced
            }
            None => {
                next.push(record.clone());
                SaveOutcome::Inserted
            }
        };

        self.check_quota(&next)?;
        self.records = next;
        Ok(outcome)
    }

    fn delete(&mut self, id: &RecordId) -> ScribeResult<bool> {
        let before = self.records.len();
        self.records.retain(|r| &r.id != id);
        Ok(self.records.len() != before)
    }
}

fn parse_entries(entries: Vec<Value>) -> Vec<PatientRecord> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(
            |(index, entry)| match serde_json::from_value::<PatientRecord>(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping unreadable store entry");
                    None
                }
            },
        )
        .collect()
}

fn entry_id(entry: &Value) -> Option<RecordId> {
    entry
        .get("id")
        .and_then(Value::as_str)
        .and_then(|raw| RecordId::new(raw).ok())
}

fn entry_has_id(entry: &Value, id: &RecordId) -> bool {
    entry_id(entry).is_some_and(|raw| &raw == id)
}
