//! The persisted unit of the record store.

use crate::form::FormModel;
use scribe_types::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle marker of a saved record.
///
/// A record is `Draft` when first saved and `Updated` on every later save of the same id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    Draft,
    Updated,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "Draft",
            RecordStatus::Updated => "Updated",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One saved patient assessment.
///
/// `date_created` is rewritten on every save, so it holds the last-saved date rather than
/// the date the record first appeared. The field keeps its persisted name.
///
/// Only `id` is required when reading. A missing `status` reads as `Draft`, a missing
/// `date_created` as empty, and a missing or blank `patient_name` is taken from the form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct PatientRecord {
    pub id: RecordId,
    pub patient_name: String,
    pub status: RecordStatus,
    pub date_created: String,
    pub form_data: FormModel,
}

#[derive(Deserialize)]
struct StoredRecord {
    id: RecordId,
    #[serde(default)]
    patient_name: Option<String>,
    #[serde(default)]
    status: RecordStatus,
    #[serde(default)]
    date_created: String,
    #[serde(default)]
    form_data: FormModel,
}

impl From<StoredRecord> for PatientRecord {
    fn from(stored: StoredRecord) -> Self {
        let patient_name = match stored.patient_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => stored.form_data.display_name().to_string(),
        };
        Self {
            id: stored.id,
            patient_name,
            status: stored.status,
            date_created: stored.date_created,
            form_data: stored.form_data,
        }
    }
}

impl PatientRecord {
    /// Case-insensitive substring match against the patient name or the id.
    ///
    /// `needle` must already be lowercased.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.patient_name.to_lowercase().contains(needle)
            || self.id.as_str().to_lowercase().contains(needle)
    }
}
