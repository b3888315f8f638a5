//! Form session: from an intent to a saved record.
//!
//! A session is opened with an explicit [`FormIntent`], mutated through
//! [`FormSession::form_mut`], and consumed by [`FormSession::submit`]. There is no undo; once
//! submitted the in-memory form is gone and the store holds the frozen record.

use crate::constants::RECORD_DATE_FORMAT;
use crate::form::FormModel;
use crate::handoff::FormIntent;
use crate::record::{PatientRecord, RecordStatus};
use crate::store::RecordStore;
use crate::ScribeResult;
use chrono::{DateTime, Utc};
use scribe_ids::FormIdGenerator;
use scribe_types::RecordId;

#[derive(Clone, Debug)]
pub struct FormSession {
    form: FormModel,
    edit_target: Option<RecordId>,
}

impl FormSession {
    /// A blank form that will be saved under a fresh id.
    pub fn new() -> Self {
        Self {
            form: FormModel::new(),
            edit_target: None,
        }
    }

    /// Opens a session for `intent`.
    ///
    /// An edit intent whose record no longer exists falls back to a blank form with no edit
    /// target, so the eventual submit creates a new record.
    pub fn open(store: &impl RecordStore, intent: FormIntent) -> ScribeResult<Self> {
        let id = match intent {
            FormIntent::New => return Ok(Self::new()),
            FormIntent::Edit(id) => id,
        };

        match store.find(&id)? {
            Some(record) => Ok(Self {
                form: record.form_data,
                edit_target: Some(id),
            }),
            None => {
                tracing::warn!(id = %id, "pending edit refers to a missing record; starting a new form");
                Ok(Self::new())
            }
        }
    }

    /// Opens a session on an already loaded form, keeping `edit_target` as its id.
    pub fn with_form(form: FormModel, edit_target: Option<RecordId>) -> Self {
        Self { form, edit_target }
    }

    pub fn form(&self) -> &FormModel {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormModel {
        &mut self.form
    }

    pub fn edit_target(&self) -> Option<&RecordId> {
        self.edit_target.as_ref()
    }

    /// Freezes the form into a record and saves it.
    ///
    /// The record keeps the edit target's id, or gets a fresh id derived from `now`. Its
    /// status is `Updated` when the store already holds that id and `Draft` otherwise, and
    /// `date_created` is the calendar date of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written, or if no free id can be
    /// generated.
    pub fn submit(
        self,
        store: &mut impl RecordStore,
        ids: &FormIdGenerator,
        now: DateTime<Utc>,
    ) -> ScribeResult<PatientRecord> {
        let taken = store.ids()?;

        let id = match self.edit_target {
            Some(id) => id,
            None => ids.generate(now, |candidate| taken.contains(candidate))?,
        };

        let status = if taken.contains(&id) {
            RecordStatus::Updated
        } else {
            RecordStatus::Draft
        };

        let record = PatientRecord {
            patient_name: self.form.display_name().to_string(),
            id,
            status,
            date_created: now.format(RECORD_DATE_FORMAT).to_string(),
            form_data: self.form,
        };

        store.save(&record)?;
        Ok(record)
    }
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}
