//! # Scribe Core
//!
//! Core logic for the HIV/TB patient assessment scribe.
//!
//! This crate contains pure data operations over local storage:
//! - the assessment form model, its field catalogue and lab-test rows
//! - the flat record store (`FileRecordStore`, `MemoryRecordStore`)
//! - the edit handoff and form sessions that turn forms into saved records
//! - the list/search view model and the printable report renderer
//!
//! **No terminal concerns**: prompting, argument parsing and output formatting belong in
//! `scribe-cli`.

pub mod catalogue;
pub mod config;
pub mod constants;
pub mod error;
pub mod form;
pub mod handoff;
pub mod lab;
pub mod print;
pub mod record;
pub mod report;
pub mod search;
pub mod session;
pub mod store;
pub mod validation;

pub use config::CoreConfig;
pub use error::{ScribeError, ScribeResult};
pub use form::{FieldValue, FormModel};
pub use handoff::{EditHandoff, FileHandoff, FormIntent, MemoryHandoff};
pub use lab::{LabParameter, LabTestRow, LabValue};
pub use print::{HtmlFileSurface, PrintSurface, WriterSurface};
pub use record::{PatientRecord, RecordStatus};
pub use report::ReportRenderer;
pub use search::{filter, DeleteOutcome, ListView, Statistics};
pub use session::FormSession;
pub use store::{FileRecordStore, MemoryRecordStore, RecordStore, SaveOutcome};
pub use validation::{validate, ValidationIssue};

pub use scribe_ids::FormIdGenerator;
pub use scribe_types::{NonEmptyText, RecordId};
