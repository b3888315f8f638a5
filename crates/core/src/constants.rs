//! Constants used throughout the scribe core crate.

/// Default store key; the store file is `<data_dir>/<store_key>.json`.
pub const DEFAULT_STORE_KEY: &str = "hivForms";

/// Name of the session-scoped file that holds a pending edit id.
pub const PENDING_EDIT_FILENAME: &str = "editFormId";

/// Directory name used under the platform data/runtime directories.
pub const APP_DIR_NAME: &str = "hiv-scribe";

/// Default upper bound on the serialised store, matching the browser local-storage budget.
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Extension of the store file.
pub const STORE_FILE_EXTENSION: &str = "json";

/// Display name stored for a record whose form has no patient name.
pub const UNNAMED_PATIENT: &str = "Unnamed";

/// Rendered in reports for empty scalars and empty multi-selects.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Rendered in the lab table for empty cells.
pub const EMPTY_CELL: &str = "-";

/// Date format of `PatientRecord::date_created`.
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%d";
