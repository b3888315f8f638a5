//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the store and
//! handoff services. Nothing in the core reads environment variables while handling a
//! command; the binary does that before constructing a [`CoreConfig`].

use crate::constants::{
    APP_DIR_NAME, DEFAULT_QUOTA_BYTES, DEFAULT_STORE_KEY, PENDING_EDIT_FILENAME,
    STORE_FILE_EXTENSION,
};
use crate::{ScribeError, ScribeResult};
use scribe_types::NonEmptyText;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    store_key: NonEmptyText,
    session_dir: PathBuf,
    quota_bytes: u64,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ScribeError::InvalidInput` if `store_key` is not usable as a file stem or
    /// `quota_bytes` is zero.
    pub fn new(
        data_dir: PathBuf,
        store_key: &str,
        session_dir: PathBuf,
        quota_bytes: u64,
    ) -> ScribeResult<Self> {
        validate_store_key(store_key)?;
        if quota_bytes == 0 {
            return Err(ScribeError::InvalidInput(
                "quota_bytes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_dir,
            store_key: NonEmptyText::new(store_key)?,
            session_dir,
            quota_bytes,
        })
    }

    /// Configuration rooted at the platform default directories.
    pub fn with_defaults() -> ScribeResult<Self> {
        Self::new(
            default_data_dir(),
            DEFAULT_STORE_KEY,
            default_session_dir(),
            DEFAULT_QUOTA_BYTES,
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_key(&self) -> &str {
        self.store_key.as_str()
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    /// Path of the JSON file holding the record list.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", self.store_key, STORE_FILE_EXTENSION))
    }

    /// Path of the session-scoped pending edit slot.
    pub fn pending_edit_path(&self) -> PathBuf {
        self.session_dir.join(PENDING_EDIT_FILENAME)
    }
}

/// `<platform local data dir>/hiv-scribe`, or `./hiv-scribe` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// `<runtime dir>/hiv-scribe`, falling back to the OS temp directory.
///
/// The runtime directory is cleared when the user's login session ends, which is the
/// lifetime a pending edit should have.
pub fn default_session_dir() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

/// Parse the quota from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default quota.
pub fn quota_bytes_from_env_value(value: Option<String>) -> ScribeResult<u64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_QUOTA_BYTES),
        Some(v) => v
            .parse::<u64>()
            .map_err(|e| ScribeError::InvalidInput(format!("invalid quota '{}': {}", v, e))),
    }
}

/// Validates that a store key is safe to use as a file stem.
///
/// - Rejects empty or whitespace-only strings
/// - Bounds the length
/// - Restricts characters to ASCII alphanumerics, `.`, `-` and `_`, and rejects keys made
///   only of dots
pub fn validate_store_key(key: &str) -> ScribeResult<()> {
    const MAX_KEY_LEN: usize = 64;

    if key.trim().is_empty() {
        return Err(ScribeError::InvalidInput("store key cannot be empty".into()));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(ScribeError::InvalidInput(format!(
            "store key exceeds maximum length of {} characters",
            MAX_KEY_LEN
        )));
    }

    let ok = key
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok || key.bytes().all(|b| b == b'.') {
        return Err(ScribeError::InvalidInput(
            "store key contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_path_uses_key_as_stem() {
        let cfg = CoreConfig::new(
            PathBuf::from("/data"),
            "hivForms",
            PathBuf::from("/run/scribe"),
            1024,
        )
        .unwrap();

        assert_eq!(cfg.store_path(), PathBuf::from("/data/hivForms.json"));
        assert_eq!(
            cfg.pending_edit_path(),
            PathBuf::from("/run/scribe/editFormId")
        );
    }

    #[test]
    fn test_rejects_path_like_store_keys() {
        for key in ["", "   ", "../escape", "a/b", "..", "white space"] {
            assert!(validate_store_key(key).is_err(), "key {:?} should fail", key);
        }
    }

    #[test]
    fn test_accepts_plain_store_keys() {
        for key in ["hivForms", "clinic-2.backup", "forms_v1"] {
            assert!(validate_store_key(key).is_ok(), "key {:?} should pass", key);
        }
    }

    #[test]
    fn test_zero_quota_rejected() {
        let err = CoreConfig::new(PathBuf::from("/d"), "k", PathBuf::from("/s"), 0)
            .expect_err("zero quota should fail");
        assert!(matches!(err, ScribeError::InvalidInput(_)));
    }

    #[test]
    fn test_quota_from_env_value() {
        assert_eq!(quota_bytes_from_env_value(None).unwrap(), DEFAULT_QUOTA_BYTES);
        assert_eq!(
            quota_bytes_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_QUOTA_BYTES
        );
        assert_eq!(quota_bytes_from_env_value(Some("2048".into())).unwrap(), 2048);
        assert!(quota_bytes_from_env_value(Some("lots".into())).is_err());
    }
}
