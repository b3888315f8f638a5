//! Edit-session handoff.
//!
//! The handoff is a single transient slot holding at most one pending-edit id. The list
//! surface fills it when the user asks to edit a record; the form surface consumes it
//! through [`FormIntent::take`] and from then on works from the explicit intent rather than
//! from the slot.
//!
//! The slot lives apart from the record store. [`FileHandoff`] keeps it in the session
//! directory, which is expected to be cleared when the user's login session ends.

use crate::config::CoreConfig;
use crate::{ScribeError, ScribeResult};
use scribe_types::RecordId;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub trait EditHandoff {
    fn set_pending_edit(&mut self, id: &RecordId) -> ScribeResult<()>;
    fn clear_pending_edit(&mut self) -> ScribeResult<()>;
    fn pending_edit(&self) -> ScribeResult<Option<RecordId>>;
}

/// Which record, if any, a form session starts from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormIntent {
    New,
    Edit(RecordId),
}

impl FormIntent {
    /// Consumes the pending edit, leaving the slot empty.
    pub fn take(handoff: &mut impl EditHandoff) -> ScribeResult<Self> {
        let pending = handoff.pending_edit()?;
        handoff.clear_pending_edit()?;
        Ok(match pending {
            Some(id) => FormIntent::Edit(id),
            None => FormIntent::New,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryHandoff {
    pending: Option<RecordId>,
}

impl MemoryHandoff {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EditHandoff for MemoryHandoff {
    fn set_pending_edit(&mut self, id: &RecordId) -> ScribeResult<()> {
        self.pending = Some(id.clone());
        Ok(())
    }

    fn clear_pending_edit(&mut self) -> ScribeResult<()> {
        self.pending = None;
        Ok(())
    }

    fn pending_edit(&self) -> ScribeResult<Option<RecordId>> {
        Ok(self.pending.clone())
    }
}

/// Handoff slot stored as a bare id string in a file.
#[derive(Clone, Debug)]
pub struct FileHandoff {
    path: PathBuf,
}

impl FileHandoff {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.pending_edit_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EditHandoff for FileHandoff {
    fn set_pending_edit(&mut self, id: &RecordId) -> ScribeResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(ScribeError::StorageDirCreation)?;
        }
        fs::write(&self.path, id.as_str()).map_err(ScribeError::FileWrite)?;
        tracing::debug!(id = %id, "pending edit set");
        Ok(())
    }

    fn clear_pending_edit(&mut self) -> ScribeResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ScribeError::FileWrite(e)),
        }
    }

    fn pending_edit(&self) -> ScribeResult<Option<RecordId>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ScribeError::FileRead(e)),
        };
        // An empty slot file means no pending edit.
        Ok(RecordId::new(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(raw: &str) -> RecordId {
        RecordId::new(raw).unwrap()
    }

    fn exercise_handoff(handoff: &mut impl EditHandoff) {
        assert_eq!(handoff.pending_edit().unwrap(), None);

        handoff.set_pending_edit(&id("F1")).unwrap();
        handoff.set_pending_edit(&id("F2")).unwrap();
        assert_eq!(handoff.pending_edit().unwrap(), Some(id("F2")));

        handoff.clear_pending_edit().unwrap();
        assert_eq!(handoff.pending_edit().unwrap(), None);
        handoff.clear_pending_edit().unwrap();
    }

    #[test]
    fn test_memory_handoff_holds_one_id() {
        exercise_handoff(&mut MemoryHandoff::new());
    }

    #[test]
    fn test_file_handoff_holds_one_id() {
        let dir = TempDir::new().unwrap();
        let mut handoff = FileHandoff::new(dir.path().join("session/editFormId"));
        exercise_handoff(&mut handoff);
    }

    #[test]
    fn test_file_handoff_stores_bare_id() {
        let dir = TempDir::new().unwrap();
        let mut handoff = FileHandoff::new(dir.path().join("editFormId"));
        handoff.set_pending_edit(&id("F123456")).unwrap();
        assert_eq!(fs::read_to_string(handoff.path()).unwrap(), "F123456");
    }

    #[test]
    fn test_blank_slot_file_is_no_pending_edit() {
        let dir = TempDir::new().unwrap();
        let handoff = FileHandoff::new(dir.path().join("editFormId"));
        fs::write(handoff.path(), "  \n").unwrap();
        assert_eq!(handoff.pending_edit().unwrap(), None);
    }

    #[test]
    fn test_take_consumes_the_slot() {
        let mut handoff = MemoryHandoff::new();
        assert_eq!(FormIntent::take(&mut handoff).unwrap(), FormIntent::New);

        handoff.set_pending_edit(&id("F7")).unwrap();
        assert_eq!(
            FormIntent::take(&mut handoff).unwrap(),
            FormIntent::Edit(id("F7"))
        );
        assert_eq!(FormIntent::take(&mut handoff).unwrap(), FormIntent::New);
    }
}
