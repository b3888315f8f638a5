//! Record id generation.
//!
//! A new record is identified by a short, human-typable id derived from the moment it was
//! first saved:
//!
//! ```text
//! F<last six digits of the Unix time in milliseconds>
//! ```
//!
//! Example: a record first saved at `1_760_612_345_678` ms gets `F345678`.
//!
//! Six digits wrap every 1000 seconds, so the generator is handed a predicate telling it
//! which ids already exist in the store. On a clash it steps the instant forward one
//! millisecond at a time until it finds a free id or runs out of attempts.
//!
//! Editing a record never calls into this crate: the existing id is reused.

mod generator;

pub use generator::FormIdGenerator;
pub use scribe_types::RecordId;

/// Error type for id generation.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Every candidate in the search window was already taken.
    #[error("no free record id after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Result type for id generation.
pub type IdResult<T> = Result<T, IdError>;
