//! Timestamp-derived record id generator.

use crate::{IdError, IdResult};
use chrono::{DateTime, Duration, Utc};
use scribe_types::RecordId;

/// Generates `F`-prefixed record ids from a creation instant.
///
/// The generator holds no clock of its own; callers pass `now` so that tests can pin the
/// instant. Uniqueness is only guaranteed against the `is_taken` predicate supplied on
/// each call, which should reflect the store the record is about to be written to.
#[derive(Clone, Copy, Debug)]
pub struct FormIdGenerator {
    max_attempts: u32,
}

impl Default for FormIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FormIdGenerator {
    /// Prefix carried by every generated id.
    pub const PREFIX: &'static str = "F";

    /// Number of trailing millisecond digits kept in an id.
    const DIGITS_MODULUS: i64 = 1_000_000;

    /// One full second of candidates before giving up.
    const DEFAULT_MAX_ATTEMPTS: u32 = 1_000;

    pub fn new() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Returns the id that a record created at `at` would receive, ignoring clashes.
    pub fn id_for_instant(at: DateTime<Utc>) -> RecordId {
        let suffix = at.timestamp_millis().rem_euclid(Self::DIGITS_MODULUS);
        // The formatted value always starts with PREFIX, so it is never empty.
        RecordId::new(format!("{}{:06}", Self::PREFIX, suffix))
            .expect("generated record id is never empty")
    }

    /// Generates an id for a record created at `now` that `is_taken` does not report as used.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Exhausted`] if every candidate in the attempt window is taken.
    pub fn generate(
        &self,
        now: DateTime<Utc>,
        is_taken: impl Fn(&RecordId) -> bool,
    ) -> IdResult<RecordId> {
        let mut instant = now;
        for _ in 0..self.max_attempts {
            let candidate = Self::id_for_instant(instant);
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
            instant = instant + Duration::milliseconds(1);
        }

        Err(IdError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}
