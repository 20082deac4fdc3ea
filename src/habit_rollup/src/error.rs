//! Error taxonomy for rollup calls.

use chrono::{DateTime, Utc};

use crate::habit::HabitId;

/// Errors returned by the calendar, the rollup engine, and the rollup service.
///
/// None of these are retried inside the crate; the engine performs no I/O.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RollupError {
    /// The habit does not exist in the store.
    #[error("habit {habit_id} not found")]
    NotFound {
        /// Identifier that was looked up.
        habit_id: HabitId,
    },

    /// Invalid period parameters (e.g. a rolling habit without a positive length).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The effective timezone is missing or is not a known IANA identifier.
    #[error("timezone error: {0}")]
    Timezone(String),

    /// The requested range is reversed or reaches outside the representable calendar.
    #[error("invalid range: {start} .. {end}")]
    InvalidRange {
        /// Requested (or computed) range start.
        start: DateTime<Utc>,
        /// Requested (or computed) range end.
        end: DateTime<Utc>,
    },

    /// The storage collaborator failed for a reason other than a missing habit.
    #[error("store error: {0}")]
    Store(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RollupError>;
