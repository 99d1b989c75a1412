//! Error types for measurement queries.

use thiserror::Error;

/// Errors returned by [`Measurement`](crate::Measurement) queries.
///
/// None of these are fatal; callers are expected to skip the current
/// reporting or cleanup cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasurementError {
    /// No bucket exists in `[from, to)`.
    #[error("no records found between {from} and {to}")]
    NotFound { from: i64, to: i64 },

    /// The range arguments are malformed.
    #[error("invalid range {from}..{to}: {reason}")]
    InvalidRange {
        from: i64,
        to: i64,
        reason: &'static str,
    },

    /// No bucket was older than the threshold.
    #[error("there were no expired records older than {before}")]
    NothingExpired { before: i64 },
}

/// Result type alias for measurement queries.
pub type Result<T> = std::result::Result<T, MeasurementError>;
