//! Result and error types for callspy.

use thiserror::Error;

/// Result type for spy operations
pub type SpyResult<T> = Result<T, SpyError>;

/// Errors raised by the spy's own API.
///
/// Failures of the wrapped target never appear here: a panicking target
/// unwinds through the spy and an `Err` from [`crate::Spy::try_call`] is
/// handed back untouched.
#[derive(Debug, Error)]
pub enum SpyError {
    /// The supplied target cannot be invoked
    #[error("Invalid spy target: {reason}")]
    InvalidTarget {
        /// Why the target was rejected
        reason: String,
    },

    /// `last_call()` was asked for before any call completed
    #[error("{} hasn't been called", .spy.as_deref().unwrap_or("Spy"))]
    NoCallsRecorded {
        /// Configured spy name, if any
        spy: Option<String>,
    },

    /// JSON export error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpyError {
    /// Build an `InvalidTarget` error
    pub fn invalid_target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }
}
