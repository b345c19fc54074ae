//! The error taxonomy shared by every engine crate.
//!
//! Every fallible operation in the core ends up as one of these kinds. The names
//! are semantic rather than HTTP-status-shaped: callers branch on `SyncErrorKind`,
//! never on an exception hierarchy (design note: typed result variants replace the
//! source's exception-based control flow).

use thiserror::Error;

/// Classification of a failure, used by the retry fabric and by callers that need
/// to decide whether to continue, retry, or surface a user-visible message.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Timeout, connection refused, 5xx, or 429. Retried by the retry fabric.
    #[error("transient failure: {0}")]
    Transient(String),

    /// 4xx (other than 429), or a feed/calendar parse failure. Counted toward a
    /// feed's failure threshold; not retried within the same cycle.
    #[error("permanent source failure: {0}")]
    PermanentSource(String),

    /// A uniqueness violation (duplicate feed name, duplicate pin). Surfaced to the
    /// caller; never retried.
    #[error("integrity conflict: {0}")]
    IntegrityConflict(String),

    /// The message or scheduled event was already gone on the chat platform.
    /// Treated as success by deletions, as a warning by edits.
    #[error("not found on chat platform: {0}")]
    NotFound(String),

    /// A geocoded coordinate fell outside the guild's configured region.
    #[error("coordinate out of bounds: {0}")]
    OutOfBounds(String),

    /// Anything else. Logged with full context; the driving periodic task
    /// continues at its next tick regardless.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether the retry fabric should retry an operation that failed this way.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Whether this failure should count against a feed's consecutive-failure
    /// threshold (§4.3, §4.4.2).
    #[must_use]
    pub const fn counts_toward_failure_threshold(&self) -> bool {
        matches!(self, Self::PermanentSource(_))
    }
}

/// `NotModified` is not an error; it is a successful short-circuit, so it is
/// represented outside `SyncError` as part of [`crate::FetchOutcome`]-shaped enums
/// in the HTTP fetcher rather than as a variant here.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_retryable() {
        assert!(SyncError::Transient("timeout".into()).is_retryable());
        assert!(!SyncError::PermanentSource("404".into()).is_retryable());
        assert!(!SyncError::Internal("oops".into()).is_retryable());
    }

    #[test]
    fn permanent_source_counts_toward_threshold() {
        assert!(SyncError::PermanentSource("parse error".into()).counts_toward_failure_threshold());
        assert!(!SyncError::Transient("timeout".into()).counts_toward_failure_threshold());
        assert!(!SyncError::NotFound("gone".into()).counts_toward_failure_threshold());
    }

    #[test]
    fn display_messages_are_human_readable() {
        let err = SyncError::OutOfBounds("52.5,13.4 not in region europe".into());
        assert_eq!(
            err.to_string(),
            "coordinate out of bounds: 52.5,13.4 not in region europe"
        );
    }
}
