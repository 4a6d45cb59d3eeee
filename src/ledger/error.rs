//! Error types for the attendance ledger.

use thiserror::Error;

use crate::ledger::types::{CourseId, Identity};

/// Precondition failures raised by ledger operations.
///
/// Every variant is raised before any state is touched, so a failed
/// operation never leaves a partial write, event, or counter advance behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Caller {caller} is not authorized for this operation")]
    Unauthorized { caller: Identity },

    #[error("Course {course_id} is not active")]
    CourseInactive { course_id: CourseId },

    #[error("Length mismatch: {students} students, {flags} presence flags")]
    LengthMismatch { students: usize, flags: usize },

    #[error("Batch must contain at least one student")]
    EmptyBatch,

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl LedgerError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        LedgerError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Errors raised while restoring ledger state from a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to decode snapshot: {0}")]
    DecodeError(String),

    #[error("Event log digest chain broken at sequence {sequence}")]
    BrokenChain { sequence: u64 },

    #[error("Course counter {next_course_id} does not cover course {course_id}")]
    CounterRegression {
        next_course_id: CourseId,
        course_id: CourseId,
    },
}

impl From<scale::Error> for SnapshotError {
    fn from(e: scale::Error) -> Self {
        SnapshotError::DecodeError(e.to_string())
    }
}
