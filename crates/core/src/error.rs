//! Error taxonomy for STM operations
//!
//! Only fatal conditions appear here. Commit-time version conflicts are a
//! retry signal internal to the engine: the driver re-runs the transaction
//! and the caller sees nothing but latency, so no `Conflict` variant exists
//! in this enum.

use crate::id::RefId;
use thiserror::Error;

/// All caller-visible STM errors
///
/// A transaction either returns a value or fails with one of these. None of
/// them is retried by the engine: validation failures and type mismatches
/// are deterministic, and the illegal-state variants indicate programmer
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StmError {
    /// A ref's validator rejected the candidate value at commit time
    #[error("validator rejected candidate value for ref {id}")]
    ValidationFailed {
        /// The ref whose validator rejected the value
        id: RefId,
    },

    /// `write`, `commute`, or a transaction-id query was invoked with no
    /// transaction active on the calling thread
    #[error("no transaction is active on this thread")]
    NoActiveTransaction,

    /// The ref is not present in the registry snapshot
    ///
    /// The ref was finalized, was allocated after this transaction took its
    /// snapshot, or belongs to a different memory domain.
    #[error("ref {id} is not present in the registry")]
    UnknownRef {
        /// The missing ref
        id: RefId,
    },

    /// A typed accessor was applied to a value of a different type
    #[error("wrong value type: expected {expected}, found {actual}")]
    WrongType {
        /// Type the caller asked for
        expected: &'static str,
        /// Type actually stored
        actual: &'static str,
    },
}

impl StmError {
    /// Check if this is a validator rejection
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, StmError::ValidationFailed { .. })
    }

    /// Check if this error indicates misuse of the transactional API
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, StmError::NoActiveTransaction)
    }
}

/// Result type for STM operations
pub type Result<T> = std::result::Result<T, StmError>;
