//! Identifier types for refs and transaction attempts
//!
//! Both identifiers are allocated from process-wide atomic counters, so they
//! are unique and monotonically increasing for the lifetime of the process.
//! Identifiers are never reused while the owning entity is live; a finalized
//! ref simply retires its id.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REF_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a ref (a versioned mutable cell)
///
/// A `RefId` is an opaque 64-bit integer. The id itself carries no value;
/// all value access goes through the registry entry it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId(u64);

impl RefId {
    /// Allocate the next ref identifier
    ///
    /// Ids start at 1 and increase monotonically. Relaxed ordering is
    /// sufficient: uniqueness comes from the atomic increment alone.
    pub fn allocate() -> Self {
        RefId(NEXT_REF_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Raw numeric value, for logging and diagnostics
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one transaction attempt
///
/// Every attempt gets a fresh id; a retried transaction allocates a new one
/// per attempt. Ids are monotonic across the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(u64);

impl TxnId {
    /// Allocate the next transaction-attempt identifier
    pub fn allocate() -> Self {
        TxnId(NEXT_TXN_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Raw numeric value, for logging and diagnostics
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
