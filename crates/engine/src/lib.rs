//! Transaction engine for atomref
//!
//! This crate implements optimistic concurrency control over the registry:
//! - [`Transaction`]: per-attempt context with read/write sets, a commute
//!   log and a private copy-on-write view of the registry
//! - [`scope`]: the ambient thread-local transaction binding with an RAII
//!   guard that clears on exit, panic included
//! - [`commit`]: the commit protocol, with conflict as an internal outcome
//!   variant that never escapes to callers
//! - [`driver`]: the retry loop with spin-then-yield backoff and post-commit
//!   change delivery
//!
//! Losing attempts are invisible to callers beyond latency; a transaction
//! either returns a value or fails with a fatal [`atomref_core::StmError`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod commit;
pub mod driver;
pub mod scope;
pub mod txn;

pub use backoff::Backoff;
pub use commit::{ChangeNotice, CommitOutcome, CommitRecord};
pub use driver::run;
pub use scope::{active_txn_id, in_transaction, with_active, ScopeGuard};
pub use txn::{ChangeRecord, CommuteFn, Transaction};
