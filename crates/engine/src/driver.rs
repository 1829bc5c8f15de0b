//! Retry driver and change delivery
//!
//! [`run`] is the outermost loop: snapshot the registry, bind a fresh
//! attempt as the thread's ambient transaction, execute the caller's
//! operation, and hand the attempt to the commit protocol. A conflict
//! re-runs the operation in full against a fresh snapshot after one backoff
//! step, so operations must be free of irrevocable side effects (or confine
//! them to transactional writes).
//!
//! After a successful commit the driver walks the commit record and invokes
//! each changed ref's hook with the committed value, outside any atomic
//! section. Hooks never run for conflicted or failed attempts; observers
//! never see state that did not commit.
//!
//! User errors returned by the operation propagate immediately and abort
//! the call without retry; they are assumed unrelated to contention.

use crate::backoff::Backoff;
use crate::commit::{self, CommitOutcome, CommitRecord};
use crate::scope;
use crate::txn::Transaction;
use atomref_core::{Isolation, StmError};
use atomref_storage::Registry;

/// Run an operation transactionally against a registry
///
/// If a transaction is already active on the calling thread, the operation
/// executes directly against it: no new attempt, no commit. Only the
/// outermost call drives retries and the final commit.
pub fn run<R, E, F>(registry: &Registry, isolation: Isolation, mut op: F) -> Result<R, E>
where
    E: From<StmError>,
    F: FnMut() -> Result<R, E>,
{
    if scope::in_transaction() {
        return op();
    }

    let mut backoff = Backoff::new();
    let mut attempts = 0u64;
    loop {
        attempts += 1;
        let txn = Transaction::begin(&registry.snapshot(), isolation);
        let txn_id = txn.id();

        let guard = scope::bind(txn);
        let output = op();
        let txn = guard.capture();

        let value = output?;
        let txn = match txn {
            Some(txn) => txn,
            // The slot was emptied behind the guard's back; treat as misuse
            // rather than committing somebody else's state.
            None => return Err(StmError::NoActiveTransaction.into()),
        };

        match commit::commit(registry, &txn) {
            CommitOutcome::Committed(record) => {
                if attempts > 1 {
                    tracing::debug!(txn_id = %txn_id, attempts, "committed after retries");
                }
                deliver(&record);
                return Ok(value);
            }
            CommitOutcome::Conflict => {
                tracing::trace!(txn_id = %txn_id, attempts, "conflict, backing off");
                backoff.snooze();
            }
            CommitOutcome::Fatal(err) => return Err(err.into()),
        }
    }
}

/// Invoke change hooks for a committed record
fn deliver(record: &CommitRecord) {
    for notice in &record.changes {
        if let Some(hook) = notice.after.hook() {
            hook(notice.after.value());
        }
    }
}
