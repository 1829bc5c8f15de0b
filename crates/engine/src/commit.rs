//! Commit protocol
//!
//! Validates a finished attempt against the live registry and installs its
//! effects in one atomic snapshot swap. Per attempt there are three
//! terminal outcomes: committed, conflict, or a fatal error.
//!
//! Conflict is a value of [`CommitOutcome`], not an error type: it is
//! consumed exclusively by the retry driver and can never leak through an
//! ordinary error path. Validator rejections and type mismatches are fatal
//! and short-circuit without retry.
//!
//! Inside the swap builder:
//! 1. Serializable only: every ref in the read set must still be at its
//!    snapshot version in the live registry.
//! 2. Writes: version check against the snapshot base, then validator,
//!    then install at version + 1.
//! 3. Commutes, in recorded order: re-apply each function to the value
//!    current in the candidate snapshot (the live value, including this
//!    attempt's own earlier installs), validate, install at version + 1.
//!
//! The builder runs against a copy; a conflict or fatal abort cancels the
//! swap with nothing partial ever visible.

use crate::txn::Transaction;
use atomref_core::{Isolation, RefId, StmError};
use atomref_storage::{CellState, Registry};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Committed diff for one ref, used to drive post-commit notification
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    /// The ref that changed
    pub id: RefId,
    /// Live state the change was applied on top of
    pub before: CellState,
    /// State actually installed by the commit
    pub after: CellState,
}

/// Everything a successful commit produced, in ref-id order
#[derive(Debug, Clone, Default)]
pub struct CommitRecord {
    /// One notice per changed ref; repeated mutations collapse into the
    /// final installed state
    pub changes: Vec<ChangeNotice>,
}

/// Terminal outcome of one commit attempt
#[derive(Debug)]
pub enum CommitOutcome {
    /// The attempt's effects are installed and visible
    Committed(CommitRecord),
    /// A version mismatch was detected; the driver will re-run the attempt
    Conflict,
    /// Deterministic failure; propagated to the caller, never retried
    Fatal(StmError),
}

enum Abort {
    Conflict,
    Fatal(StmError),
}

/// Validate an attempt and atomically install its effects
pub fn commit(registry: &Registry, txn: &Transaction) -> CommitOutcome {
    // Fast path: nothing to install, no registry interaction at all.
    if txn.is_read_only() {
        tracing::trace!(txn_id = %txn.id(), "read-only attempt, skipping swap");
        return CommitOutcome::Committed(CommitRecord::default());
    }

    let mut notices: BTreeMap<RefId, ChangeNotice> = BTreeMap::new();
    let swapped = registry.try_swap(|live| {
        // The builder may re-run after a pointer race; start clean.
        notices.clear();
        let mut next = live.clone();

        if txn.isolation() == Isolation::Serializable {
            for id in txn.reads() {
                let base = txn.base_version(id).ok_or(Abort::Conflict)?;
                match live.get(id) {
                    Some(state) if state.version() == base => {}
                    _ => return Err(Abort::Conflict),
                }
            }
        }

        for id in txn.writes() {
            let pending = txn.local_state(id).ok_or(Abort::Conflict)?;
            let current = next.get(id).cloned().ok_or(Abort::Conflict)?;
            if current.version() != pending.version() {
                return Err(Abort::Conflict);
            }
            if !current.validate(pending.value()) {
                return Err(Abort::Fatal(StmError::ValidationFailed { id }));
            }
            let installed = current.advanced(pending.value().clone());
            record(&mut notices, id, &current, &installed);
            next.insert(id, installed);
        }

        for (id, apply) in txn.commutes() {
            // Deliberately the candidate's current value, not the stale
            // transaction-local one: commutes must compose with whatever
            // committed since the snapshot was taken.
            let current = next.get(*id).cloned().ok_or(Abort::Conflict)?;
            let fresh = apply(current.value()).map_err(Abort::Fatal)?;
            if !current.validate(&fresh) {
                return Err(Abort::Fatal(StmError::ValidationFailed { id: *id }));
            }
            let installed = current.advanced(fresh);
            record(&mut notices, *id, &current, &installed);
            next.insert(*id, installed);
        }

        Ok(next)
    });

    match swapped {
        Ok(_) => {
            tracing::debug!(txn_id = %txn.id(), changed = notices.len(), "attempt committed");
            CommitOutcome::Committed(CommitRecord {
                changes: notices.into_values().collect(),
            })
        }
        Err(Abort::Conflict) => {
            tracing::debug!(txn_id = %txn.id(), "attempt conflicted");
            CommitOutcome::Conflict
        }
        Err(Abort::Fatal(err)) => {
            tracing::warn!(txn_id = %txn.id(), error = %err, "attempt failed fatally");
            CommitOutcome::Fatal(err)
        }
    }
}

fn record(
    notices: &mut BTreeMap<RefId, ChangeNotice>,
    id: RefId,
    before: &CellState,
    after: &CellState,
) {
    match notices.entry(id) {
        Entry::Occupied(mut entry) => entry.get_mut().after = after.clone(),
        Entry::Vacant(entry) => {
            entry.insert(ChangeNotice {
                id,
                before: before.clone(),
                after: after.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::CommuteFn;
    use atomref_core::DynValue;
    use atomref_storage::Validator;
    use std::convert::Infallible;
    use std::sync::Arc;

    fn setup(initial: i64) -> (Registry, RefId) {
        let reg = Registry::new();
        let id = reg.allocate(CellState::new(DynValue::new(initial)));
        (reg, id)
    }

    fn bump_outside(reg: &Registry, id: RefId, value: i64) {
        let _: Result<_, Infallible> = reg.try_swap(|snap| {
            let mut next = snap.clone();
            let state = next.get(id).unwrap().advanced(DynValue::new(value));
            next.insert(id, state);
            Ok(next)
        });
    }

    fn add(n: i64) -> CommuteFn {
        Box::new(move |v| Ok(DynValue::new(v.extract::<i64>()? + n)))
    }

    #[test]
    fn test_read_only_attempt_never_swaps() {
        let (reg, id) = setup(0);
        let swaps_before = reg.swap_count();

        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::Serializable);
        txn.read(id).unwrap();

        match commit(&reg, &txn) {
            CommitOutcome::Committed(record) => assert!(record.changes.is_empty()),
            other => panic!("expected Committed, got {:?}", other),
        }
        assert_eq!(reg.swap_count(), swaps_before, "fast path must not touch the registry");
    }

    #[test]
    fn test_write_commits_and_advances_version() {
        let (reg, id) = setup(0);
        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::default());
        txn.write(id, DynValue::new(5i64)).unwrap();

        match commit(&reg, &txn) {
            CommitOutcome::Committed(record) => {
                assert_eq!(record.changes.len(), 1);
                assert_eq!(record.changes[0].after.version(), 1);
            }
            other => panic!("expected Committed, got {:?}", other),
        }
        let state = reg.current(id).unwrap();
        assert_eq!(state.value().extract::<i64>().unwrap(), 5);
        assert_eq!(state.version(), 1);
    }

    #[test]
    fn test_stale_write_conflicts() {
        let (reg, id) = setup(0);
        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::default());
        txn.write(id, DynValue::new(5i64)).unwrap();

        // Someone else commits between snapshot and commit.
        bump_outside(&reg, id, 100);

        assert!(matches!(commit(&reg, &txn), CommitOutcome::Conflict));
        assert_eq!(
            reg.current(id).unwrap().value().extract::<i64>().unwrap(),
            100,
            "conflicted attempt must leave the interleaved commit intact"
        );
    }

    #[test]
    fn test_serializable_validates_reads() {
        let (reg, id) = setup(0);
        let other = reg.allocate(CellState::new(DynValue::new(0i64)));

        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::Serializable);
        txn.read(id).unwrap();
        txn.write(other, DynValue::new(1i64)).unwrap();

        bump_outside(&reg, id, 7);

        assert!(
            matches!(commit(&reg, &txn), CommitOutcome::Conflict),
            "serializable attempt must conflict when a read ref advanced"
        );
    }

    #[test]
    fn test_read_committed_ignores_stale_reads() {
        let (reg, id) = setup(0);
        let other = reg.allocate(CellState::new(DynValue::new(0i64)));

        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::ReadCommitted);
        txn.read(id).unwrap();
        txn.write(other, DynValue::new(1i64)).unwrap();

        bump_outside(&reg, id, 7);

        assert!(matches!(commit(&reg, &txn), CommitOutcome::Committed(_)));
    }

    #[test]
    fn test_validator_rejection_is_fatal_and_durable() {
        let reg = Registry::new();
        let validator: Validator =
            Arc::new(|v| v.downcast_ref::<i64>().map(|n| *n >= 0).unwrap_or(false));
        let id = reg.allocate(CellState::guarded(DynValue::new(3i64), validator));

        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::default());
        txn.write(id, DynValue::new(-1i64)).unwrap();

        match commit(&reg, &txn) {
            CommitOutcome::Fatal(StmError::ValidationFailed { id: failed }) => {
                assert_eq!(failed, id)
            }
            other => panic!("expected Fatal(ValidationFailed), got {:?}", other),
        }
        let state = reg.current(id).unwrap();
        assert_eq!(state.value().extract::<i64>().unwrap(), 3, "value unchanged");
        assert_eq!(state.version(), 0, "version unchanged");
    }

    #[test]
    fn test_commute_reapplies_against_live_value() {
        let (reg, id) = setup(0);
        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::default());

        let seen = txn.commute(id, add(1)).unwrap();
        assert_eq!(seen.extract::<i64>().unwrap(), 1, "local application sees 0 + 1");

        // Another committer lands before this attempt's commit.
        bump_outside(&reg, id, 10);

        match commit(&reg, &txn) {
            CommitOutcome::Committed(record) => {
                assert_eq!(
                    record.changes[0].after.value().extract::<i64>().unwrap(),
                    11,
                    "commit must apply the commute to the live value, not the stale one"
                );
            }
            other => panic!("expected Committed, got {:?}", other),
        }
        assert_eq!(reg.current(id).unwrap().value().extract::<i64>().unwrap(), 11);
    }

    #[test]
    fn test_write_then_commute_chains_within_attempt() {
        let (reg, id) = setup(0);
        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::default());
        txn.write(id, DynValue::new(5i64)).unwrap();
        txn.commute(id, add(2)).unwrap();

        // The write installs the final local value (5 + 2 = 7), then the
        // logged commute re-applies on top of it: 7 + 2 = 9. Mixing writes
        // and commutes on one ref compounds the commute by design.
        match commit(&reg, &txn) {
            CommitOutcome::Committed(record) => {
                assert_eq!(record.changes.len(), 1, "same ref collapses to one notice");
                let state = &record.changes[0].after;
                assert_eq!(state.value().extract::<i64>().unwrap(), 9);
                assert_eq!(state.version(), 2, "one bump per write and per commute");
            }
            other => panic!("expected Committed, got {:?}", other),
        }
    }

    #[test]
    fn test_commute_on_finalized_ref_conflicts() {
        let (reg, id) = setup(0);
        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::default());
        txn.commute(id, add(1)).unwrap();

        reg.finalize(id);

        assert!(matches!(commit(&reg, &txn), CommitOutcome::Conflict));
    }

    #[test]
    fn test_two_refs_commit_atomically() {
        let reg = Registry::new();
        let a = reg.allocate(CellState::new(DynValue::new(0i64)));
        let b = reg.allocate(CellState::new(DynValue::new(0i64)));

        let mut txn = Transaction::begin(&reg.snapshot(), Isolation::default());
        txn.write(a, DynValue::new(1i64)).unwrap();
        txn.write(b, DynValue::new(2i64)).unwrap();

        // Conflict on one ref must abort the whole attempt.
        bump_outside(&reg, b, 99);
        assert!(matches!(commit(&reg, &txn), CommitOutcome::Conflict));
        assert_eq!(
            reg.current(a).unwrap().version(),
            0,
            "no partial effect on the other ref"
        );
    }
}
