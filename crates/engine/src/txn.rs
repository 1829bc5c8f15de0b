//! Per-attempt transaction context
//!
//! A [`Transaction`] is ephemeral: one per attempt, discarded whether the
//! attempt commits or conflicts. Only the retry driver persists across
//! attempts.
//!
//! The context owns a private clone of the registry snapshot taken at
//! attempt start and mutates it in place as its own reads and writes
//! proceed, which is what gives read-your-own-writes semantics. Local
//! mutations never advance versions; the snapshot version is the base the
//! commit protocol compares against the live registry.

use atomref_core::{DynValue, Isolation, RefId, Result, StmError, TxnId};
use atomref_storage::{CellState, Snapshot};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// A deferred commutative update
///
/// Applied once against the transaction-local value when recorded, and
/// re-applied at commit time against whatever is globally current. The
/// function must therefore tolerate being called with a value different
/// from the one it first saw, and may run on attempts that later conflict.
pub type CommuteFn = Box<dyn Fn(&DynValue) -> Result<DynValue>>;

/// Accumulated diff for one ref within a transaction
///
/// Repeated writes to the same ref collapse into a single record: `before`
/// stays at the pre-transaction state, `after` tracks the latest local
/// state.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    /// State as of the transaction's snapshot
    pub before: CellState,
    /// Latest transaction-local state
    pub after: CellState,
}

/// One transaction attempt
pub struct Transaction {
    id: TxnId,
    isolation: Isolation,
    local: Snapshot,
    reads: FxHashSet<RefId>,
    writes: FxHashSet<RefId>,
    commutes: Vec<(RefId, CommuteFn)>,
    changes: BTreeMap<RefId, ChangeRecord>,
}

impl Transaction {
    /// Begin an attempt against a registry snapshot
    pub fn begin(snapshot: &Snapshot, isolation: Isolation) -> Self {
        Transaction {
            id: TxnId::allocate(),
            isolation,
            local: snapshot.clone(),
            reads: FxHashSet::default(),
            writes: FxHashSet::default(),
            commutes: Vec::new(),
            changes: BTreeMap::new(),
        }
    }

    /// Identifier of this attempt
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Isolation level this attempt commits under
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    /// Read a ref's transaction-local value, recording the read
    pub fn read(&mut self, id: RefId) -> Result<DynValue> {
        let value = match self.local.get(id) {
            Some(state) => state.value().clone(),
            None => return Err(StmError::UnknownRef { id }),
        };
        self.reads.insert(id);
        Ok(value)
    }

    /// Write a ref's transaction-local value
    ///
    /// The local version is left at its snapshot value so the commit
    /// protocol can detect interleaved committers.
    pub fn write(&mut self, id: RefId, value: DynValue) -> Result<()> {
        let current = match self.local.get(id) {
            Some(state) => state.clone(),
            None => return Err(StmError::UnknownRef { id }),
        };
        let next = current.replaced(value);
        self.local.insert(id, next.clone());
        self.writes.insert(id);
        self.record_change(id, current, next);
        Ok(())
    }

    /// Apply a commutative update locally and log it for commit
    ///
    /// Returns the locally computed value so the caller sees an up-to-date
    /// result within the transaction. At commit the function is re-applied
    /// to the live value, so under contention the committed value may
    /// differ from the one returned here.
    pub fn commute(&mut self, id: RefId, apply: CommuteFn) -> Result<DynValue> {
        let current = match self.local.get(id) {
            Some(state) => state.clone(),
            None => return Err(StmError::UnknownRef { id }),
        };
        let fresh = apply(current.value())?;
        let next = current.replaced(fresh.clone());
        self.local.insert(id, next.clone());
        self.commutes.push((id, apply));
        self.record_change(id, current, next);
        Ok(fresh)
    }

    /// Check whether the attempt performed no writes and no commutes
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty() && self.commutes.is_empty()
    }

    /// Refs read during this attempt
    pub fn reads(&self) -> impl Iterator<Item = RefId> + '_ {
        self.reads.iter().copied()
    }

    /// Refs written during this attempt
    pub fn writes(&self) -> impl Iterator<Item = RefId> + '_ {
        self.writes.iter().copied()
    }

    /// Pending commutes, in application order
    pub fn commutes(&self) -> &[(RefId, CommuteFn)] {
        &self.commutes
    }

    /// Accumulated per-ref diffs, collapsed to (first-old, latest-new)
    pub fn changes(&self) -> impl Iterator<Item = (RefId, &ChangeRecord)> {
        self.changes.iter().map(|(id, rec)| (*id, rec))
    }

    /// Transaction-local state of a ref, if present in the snapshot
    pub fn local_state(&self, id: RefId) -> Option<&CellState> {
        self.local.get(id)
    }

    /// Snapshot-time version of a ref, if present
    pub fn base_version(&self, id: RefId) -> Option<u64> {
        self.local.get(id).map(|state| state.version())
    }

    fn record_change(&mut self, id: RefId, before: CellState, after: CellState) {
        self.changes
            .entry(id)
            .and_modify(|rec| rec.after = after.clone())
            .or_insert(ChangeRecord { before, after });
    }
}
