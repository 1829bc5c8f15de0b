//! Memory domains
//!
//! A [`Domain`] owns one [`Registry`] and is the entry point for allocating
//! refs and running transactions against them. Nothing is process-global:
//! two domains are fully isolated, and dropping the last handle to a domain
//! releases everything it stored.

use crate::handle::Ref;
use atomref_core::{DynValue, Isolation, Result, StmError, TxnId};
use atomref_engine::{driver, scope};
use atomref_storage::{CellState, Registry, Validator};
use std::any::Any;
use std::sync::Arc;

/// One isolated STM memory domain
///
/// Cloning a `Domain` clones a handle to the same registry.
#[derive(Debug, Clone)]
pub struct Domain {
    registry: Arc<Registry>,
}

impl Domain {
    /// Create an empty domain
    pub fn new() -> Self {
        Domain {
            registry: Arc::new(Registry::new()),
        }
    }

    /// Allocate a new ref holding `initial`, at version 0
    pub fn alloc<A>(&self, initial: A) -> Ref<A>
    where
        A: Any + Clone + Send + Sync,
    {
        let id = self.registry.allocate(CellState::new(DynValue::new(initial)));
        Ref::from_parts(id, Arc::clone(&self.registry))
    }

    /// Allocate a new ref with a commit-time validator
    ///
    /// The validator gates every subsequent commit to this ref; a rejected
    /// candidate fails the whole transaction with
    /// [`StmError::ValidationFailed`] and is never retried. The initial
    /// value is installed as-is. Validators must be pure: they may run on
    /// attempts that later conflict, and they must not touch other refs.
    pub fn alloc_guarded<A>(
        &self,
        initial: A,
        validator: impl Fn(&A) -> bool + Send + Sync + 'static,
    ) -> Ref<A>
    where
        A: Any + Clone + Send + Sync,
    {
        let check: Validator = Arc::new(move |value: &DynValue| {
            value.downcast_ref::<A>().map(&validator).unwrap_or(false)
        });
        let id = self
            .registry
            .allocate(CellState::guarded(DynValue::new(initial), check));
        Ref::from_parts(id, Arc::clone(&self.registry))
    }

    /// Run an operation transactionally, read-committed
    ///
    /// The operation is re-executed in full on conflict; keep it free of
    /// irrevocable side effects. User errors propagate immediately without
    /// retry. Inside an already-active transaction the operation joins it
    /// instead of starting a new attempt.
    pub fn run<R, E, F>(&self, op: F) -> std::result::Result<R, E>
    where
        E: From<StmError>,
        F: FnMut() -> std::result::Result<R, E>,
    {
        driver::run(&self.registry, Isolation::ReadCommitted, op)
    }

    /// Run an operation transactionally at an explicit isolation level
    ///
    /// [`Isolation::Serializable`] additionally validates the read set at
    /// commit time: any ref read during the attempt that advanced in the
    /// meantime forces a retry.
    pub fn run_isolated<R, E, F>(&self, isolation: Isolation, op: F) -> std::result::Result<R, E>
    where
        E: From<StmError>,
        F: FnMut() -> std::result::Result<R, E>,
    {
        driver::run(&self.registry, isolation, op)
    }

    /// Identifier of the transaction active on the calling thread
    ///
    /// Fails with [`StmError::NoActiveTransaction`] outside a transaction.
    pub fn active_txn_id(&self) -> Result<TxnId> {
        scope::active_txn_id()
    }

    /// Number of live refs in this domain
    pub fn ref_count(&self) -> usize {
        self.registry.len()
    }

    /// Successful registry swaps since the domain was created
    ///
    /// Allocation, finalization, observer installation and every committing
    /// transaction count as one swap each; read-only transactions count as
    /// none.
    pub fn swap_count(&self) -> u64 {
        self.registry.swap_count()
    }
}

impl Default for Domain {
    fn default() -> Self {
        Domain::new()
    }
}
