//! Typed ref handles
//!
//! A [`Ref<A>`] names one versioned cell in a domain's registry. The handle
//! carries no value; it is a ref id plus a registry handle, freely cloneable
//! and shareable across threads. All value access is indirected through the
//! registry (outside transactions) or through the ambient transaction's
//! local snapshot (inside).

use atomref_core::{DynValue, RefId, Result, StmError};
use atomref_engine::{scope, CommuteFn};
use atomref_storage::{ChangeHook, Registry};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed handle to a versioned mutable cell
pub struct Ref<A> {
    id: RefId,
    registry: Arc<Registry>,
    _marker: PhantomData<fn() -> A>,
}

impl<A> Clone for Ref<A> {
    fn clone(&self) -> Self {
        Ref {
            id: self.id,
            registry: Arc::clone(&self.registry),
            _marker: PhantomData,
        }
    }
}

impl<A> std::fmt::Debug for Ref<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ref").field("id", &self.id).finish()
    }
}

impl<A> Ref<A>
where
    A: Any + Clone + Send + Sync,
{
    pub(crate) fn from_parts(id: RefId, registry: Arc<Registry>) -> Self {
        Ref {
            id,
            registry,
            _marker: PhantomData,
        }
    }

    /// This ref's identifier
    pub fn id(&self) -> RefId {
        self.id
    }

    /// Read the ref's value
    ///
    /// Inside a transaction this reads the transaction-local snapshot and
    /// records the read; outside, it reads the latest committed value
    /// directly. Non-transactional reads never conflict with anything.
    pub fn read(&self) -> Result<A> {
        if scope::in_transaction() {
            let id = self.id;
            scope::with_active(|txn| txn.read(id))?.extract()
        } else {
            match self.registry.current(self.id) {
                Some(state) => state.value().extract(),
                None => Err(StmError::UnknownRef { id: self.id }),
            }
        }
    }

    /// The ref's committed version counter
    ///
    /// Reads the live registry; unaffected by any open transaction.
    pub fn version(&self) -> Result<u64> {
        match self.registry.current(self.id) {
            Some(state) => Ok(state.version()),
            None => Err(StmError::UnknownRef { id: self.id }),
        }
    }

    /// Write a new value, transaction-only
    ///
    /// Visible to subsequent reads in the same transaction immediately;
    /// visible to everyone else only after commit. Fails with
    /// [`StmError::NoActiveTransaction`] outside a transaction.
    pub fn write(&self, value: A) -> Result<()> {
        let id = self.id;
        scope::with_active(move |txn| txn.write(id, DynValue::new(value)))
    }

    /// Apply a commutative update, transaction-only
    ///
    /// `f` runs immediately against the transaction-local value and its
    /// result is returned, so the caller sees an up-to-date value within
    /// the transaction. At commit `f` is re-applied to whatever is globally
    /// current, which is what lets concurrent commutes compose instead of
    /// conflicting. `f` must therefore be safe to apply to a value other
    /// than the one seen here, must be pure, and must not touch other refs.
    pub fn commute(&self, f: impl Fn(&A) -> A + 'static) -> Result<A> {
        let id = self.id;
        let apply: CommuteFn = Box::new(move |value: &DynValue| {
            let current = value.extract::<A>()?;
            Ok(DynValue::new(f(&current)))
        });
        scope::with_active(move |txn| txn.commute(id, apply))?.extract()
    }

    /// Install or replace this ref's change observer
    ///
    /// The hook is invoked with the newly committed value after every
    /// successful commit that touches this ref, outside any atomic section.
    /// Hooks never block commits and never observe uncommitted state.
    pub fn watch(&self, hook: impl Fn(&A) + Send + Sync + 'static) -> Result<()> {
        let id = self.id;
        let hook: ChangeHook = Arc::new(move |value: &DynValue| {
            if let Some(typed) = value.downcast_ref::<A>() {
                hook(typed);
            }
        });
        self.registry
            .try_swap(|snap| match snap.get(id) {
                Some(state) => {
                    let mut next = snap.clone();
                    next.insert(id, state.with_hook(Arc::clone(&hook)));
                    Ok(next)
                }
                None => Err(StmError::UnknownRef { id }),
            })
            .map(|_| ())
    }

    /// Remove this ref's registry entry
    ///
    /// Safe to call while other handles to the id still exist; their
    /// operations will fail with [`StmError::UnknownRef`] afterwards.
    /// Disposing twice is a no-op.
    pub fn dispose(&self) {
        self.registry.finalize(self.id);
    }
}
