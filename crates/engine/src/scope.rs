//! Ambient transaction binding
//!
//! The engine binds the running attempt into a thread-local slot so that
//! ref operations deep in the call stack can find it without threading a
//! context parameter everywhere. The binding is scoped by [`ScopeGuard`]:
//! dropping the guard clears the slot, so a panicking or early-returning
//! operation can never leak an active transaction into unrelated work.
//!
//! One slot per thread: a thread participates in at most one transaction at
//! a time, and concurrently running attempts on other threads never see
//! each other's context.

use crate::txn::Transaction;
use atomref_core::{Result, StmError, TxnId};
use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static ACTIVE: RefCell<Option<Transaction>> = const { RefCell::new(None) };
}

/// Check whether a transaction is active on the calling thread
pub fn in_transaction() -> bool {
    ACTIVE.with(|slot| slot.borrow().is_some())
}

/// Identifier of the transaction running on the calling thread
///
/// Fails with [`StmError::NoActiveTransaction`] if none is active.
pub fn active_txn_id() -> Result<TxnId> {
    ACTIVE.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(Transaction::id)
            .ok_or(StmError::NoActiveTransaction)
    })
}

/// Run a closure against the active transaction
///
/// Fails with [`StmError::NoActiveTransaction`] if none is active. The
/// closure must not re-enter scope accessors (ref operations are fine from
/// transaction bodies; they each take the slot for the duration of one
/// call).
pub fn with_active<R>(f: impl FnOnce(&mut Transaction) -> Result<R>) -> Result<R> {
    ACTIVE.with(|slot| match slot.borrow_mut().as_mut() {
        Some(txn) => f(txn),
        None => Err(StmError::NoActiveTransaction),
    })
}

/// RAII binding of a transaction to the calling thread
///
/// Created by [`bind`]; clears the slot on drop. The driver calls
/// [`ScopeGuard::capture`] to take the transaction back for commit, which
/// disarms the guard.
pub struct ScopeGuard {
    armed: bool,
    // Keep the guard on the thread whose slot it owns.
    _not_send: PhantomData<*const ()>,
}

/// Bind a transaction as the calling thread's active context
///
/// The slot must be empty; the driver only binds after checking
/// [`in_transaction`].
pub fn bind(txn: Transaction) -> ScopeGuard {
    ACTIVE.with(|slot| {
        let mut slot = slot.borrow_mut();
        debug_assert!(slot.is_none(), "transaction scope already bound on this thread");
        *slot = Some(txn);
    });
    ScopeGuard {
        armed: true,
        _not_send: PhantomData,
    }
}

impl ScopeGuard {
    /// Take the bound transaction back, disarming the guard
    ///
    /// Returns `None` only if the slot was emptied behind the guard's back,
    /// which would indicate an engine bug.
    pub fn capture(mut self) -> Option<Transaction> {
        self.armed = false;
        ACTIVE.with(|slot| slot.borrow_mut().take())
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.armed {
            ACTIVE.with(|slot| {
                slot.borrow_mut().take();
            });
        }
    }
}
