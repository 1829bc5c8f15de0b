//! # atomref
//!
//! In-process software transactional memory (STM) over versioned refs.
//!
//! Independent threads read and write shared mutable cells ("refs") inside
//! atomic transactions, using optimistic multi-version concurrency control
//! instead of locks. Reads see a consistent snapshot; writers detect
//! conflicts at commit time and retry transparently.
//!
//! ## Quick Start
//!
//! ```
//! use atomref::prelude::*;
//!
//! let dom = Domain::new();
//! let balance = dom.alloc(100i64);
//! let audit = dom.alloc(0i64);
//!
//! let remaining: Result<i64> = dom.run(|| {
//!     let current = balance.read()?;
//!     balance.write(current - 30)?;
//!     audit.commute(|n| n + 1)?;
//!     balance.read()
//! });
//! assert_eq!(remaining.unwrap(), 70);
//! assert_eq!(balance.read().unwrap(), 70);
//! ```
//!
//! ## Model
//!
//! - [`Domain`] owns one isolated registry of refs; construct one per
//!   memory domain (tests get hermetic domains for free).
//! - [`Ref`] is a cheap typed handle. `read` works anywhere; `write` and
//!   `commute` require an active transaction on the calling thread.
//! - [`Domain::run`] re-executes its operation from scratch on conflict, so
//!   operations must be free of irrevocable side effects. Nested `run`
//!   calls join the ambient transaction; only the outermost commits.
//! - A commute's function is re-applied to the globally current value at
//!   commit time. Supply genuinely commutative functions (or accept
//!   last-applied-wins) — this is a caller-discipline requirement, not an
//!   enforced invariant.
//!
//! ## Errors
//!
//! Transient contention is invisible to callers beyond latency. A
//! transaction either returns a value or fails with a fatal
//! [`StmError`]: a validator rejection, a type mismatch, or use of
//! `write`/`commute` outside a transaction.

#![warn(missing_docs)]

mod domain;
mod handle;

pub mod prelude;

pub use domain::Domain;
pub use handle::Ref;

pub use atomref_core::{DynValue, Isolation, RefId, Result, StmError, TxnId};
