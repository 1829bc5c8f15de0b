//! Core types for the atomref STM engine
//!
//! This crate defines the leaf types shared by every layer:
//! - [`RefId`] / [`TxnId`]: monotonic identifiers for refs and transaction
//!   attempts
//! - [`DynValue`]: type-erased, shareable cell value with a typed accessor
//! - [`StmError`]: the caller-visible error taxonomy
//! - [`Isolation`]: transaction isolation levels
//!
//! Commit conflicts are deliberately absent from [`StmError`]: a conflict is
//! an internal retry signal consumed by the engine's driver and is never
//! surfaced to callers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod isolation;
pub mod value;

pub use error::{Result, StmError};
pub use id::{RefId, TxnId};
pub use isolation::Isolation;
pub use value::DynValue;
