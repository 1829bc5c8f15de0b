//! Convenience re-exports for typical usage
//!
//! ```
//! use atomref::prelude::*;
//!
//! let dom = Domain::new();
//! let r = dom.alloc(0i64);
//! let _: Result<()> = dom.run(|| r.write(1));
//! ```

pub use crate::{Domain, Isolation, Ref, RefId, Result, StmError, TxnId};
