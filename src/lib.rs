//! Write-once promises whose callbacks run on execution contexts.
//!
//! A [`Promise`] starts pending, is fulfilled exactly once with an
//! [`Either`] (a value or an [`Error`]), and hands that outcome to every
//! callback registered on it, each on the [`ExecutionContext`] it asked for.
//! Nothing here blocks: waiting is done by registering a callback or by
//! awaiting [`Promise::completion`].
//!
//! # Examples
//!
//! ```
//! use promissory::{Error, ExecutionContext, Promise};
//! use std::sync::mpsc::channel;
//!
//! let (tx, rx) = channel();
//! Promise::spawn(|| Ok::<_, Error>(2 + 2))
//!     .map(|x| x * 10)
//!     .on_success_in(&ExecutionContext::main(), move |value| tx.send(value).unwrap());
//! assert_eq!(rx.recv().unwrap(), 40);
//! ```

mod aggregate;
mod combinators;
mod context;
mod either;
mod error;
pub mod pool;
mod promise;

pub use aggregate::Selected;
pub use context::{ExecutionContext, Executor, Job};
pub use either::Either;
pub use error::Error;
pub use pool::{PoolConfig, SerialQueue, WorkerPool};
pub use promise::{Completion, Promise};
