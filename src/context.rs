use std::fmt;
use std::sync::Arc;

use crate::pool;

/// A unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere work can be submitted to run asynchronously.
///
/// `submit` must not run the job on the calling thread before returning.
pub trait Executor: Send + Sync {
    fn submit(&self, job: Job);
}

#[derive(Clone)]
enum Kind {
    Inherit,
    Executor(Arc<dyn Executor>),
}

/// Handle naming where a callback or task runs.
///
/// Three handles are always available: [`main`](Self::main) for UI-affine
/// delivery, [`worker`](Self::worker) for background computation, and the
/// [`inherit`](Self::inherit) sentinel that stands for "whatever the
/// producing promise uses".
#[derive(Clone)]
pub struct ExecutionContext {
    kind: Kind,
}

impl ExecutionContext {
    pub fn new<E: Executor + 'static>(executor: E) -> Self {
        Self::from_arc(Arc::new(executor))
    }

    pub fn from_arc(executor: Arc<dyn Executor>) -> Self {
        Self {
            kind: Kind::Executor(executor),
        }
    }

    /// The process-wide serial queue used for UI-affine delivery.
    pub fn main() -> Self {
        Self::from_arc(pool::main_queue())
    }

    /// The process-wide worker pool.
    pub fn worker() -> Self {
        Self::from_arc(pool::worker_pool())
    }

    /// Sentinel resolved to the producing promise's default context.
    pub fn inherit() -> Self {
        Self { kind: Kind::Inherit }
    }

    /// Whether both handles submit to the same executor.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        match (&this.kind, &other.kind) {
            (Kind::Inherit, Kind::Inherit) => true,
            (Kind::Executor(a), Kind::Executor(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self.kind, Kind::Inherit)
    }

    /// `self`, unless it is the sentinel, in which case `fallback`.
    pub fn or(&self, fallback: &ExecutionContext) -> ExecutionContext {
        match self.kind {
            Kind::Inherit => fallback.clone(),
            Kind::Executor(_) => self.clone(),
        }
    }

    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.kind {
            Kind::Executor(executor) => executor.submit(Box::new(job)),
            // Nothing left to inherit from.
            Kind::Inherit => pool::worker_pool().submit(Box::new(job)),
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Inherit => f.write_str("ExecutionContext::Inherit"),
            Kind::Executor(executor) => {
                write!(f, "ExecutionContext({:p})", Arc::as_ptr(executor) as *const ())
            }
        }
    }
}
