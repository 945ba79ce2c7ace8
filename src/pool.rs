//! Thread-backed executors: a shared [`WorkerPool`] and a FIFO [`SerialQueue`],
//! plus the process-wide instances behind [`ExecutionContext::main`] and
//! [`ExecutionContext::worker`].
//!
//! [`ExecutionContext::main`]: crate::ExecutionContext::main
//! [`ExecutionContext::worker`]: crate::ExecutionContext::worker

use std::env;
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::context::{Executor, Job};
use crate::Error;

/// Environment variable overriding the size of the process-wide worker pool.
pub const WORKER_THREADS_ENV: &str = "PROMISSORY_WORKER_THREADS";

const DEFAULT_THREADS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub threads: usize,
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(DEFAULT_THREADS),
            thread_name: "promissory-worker".to_owned(),
        }
    }
}

impl PoolConfig {
    /// Defaults, with the thread count taken from
    /// [`WORKER_THREADS_ENV`] when it holds a positive integer.
    pub fn from_env() -> Self {
        Self::default().with_threads_override(env::var(WORKER_THREADS_ENV).ok().as_deref())
    }

    fn with_threads_override(mut self, raw: Option<&str>) -> Self {
        if let Some(raw) = raw {
            match raw.trim().parse::<usize>() {
                Ok(threads) if threads > 0 => self.threads = threads,
                _ => tracing::warn!(
                    value = raw,
                    default = self.threads,
                    "Ignoring invalid {}",
                    WORKER_THREADS_ENV
                ),
            }
        }
        self
    }
}

/// Fixed set of threads sharing one job queue.
///
/// Jobs may run in any order relative to each other. Dropping the pool lets
/// the threads finish queued work and exit.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Sender<Job>,
    threads: usize,
}

impl WorkerPool {
    /// Fails if the OS refuses to create one of the threads; the threads
    /// already started then exit.
    pub fn new(config: PoolConfig) -> io::Result<Self> {
        let threads = config.threads.max(1);
        let (sender, receiver) = unbounded::<Job>();
        for index in 0..threads {
            spawn_runner(format!("{}-{}", config.thread_name, index), receiver.clone())?;
        }
        tracing::debug!(threads, name = %config.thread_name, "Started worker pool");
        Ok(Self { sender, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl Executor for WorkerPool {
    fn submit(&self, job: Job) {
        enqueue(&self.sender, job);
    }
}

/// Single thread running jobs in submission order.
#[derive(Debug)]
pub struct SerialQueue {
    sender: Sender<Job>,
}

impl SerialQueue {
    pub fn new(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (sender, receiver) = unbounded::<Job>();
        spawn_runner(name.clone(), receiver)?;
        tracing::debug!(name = %name, "Started serial queue");
        Ok(Self { sender })
    }
}

impl Executor for SerialQueue {
    fn submit(&self, job: Job) {
        enqueue(&self.sender, job);
    }
}

fn enqueue(sender: &Sender<Job>, job: Job) {
    if sender.send(job).is_err() {
        tracing::error!("Executor threads are gone, dropping job");
    }
}

fn spawn_runner(name: String, receiver: Receiver<Job>) -> io::Result<()> {
    thread::Builder::new()
        .name(name)
        .spawn(move || run_jobs(receiver))?;
    Ok(())
}

fn run_jobs(receiver: Receiver<Job>) {
    for job in receiver.iter() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let current = thread::current();
            tracing::error!(
                thread = current.name().unwrap_or("<unnamed>"),
                error = %Error::from_panic(payload),
                "Job panicked"
            );
        }
    }
}

static MAIN_QUEUE: OnceLock<Arc<SerialQueue>> = OnceLock::new();
static WORKER_POOL: OnceLock<Arc<WorkerPool>> = OnceLock::new();

// Lazily started with no caller to hand an error to.
pub(crate) fn main_queue() -> Arc<dyn Executor> {
    MAIN_QUEUE
        .get_or_init(|| {
            Arc::new(SerialQueue::new("promissory-main").expect("failed to start the main queue"))
        })
        .clone()
}

pub(crate) fn worker_pool() -> Arc<dyn Executor> {
    WORKER_POOL
        .get_or_init(|| {
            let pool = WorkerPool::new(PoolConfig::from_env());
            Arc::new(pool.expect("failed to start the worker pool"))
        })
        .clone()
}
