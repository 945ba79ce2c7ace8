use std::fmt;
use std::future::{Future, IntoFuture};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use crate::{Either, Error, ExecutionContext};

type Callback<T> = Box<dyn FnOnce(Either<T>) + Send + 'static>;

/// A write-once cell for a value that arrives later.
///
/// Handles are cheap to clone and all name the same cell. The first
/// [`fulfill`](Self::fulfill) wins; every callback, whether registered before
/// or after that, runs exactly once on its execution context with the final
/// value.
///
/// # Examples
///
/// ```
/// use promissory::Promise;
/// use futures::executor::block_on;
/// use std::thread;
///
/// let promise = Promise::<String>::new();
/// let producer = promise.clone();
/// let task = thread::spawn(move || producer.resolve("🍓".into()));
///
/// let settled = block_on(promise.completion());
/// assert_eq!(settled.result().map(String::as_str), Some("🍓"));
/// task.join().expect("The producer thread has panicked");
/// ```
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    context: ExecutionContext,
    state: Mutex<State<T>>,
}

// Only `Arc` clones happen under the lock; `T` is cloned after releasing it.
struct State<T> {
    slot: Option<Arc<Either<T>>>,
    waiters: Vec<(ExecutionContext, Callback<T>)>,
    wakers: Vec<(usize, Waker)>,
    next_waker_key: usize,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Promise<T> {
    /// Empty promise on the worker context, to be fulfilled by hand.
    pub fn new() -> Self {
        Self::new_in(&ExecutionContext::worker())
    }

    pub fn new_in(context: &ExecutionContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                context: context.or(&ExecutionContext::worker()),
                state: Mutex::new(State {
                    slot: None,
                    waiters: Vec::new(),
                    wakers: Vec::new(),
                    next_waker_key: 0,
                }),
            }),
        }
    }

    /// Run `work` on the worker context and fulfill with its outcome.
    ///
    /// # Examples
    ///
    /// ```
    /// use promissory::{Error, Promise};
    /// use futures::executor::block_on;
    ///
    /// let sum = Promise::spawn(|| Ok::<_, Error>(2 + 2));
    /// assert_eq!(block_on(sum.completion()).into_result().ok(), Some(4));
    ///
    /// let broken = Promise::<i32>::spawn(|| Err("no forecast"));
    /// assert!(block_on(broken.completion()).is_failure());
    /// ```
    pub fn spawn<F, E>(work: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<Error>,
    {
        Self::spawn_in(&ExecutionContext::worker(), work)
    }

    /// Run `work` on `context` and fulfill with its outcome. Never blocks.
    ///
    /// A panic inside `work` fulfills the promise with [`Error::Panicked`].
    pub fn spawn_in<F, E>(context: &ExecutionContext, work: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<Error>,
    {
        let promise = Self::new_in(context);
        let producer = promise.clone();
        promise.inner.context.submit(move || {
            producer.fulfill(settle(work));
        });
        promise
    }

    /// Already-fulfilled promise whose default context is the main context.
    pub fn resolved(value: T) -> Self {
        Self::resolved_in(&ExecutionContext::main(), value)
    }

    pub fn resolved_in(context: &ExecutionContext, value: T) -> Self {
        Self::from_either_in(context, Either::Result(value))
    }

    /// Already-failed promise whose default context is the main context.
    pub fn failed(err: impl Into<Error>) -> Self {
        Self::failed_in(&ExecutionContext::main(), err)
    }

    pub fn failed_in(context: &ExecutionContext, err: impl Into<Error>) -> Self {
        Self::from_either_in(context, Either::Failure(err.into()))
    }

    pub fn from_either_in(context: &ExecutionContext, value: Either<T>) -> Self {
        let promise = Self::new_in(context);
        promise.fulfill(value);
        promise
    }

    /// Store `value` if nothing was stored yet and hand it to every queued
    /// callback. Returns `false`, dropping `value`, if the promise was already
    /// fulfilled.
    pub fn fulfill(&self, value: Either<T>) -> bool {
        let value = Arc::new(value);
        let (waiters, wakers) = {
            let mut state = self.lock();
            if state.slot.is_some() {
                return false;
            }
            state.slot = Some(value.clone());
            (mem::take(&mut state.waiters), mem::take(&mut state.wakers))
        };
        tracing::trace!(
            callbacks = waiters.len(),
            failure = value.is_failure(),
            "Promise fulfilled"
        );
        for (context, callback) in waiters {
            deliver(&context, callback, value.clone());
        }
        for (_, waker) in wakers {
            waker.wake();
        }
        true
    }

    pub fn resolve(&self, value: T) -> bool {
        self.fulfill(Either::Result(value))
    }

    pub fn reject(&self, err: impl Into<Error>) -> bool {
        self.fulfill(Either::Failure(err.into()))
    }

    pub fn is_fulfilled(&self) -> bool {
        self.lock().slot.is_some()
    }

    pub fn value(&self) -> Option<Either<T>> {
        let settled = self.lock().slot.clone();
        settled.map(|value| Either::clone(&value))
    }

    pub fn result(&self) -> Option<T> {
        self.value().and_then(|value| value.into_result().ok())
    }

    pub fn error(&self) -> Option<Error> {
        self.value().and_then(|value| value.into_result().err())
    }

    /// Run `callback` on the main context once the promise is fulfilled.
    pub fn on_complete<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Either<T>) + Send + 'static,
    {
        self.on_complete_in(&ExecutionContext::main(), callback)
    }

    /// Run `callback` on `context` once the promise is fulfilled.
    ///
    /// The callback never runs inside this call, even when the value is
    /// already known.
    pub fn on_complete_in<F>(&self, context: &ExecutionContext, callback: F) -> &Self
    where
        F: FnOnce(Either<T>) + Send + 'static,
    {
        self.register(context, Box::new(callback));
        self
    }

    pub fn on_success<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.on_success_in(&ExecutionContext::main(), callback)
    }

    pub fn on_success_in<F>(&self, context: &ExecutionContext, callback: F) -> &Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.on_complete_in(context, move |value| {
            if let Either::Result(value) = value {
                callback(value)
            }
        })
    }

    pub fn on_failure<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Error) + Send + 'static,
    {
        self.on_failure_in(&ExecutionContext::main(), callback)
    }

    pub fn on_failure_in<F>(&self, context: &ExecutionContext, callback: F) -> &Self
    where
        F: FnOnce(Error) + Send + 'static,
    {
        self.on_complete_in(context, move |value| {
            if let Either::Failure(err) = value {
                callback(err)
            }
        })
    }

    /// Future resolving to the final value, for async callers.
    pub fn completion(&self) -> Completion<T> {
        Completion {
            promise: self.clone(),
            waker_key: None,
        }
    }

    fn register(&self, context: &ExecutionContext, callback: Callback<T>) {
        let context = context.or(&self.inner.context);
        let mut state = self.lock();
        let settled = state.slot.clone();
        match settled {
            Some(value) => {
                drop(state);
                deliver(&context, callback, value);
            }
            None => state.waiters.push((context, callback)),
        }
    }
}

fn deliver<T: Clone + Send + Sync + 'static>(
    context: &ExecutionContext,
    callback: Callback<T>,
    value: Arc<Either<T>>,
) {
    context.submit(move || callback(Either::clone(&value)));
}

impl<T> Promise<T> {
    /// The context used for this promise's task and as the default for
    /// combinators derived from it.
    pub fn context(&self) -> &ExecutionContext {
        &self.inner.context
    }

    /// Whether both handles name the same cell.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Callbacks never run under the lock, so a poisoned state is intact.
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (settled, callbacks) = {
            let state = self.lock();
            (state.slot.clone(), state.waiters.len())
        };
        f.debug_struct("Promise")
            .field("context", &self.inner.context)
            .field("value", &settled)
            .field("callbacks", &callbacks)
            .finish()
    }
}

/// Future returned by [`Promise::completion`].
///
/// Each `Completion` keeps at most one waker in the promise: re-polling
/// replaces it, dropping removes it.
#[derive(Debug)]
pub struct Completion<T> {
    promise: Promise<T>,
    waker_key: Option<usize>,
}

impl<T: Clone + Send + Sync + 'static> Future for Completion<T> {
    type Output = Either<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut state = this.promise.lock();
        if let Some(value) = state.slot.clone() {
            drop(state);
            this.waker_key = None;
            return Poll::Ready(Either::clone(&value));
        }
        let registered = this
            .waker_key
            .and_then(|key| state.wakers.iter().position(|(k, _)| *k == key));
        match registered {
            Some(index) => {
                let waker = &mut state.wakers[index].1;
                if !waker.will_wake(cx.waker()) {
                    *waker = cx.waker().clone();
                }
            }
            None => {
                let key = state.next_waker_key;
                state.next_waker_key += 1;
                state.wakers.push((key, cx.waker().clone()));
                this.waker_key = Some(key);
            }
        }
        Poll::Pending
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(key) = self.waker_key.take() {
            self.promise.lock().wakers.retain(|(k, _)| *k != key);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> IntoFuture for Promise<T> {
    type Output = Either<T>;
    type IntoFuture = Completion<T>;

    fn into_future(self) -> Self::IntoFuture {
        Completion {
            promise: self,
            waker_key: None,
        }
    }
}

/// Run `work`, turning its error or panic into a `Failure`.
pub(crate) fn settle<R, E, F>(work: F) -> Either<R>
where
    F: FnOnce() -> Result<R, E>,
    E: Into<Error>,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(outcome) => outcome.into(),
        Err(payload) => {
            let err = Error::from_panic(payload);
            tracing::warn!(error = %err, "Promise work panicked");
            Either::Failure(err)
        }
    }
}
