//! Deriving new promises from one: `map`, `flat_map` (also `>>`) and `filter`.
//!
//! Each combinator returns its output promise right away and never touches
//! the input's state. A `Failure` upstream passes through untouched, and the
//! transform is not called.

use std::ops::Shr;

use crate::promise::settle;
use crate::{Either, Error, ExecutionContext, Promise};

impl<T: Clone + Send + Sync + 'static> Promise<T> {
    /// Transform the value on this promise's context.
    ///
    /// # Examples
    ///
    /// ```
    /// use promissory::Promise;
    /// use futures::executor::block_on;
    ///
    /// let celsius = Promise::resolved(20.0_f64);
    /// let fahrenheit = celsius.map(|c| c * 9.0 / 5.0 + 32.0);
    /// assert_eq!(block_on(fahrenheit.completion()).into_result().ok(), Some(68.0));
    /// ```
    pub fn map<R, F>(&self, transform: F) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        self.map_in(&ExecutionContext::inherit(), transform)
    }

    pub fn map_in<R, F>(&self, context: &ExecutionContext, transform: F) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        self.try_map_in(context, move |value| Ok::<_, Error>(transform(value)))
    }

    pub fn try_map<R, E, F>(&self, transform: F) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        E: Into<Error>,
        F: FnOnce(T) -> Result<R, E> + Send + 'static,
    {
        self.try_map_in(&ExecutionContext::inherit(), transform)
    }

    /// Transform the value with a fallible function; its error becomes the
    /// new promise's failure.
    pub fn try_map_in<R, E, F>(&self, context: &ExecutionContext, transform: F) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        E: Into<Error>,
        F: FnOnce(T) -> Result<R, E> + Send + 'static,
    {
        let context = context.or(self.context());
        let mapped = Promise::new_in(&context);
        let output = mapped.clone();
        self.on_complete_in(&context, move |value| {
            output.fulfill(match value {
                Either::Result(value) => settle(move || transform(value)),
                Either::Failure(err) => Either::Failure(err),
            });
        });
        mapped
    }

    /// Chain a computation that itself yields a promise.
    ///
    /// The returned promise exists before `self` settles and is fulfilled
    /// with whatever the promise produced by `bind` settles to.
    ///
    /// # Examples
    ///
    /// ```
    /// use promissory::Promise;
    /// use futures::executor::block_on;
    ///
    /// let two = Promise::resolved(1).flat_map(|x| Promise::resolved(x + 1));
    /// assert_eq!(block_on(two.completion()).into_result().ok(), Some(2));
    ///
    /// let three = two >> |x: i32| Promise::resolved(x + 1);
    /// assert_eq!(block_on(three.completion()).into_result().ok(), Some(3));
    /// ```
    pub fn flat_map<R, F>(&self, bind: F) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Promise<R> + Send + 'static,
    {
        self.flat_map_in(&ExecutionContext::inherit(), bind)
    }

    pub fn flat_map_in<R, F>(&self, context: &ExecutionContext, bind: F) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Promise<R> + Send + 'static,
    {
        self.try_flat_map_in(context, move |value| Ok::<_, Error>(bind(value)))
    }

    pub fn try_flat_map<R, E, F>(&self, bind: F) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        E: Into<Error>,
        F: FnOnce(T) -> Result<Promise<R>, E> + Send + 'static,
    {
        self.try_flat_map_in(&ExecutionContext::inherit(), bind)
    }

    pub fn try_flat_map_in<R, E, F>(&self, context: &ExecutionContext, bind: F) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        E: Into<Error>,
        F: FnOnce(T) -> Result<Promise<R>, E> + Send + 'static,
    {
        let context = context.or(self.context());
        let placeholder = Promise::new_in(&context);
        let output = placeholder.clone();
        self.on_complete_in(&context, move |value| {
            let downstream = match value {
                Either::Result(value) => settle(move || bind(value)),
                Either::Failure(err) => Either::Failure(err),
            };
            match downstream {
                Either::Result(downstream) => {
                    let forward = output.clone();
                    downstream.on_complete_in(output.context(), move |value| {
                        forward.fulfill(value);
                    });
                }
                Either::Failure(err) => {
                    output.fulfill(Either::Failure(err));
                }
            }
        });
        placeholder
    }

    /// Keep the value only if `predicate` accepts it; otherwise fail with
    /// [`Error::FilterNotPassed`].
    ///
    /// # Examples
    ///
    /// ```
    /// use promissory::{Error, Promise};
    /// use futures::executor::block_on;
    ///
    /// let even = Promise::resolved(4).filter(|x| x % 2 == 0);
    /// assert_eq!(block_on(even.completion()).into_result().ok(), Some(4));
    ///
    /// let odd = Promise::resolved(3).filter(|x| x % 2 == 0);
    /// let err = block_on(odd.completion()).into_result().unwrap_err();
    /// assert!(matches!(err, Error::FilterNotPassed));
    /// ```
    pub fn filter<F>(&self, predicate: F) -> Promise<T>
    where
        F: FnOnce(&T) -> bool + Send + 'static,
    {
        self.filter_in(&ExecutionContext::inherit(), predicate)
    }

    pub fn filter_in<F>(&self, context: &ExecutionContext, predicate: F) -> Promise<T>
    where
        F: FnOnce(&T) -> bool + Send + 'static,
    {
        self.try_filter_in(context, move |value| Ok::<_, Error>(predicate(value)))
    }

    pub fn try_filter<E, F>(&self, predicate: F) -> Promise<T>
    where
        E: Into<Error>,
        F: FnOnce(&T) -> Result<bool, E> + Send + 'static,
    {
        self.try_filter_in(&ExecutionContext::inherit(), predicate)
    }

    pub fn try_filter_in<E, F>(&self, context: &ExecutionContext, predicate: F) -> Promise<T>
    where
        E: Into<Error>,
        F: FnOnce(&T) -> Result<bool, E> + Send + 'static,
    {
        self.try_map_in(context, move |value| match predicate(&value) {
            Ok(true) => Ok(value),
            Ok(false) => Err(Error::FilterNotPassed),
            Err(err) => Err(err.into()),
        })
    }
}

/// `promise >> f` is `promise.flat_map(f)`.
impl<T, R, F> Shr<F> for Promise<T>
where
    T: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    F: FnOnce(T) -> Promise<R> + Send + 'static,
{
    type Output = Promise<R>;

    fn shr(self, bind: F) -> Promise<R> {
        self.flat_map(bind)
    }
}

impl<T, R, F> Shr<F> for &Promise<T>
where
    T: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    F: FnOnce(T) -> Promise<R> + Send + 'static,
{
    type Output = Promise<R>;

    fn shr(self, bind: F) -> Promise<R> {
        self.flat_map(bind)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Either, Error, ExecutionContext, Promise, SerialQueue};
    use futures::executor::block_on;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn settled<T: Clone + Send + Sync + 'static>(promise: &Promise<T>) -> Either<T> {
        block_on(promise.completion())
    }

    #[test]
    fn test_map_value() {
        let doubled = Promise::resolved(21).map(|x| x * 2);
        assert_eq!(settled(&doubled).into_result().ok(), Some(42));
    }

    #[test]
    fn test_map_passes_failure_without_calling() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let mapped = Promise::<i32>::failed("offline").map(move |x| {
            flag.store(true, Ordering::SeqCst);
            x + 1
        });
        let err = settled(&mapped).into_result().unwrap_err();
        assert_eq!(err.to_string(), "offline");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_try_map_error_and_panic() {
        let parsed = Promise::resolved(String::from("12x"))
            .try_map(|s| s.parse::<u32>().map_err(|e| e.to_string()));
        assert!(matches!(settled(&parsed), Either::Failure(Error::Message(_))));

        let exploded = Promise::resolved(1).map(|_: i32| -> i32 { panic!("bad transform") });
        assert!(matches!(settled(&exploded), Either::Failure(Error::Panicked(_))));
    }

    #[test]
    fn test_map_before_fulfill() {
        let source = Promise::<&'static str>::new();
        let lengths = source.map(str::len);
        assert!(!lengths.is_fulfilled());
        let producer = source.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.resolve("forecast");
        });
        assert_eq!(settled(&lengths).into_result().ok(), Some(8));
        assert!(source.is_fulfilled());
    }

    #[test]
    fn test_map_context_inheritance() {
        let queue = ExecutionContext::new(SerialQueue::new("test-inherit").unwrap());
        let source = Promise::<u8>::new_in(&queue);
        let inherited = source.map(|x| x);
        assert!(ExecutionContext::ptr_eq(inherited.context(), &queue));

        let explicit = source.map_in(&ExecutionContext::worker(), |x| x);
        assert!(!ExecutionContext::ptr_eq(explicit.context(), &queue));
        assert!(ExecutionContext::ptr_eq(explicit.context(), &ExecutionContext::worker()));
        source.resolve(1);
        assert_eq!(settled(&explicit).into_result().ok(), Some(1));
    }

    #[test]
    fn test_flat_map_sequencing() {
        let chained = Promise::resolved(1)
            .flat_map(|x| Promise::spawn(move || Ok::<_, Error>(x + 1)));
        assert_eq!(settled(&chained).into_result().ok(), Some(2));
    }

    #[test]
    fn test_flat_map_returns_before_upstream_settles() {
        let source = Promise::<i32>::new();
        let inner = Promise::<String>::new();
        let downstream = inner.clone();
        let chained = source.flat_map(move |_| downstream);
        assert!(!chained.is_fulfilled());

        source.resolve(5);
        thread::sleep(Duration::from_millis(20));
        assert!(!chained.is_fulfilled());

        inner.resolve("later".into());
        assert_eq!(settled(&chained).into_result().ok().as_deref(), Some("later"));
    }

    #[test]
    fn test_flat_map_failures() {
        let upstream_failed = Promise::<i32>::failed("upstream").flat_map(|x| Promise::resolved(x));
        assert_eq!(settled(&upstream_failed).into_result().unwrap_err().to_string(), "upstream");

        let bind_failed = Promise::resolved(1).try_flat_map(|_| Err::<Promise<i32>, _>("bind"));
        assert_eq!(settled(&bind_failed).into_result().unwrap_err().to_string(), "bind");

        let downstream_failed =
            Promise::resolved(1).flat_map(|_| Promise::<i32>::failed("downstream"));
        assert_eq!(
            settled(&downstream_failed).into_result().unwrap_err().to_string(),
            "downstream"
        );
    }

    #[test]
    fn test_bind_operator_on_reference() {
        let source = Promise::resolved(10);
        let chained = &source >> |x: i32| Promise::resolved(x * 3);
        assert_eq!(settled(&chained).into_result().ok(), Some(30));
        assert_eq!(source.result(), Some(10));
    }

    #[test]
    fn test_filter() {
        let kept = Promise::resolved(4).filter(|x| x % 2 == 0);
        assert_eq!(settled(&kept).into_result().ok(), Some(4));

        let rejected = Promise::resolved(3).filter(|x| x % 2 == 0);
        assert!(matches!(settled(&rejected), Either::Failure(Error::FilterNotPassed)));

        let passed_through = Promise::<i32>::failed("before").filter(|_| true);
        assert_eq!(settled(&passed_through).into_result().unwrap_err().to_string(), "before");

        let predicate_failed = Promise::resolved(3).try_filter(|_| Err::<bool, _>("predicate"));
        assert_eq!(
            settled(&predicate_failed).into_result().unwrap_err().to_string(),
            "predicate"
        );
    }
}
