use std::sync::Arc;

use crate::{Error, ExecutionContext, Promise};

/// Outcome of [`Promise::select`]: the promise that completed first and the
/// others, in their original order.
pub type Selected<T> = (Promise<T>, Vec<Promise<T>>);

impl<T: Clone + Send + Sync + 'static> Promise<T> {
    /// Gather the values of `promises`, in input order, into one promise.
    ///
    /// Fails as soon as a failure is observed along the chain. Which failure
    /// wins when several inputs fail concurrently is not specified.
    ///
    /// # Examples
    ///
    /// ```
    /// use promissory::Promise;
    /// use futures::executor::block_on;
    ///
    /// let all = Promise::collect(vec![
    ///     Promise::resolved(1),
    ///     Promise::resolved(2),
    ///     Promise::resolved(3),
    /// ]);
    /// assert_eq!(block_on(all.completion()).into_result().ok(), Some(vec![1, 2, 3]));
    /// ```
    pub fn collect<I>(promises: I) -> Promise<Vec<T>>
    where
        I: IntoIterator<Item = Promise<T>>,
    {
        Self::collect_in(&ExecutionContext::worker(), promises)
    }

    pub fn collect_in<I>(context: &ExecutionContext, promises: I) -> Promise<Vec<T>>
    where
        I: IntoIterator<Item = Promise<T>>,
    {
        let context = context.or(&ExecutionContext::worker());
        let empty = Promise::resolved_in(&context, Vec::new());
        promises.into_iter().fold(empty, |gathered, promise| {
            promise.flat_map_in(&context, move |item| {
                gathered.map(move |mut items| {
                    items.push(item);
                    items
                })
            })
        })
    }

    /// Race `promises`: resolves with whichever completes first, success or
    /// failure, together with the rest.
    ///
    /// An empty input fails with [`Error::NothingToSelect`].
    pub fn select<I>(promises: I) -> Promise<Selected<T>>
    where
        I: IntoIterator<Item = Promise<T>>,
    {
        Self::select_in(&ExecutionContext::worker(), promises)
    }

    pub fn select_in<I>(context: &ExecutionContext, promises: I) -> Promise<Selected<T>>
    where
        I: IntoIterator<Item = Promise<T>>,
    {
        let context = context.or(&ExecutionContext::worker());
        let raced = Promise::new_in(&context);
        let promises: Arc<Vec<Promise<T>>> = Arc::new(promises.into_iter().collect());
        if promises.is_empty() {
            raced.reject(Error::NothingToSelect);
            return raced;
        }
        for (index, promise) in promises.iter().enumerate() {
            let candidates = promises.clone();
            let output = raced.clone();
            promise.on_complete_in(&context, move |_| {
                let mut rest = candidates.to_vec();
                let winner = rest.remove(index);
                output.resolve((winner, rest));
            });
        }
        raced
    }
}
