use std::fmt::Display;

use crate::combinators;
use crate::pull_stream::PullStream;

/// Extension trait providing the combinators as methods on [`PullStream`]
pub trait PullStreamExt<T>: Sized
where
    T: Send + 'static,
{
    /// Map elements of the stream with a function
    fn map<U, F>(self, f: F) -> PullStream<U>
    where
        F: FnMut(T) -> U + Send + 'static,
        U: Send + 'static;

    /// Map elements with a fallible function; the first error ends the stream
    fn try_map<U, E, F>(self, f: F) -> PullStream<U>
    where
        F: FnMut(T) -> Result<U, E> + Send + 'static,
        E: Display + 'static,
        U: Send + 'static;

    /// Forward the stream derived from the latest element only
    fn switch_map<U, F>(self, f: F) -> PullStream<U>
    where
        F: FnMut(T) -> PullStream<U> + Send + 'static,
        U: Send + 'static;

    /// Forward elements until `notifier` produces a value or ends
    fn take_until<N>(self, notifier: PullStream<N>) -> PullStream<T>
    where
        N: Send + 'static;

    /// Emit `(previous, current)` pairs
    fn pairwise(self) -> PullStream<(T, T)>
    where
        T: Clone;

    /// Interleave with `other` in arrival order
    fn merge(self, other: PullStream<T>) -> PullStream<T>;
}

impl<T> PullStreamExt<T> for PullStream<T>
where
    T: Send + 'static,
{
    fn map<U, F>(self, f: F) -> PullStream<U>
    where
        F: FnMut(T) -> U + Send + 'static,
        U: Send + 'static,
    {
        self.pipe_through(combinators::map(f))
    }

    fn try_map<U, E, F>(self, f: F) -> PullStream<U>
    where
        F: FnMut(T) -> Result<U, E> + Send + 'static,
        E: Display + 'static,
        U: Send + 'static,
    {
        self.pipe_through(combinators::try_map(f))
    }

    fn switch_map<U, F>(self, f: F) -> PullStream<U>
    where
        F: FnMut(T) -> PullStream<U> + Send + 'static,
        U: Send + 'static,
    {
        self.pipe_through(combinators::switch_map(f))
    }

    fn take_until<N>(self, notifier: PullStream<N>) -> PullStream<T>
    where
        N: Send + 'static,
    {
        self.pipe_through(combinators::take_until(notifier))
    }

    fn pairwise(self) -> PullStream<(T, T)>
    where
        T: Clone,
    {
        self.pipe_through(combinators::pairwise())
    }

    fn merge(self, other: PullStream<T>) -> PullStream<T> {
        combinators::merge(vec![self, other])
    }
}
