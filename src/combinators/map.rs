//! Stateless 1:1 transforms

use std::fmt::Display;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::{StreamError, StreamResult};
use crate::pipe::Pipe;
use crate::queue::Controller;
use crate::transform::{transform_stream, Transform};

struct Map<F> {
    f: F,
}

#[async_trait]
impl<I, O, F> Transform<I, O> for Map<F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> O + Send + 'static,
{
    async fn transform(&mut self, chunk: I, output: &Controller<O>) -> StreamResult<()> {
        output.send((self.f)(chunk)).await
    }
}

struct TryMap<F, E> {
    f: F,
    _error: PhantomData<fn() -> E>,
}

#[async_trait]
impl<I, O, E, F> Transform<I, O> for TryMap<F, E>
where
    I: Send + 'static,
    O: Send + 'static,
    E: Display + 'static,
    F: FnMut(I) -> Result<O, E> + Send + 'static,
{
    async fn transform(&mut self, chunk: I, output: &Controller<O>) -> StreamResult<()> {
        let value = (self.f)(chunk).map_err(|e| StreamError::transform("map", e.to_string()))?;
        output.send(value).await
    }
}

/// Create a pipe that applies the given function to each element
///
/// A panic in `f` ends the output with a `map` transform error.
pub fn map<I, O, F>(f: F) -> Pipe<I, O>
where
    F: FnMut(I) -> O + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| transform_stream(input, "map", Map { f }))
}

/// Like [`map`], for a fallible function; the first `Err` ends the output
/// with a `map` transform error and releases the input
pub fn try_map<I, O, E, F>(f: F) -> Pipe<I, O>
where
    F: FnMut(I) -> Result<O, E> + Send + 'static,
    E: Display + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| {
        transform_stream(
            input,
            "map",
            TryMap {
                f,
                _error: PhantomData,
            },
        )
    })
}
