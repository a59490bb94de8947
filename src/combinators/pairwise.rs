use async_trait::async_trait;

use crate::error::StreamResult;
use crate::pipe::Pipe;
use crate::queue::Controller;
use crate::transform::{transform_stream, Transform};

struct Pairwise<T> {
    last: Option<T>,
}

#[async_trait]
impl<T> Transform<T, (T, T)> for Pairwise<T>
where
    T: Clone + Send + 'static,
{
    async fn transform(&mut self, chunk: T, output: &Controller<(T, T)>) -> StreamResult<()> {
        match self.last.replace(chunk.clone()) {
            Some(previous) => output.send((previous, chunk)).await,
            None => Ok(()),
        }
    }
}

/// Emit `(previous, current)` for every element after the first
pub fn pairwise<T>() -> Pipe<T, (T, T)>
where
    T: Clone + Send + 'static,
{
    Pipe::new(|input| transform_stream(input, "pairwise", Pairwise { last: None }))
}
