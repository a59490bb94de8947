//! Terminal consumers
//!
//! A pipeline ends in a [`WritableSink`]. `pipe_to` drains the stream into
//! it; the sink's `write` is awaited for every value, so a slow sink applies
//! backpressure all the way to the sources.

use std::future::Future;

use async_trait::async_trait;

use crate::error::{StreamError, StreamResult};
use crate::pull_stream::PullStream;

#[async_trait]
pub trait WritableSink<T>: Send
where
    T: Send + 'static,
{
    async fn write(&mut self, value: T) -> StreamResult<()>;

    /// Called after the last value of a stream that ended normally
    async fn close(&mut self) -> StreamResult<()> {
        Ok(())
    }

    /// Called when the stream or a write failed
    async fn abort(&mut self, _reason: &StreamError) {}
}

/// Sink calling a synchronous closure per value
pub struct FnSink<F> {
    f: F,
}

#[async_trait]
impl<T, F> WritableSink<T> for FnSink<F>
where
    T: Send + 'static,
    F: FnMut(T) -> StreamResult<()> + Send,
{
    async fn write(&mut self, value: T) -> StreamResult<()> {
        (self.f)(value)
    }
}

pub fn sink_fn<T, F>(f: F) -> FnSink<F>
where
    F: FnMut(T) -> StreamResult<()> + Send,
{
    FnSink { f }
}

/// Outcome of a pipe that ended normally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipeSummary {
    pub items_written: u64,
}

impl<T> PullStream<T>
where
    T: Send + 'static,
{
    /// Drain this stream into `sink`.
    ///
    /// A failed write cancels the stream, aborts the sink and returns the
    /// write error; a stream error aborts the sink and is returned.
    pub async fn pipe_to<S>(mut self, mut sink: S) -> StreamResult<PipeSummary>
    where
        S: WritableSink<T>,
    {
        let mut summary = PipeSummary::default();
        loop {
            match self.read().await {
                Ok(Some(value)) => {
                    if let Err(e) = sink.write(value).await {
                        log::warn!("pipe_to: sink write failed: {}", e);
                        self.cancel();
                        sink.abort(&e).await;
                        return Err(e);
                    }
                    summary.items_written += 1;
                }
                Ok(None) => {
                    sink.close().await?;
                    return Ok(summary);
                }
                Err(e) => {
                    sink.abort(&e).await;
                    return Err(e);
                }
            }
        }
    }

    /// Run `f` for every value, in order, awaiting each call
    pub async fn for_each<F, Fut>(mut self, mut f: F) -> StreamResult<PipeSummary>
    where
        F: FnMut(T) -> Fut + Send,
        Fut: Future<Output = ()> + Send,
    {
        let mut summary = PipeSummary::default();
        while let Some(value) = self.read().await? {
            f(value).await;
            summary.items_written += 1;
        }
        Ok(summary)
    }

    /// Read every value until the stream ends
    pub async fn collect(mut self) -> StreamResult<Vec<T>> {
        let mut values = Vec::new();
        while let Some(value) = self.read().await? {
            values.push(value);
        }
        Ok(values)
    }
}
