//! The single-reader pull stream
//!
//! A [`PullStream`] does nothing until it is first read. Reading starts its
//! [`Source`], which receives a [`Controller`] to feed the stream's bounded
//! queue. Cancelling the stream, or dropping it, releases the source exactly
//! once.

use std::fmt;
use std::sync::Arc;

use async_stream::stream;
use futures_util::stream::{BoxStream, StreamExt};

use crate::error::StreamResult;
use crate::queue::{CancelHandle, Cancel, Controller, QueueStats, Shared, StreamState};
use crate::stream_configuration::StreamConfig;

/// A boxed, heap-allocated `futures` stream
pub type BoxedStream<O> = BoxStream<'static, O>;

/// The producing side behind a [`PullStream`].
///
/// `start` runs once, on the first read, and acquires whatever the source
/// needs (listeners, timers, pull loops). `cancel` runs at most once, when the
/// started stream ends for any reason, and must release all of it.
pub trait Source<T>: Send + 'static {
    fn start(&mut self, controller: Controller<T>) -> StreamResult<()>;

    fn cancel(&mut self) {}
}

/// Single-reader, lazily started stream with backpressure and cancellation
pub struct PullStream<T>
where
    T: Send + 'static,
{
    shared: Arc<Shared<T>>,
}

impl<T> PullStream<T>
where
    T: Send + 'static,
{
    pub fn new<S>(source: S) -> Self
    where
        S: Source<T>,
    {
        Self {
            shared: Shared::new(Box::new(source), StreamConfig::default()),
        }
    }

    /// Apply a configuration; ignored with a warning once the stream started
    pub fn with_config(self, config: StreamConfig) -> Self {
        if !self.shared.configure(config) {
            log::warn!(
                "{}: configuration ignored, stream already started",
                self.shared.label()
            );
        }
        self
    }

    pub fn with_high_water_mark(self, high_water_mark: usize) -> Self {
        let config = StreamConfig {
            high_water_mark,
            label: None,
        };
        self.with_config(config)
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        let capacity = self.shared.stats().capacity;
        self.with_config(StreamConfig::default().with_high_water_mark(capacity).with_label(label))
    }

    /// Start the source now instead of on the first read
    pub fn start(&mut self) -> StreamResult<()> {
        self.shared.start()
    }

    /// Next value, `None` at end of stream (or after cancellation).
    ///
    /// An errored stream returns its error on every read.
    pub async fn read(&mut self) -> StreamResult<Option<T>> {
        self.shared.start()?;
        self.shared.read().await
    }

    /// Stop reading and release the source; safe to call repeatedly
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Handle that cancels this stream from elsewhere, e.g. the loop owner
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(Arc::clone(&self.shared))
    }

    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.stats()
    }

    /// Remaining queue capacity
    pub fn desired_size(&self) -> usize {
        self.shared.desired_size()
    }

    /// Convert into a `futures` stream; an error is yielded once, then the
    /// stream ends
    pub fn into_stream(self) -> BoxedStream<StreamResult<T>> {
        stream! {
            let mut s = self;
            loop {
                match s.read().await {
                    Ok(Some(value)) => yield Ok(value),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
        .boxed()
    }
}

impl<T> Drop for PullStream<T>
where
    T: Send + 'static,
{
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

impl<T> fmt::Debug for PullStream<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullStream")
            .field("label", &self.shared.label())
            .field("stats", &self.shared.stats())
            .finish()
    }
}
