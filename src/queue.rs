//! Bounded queue and state machine shared by a stream's producer and reader
//!
//! A stream is a [`Shared`] cell holding the queue, the lifecycle state and
//! the underlying source. The reader side lives in
//! [`PullStream`](crate::pull_stream::PullStream); producers hold a cloneable
//! [`Controller`]. The mutex is never held across an `.await`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::{StreamError, StreamResult};
use crate::pull_stream::Source;
use crate::stream_configuration::StreamConfig;

/// Lifecycle of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Constructed, nothing acquired yet
    Idle,
    /// Started and accepting values
    Active,
    /// Ended normally; queued values are still delivered
    Terminated,
    /// Ended with an error; queued values were discarded
    Errored,
    /// Cancelled by the consumer; queued values were discarded
    Cancelled,
}

impl StreamState {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            StreamState::Terminated | StreamState::Errored | StreamState::Cancelled
        )
    }
}

/// Returned by [`Controller::try_enqueue`] with the rejected value
#[derive(Debug, PartialEq, Eq)]
pub enum TryEnqueueError<T> {
    /// No remaining capacity; retry once the reader drains the queue
    Full(T),
    /// The stream no longer accepts values
    Closed(T),
}

impl<T> TryEnqueueError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryEnqueueError::Full(value) | TryEnqueueError::Closed(value) => value,
        }
    }
}

pub(crate) struct Inner<T> {
    state: StreamState,
    queue: VecDeque<T>,
    capacity: usize,
    error: Option<StreamError>,
    source: Option<Box<dyn Source<T>>>,
    label: Option<String>,
}

pub(crate) struct Shared<T> {
    inner: Mutex<Inner<T>>,
    /// Woken when a value is queued or the state changes
    readable: Notify,
    /// Woken when capacity is freed or the state changes
    changed: Notify,
}

impl<T> Shared<T>
where
    T: Send + 'static,
{
    pub(crate) fn new(source: Box<dyn Source<T>>, config: StreamConfig) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                state: StreamState::Idle,
                queue: VecDeque::new(),
                capacity: config.high_water_mark.max(1),
                error: None,
                source: Some(source),
                label: config.label,
            }),
            readable: Notify::new(),
            changed: Notify::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> StreamState {
        self.lock().state
    }

    /// Only honoured while idle; returns false once the stream has started
    pub(crate) fn configure(&self, config: StreamConfig) -> bool {
        let mut inner = self.lock();
        if inner.state != StreamState::Idle {
            return false;
        }
        inner.capacity = config.high_water_mark.max(1);
        if config.label.is_some() {
            inner.label = config.label;
        }
        true
    }

    pub(crate) fn label(&self) -> String {
        self.lock().label.clone().unwrap_or_else(|| "stream".to_string())
    }

    /// Move from `Idle` to `Active` and run the source's `start`
    pub(crate) fn start(self: &Arc<Self>) -> StreamResult<()> {
        let (source, label) = {
            let mut inner = self.lock();
            match inner.state {
                StreamState::Idle => {
                    inner.state = StreamState::Active;
                    (inner.source.take(), inner.label.clone())
                }
                StreamState::Errored => {
                    return Err(inner.error.clone().unwrap_or(StreamError::Closed));
                }
                _ => return Ok(()),
            }
        };
        let Some(mut source) = source else {
            return Ok(());
        };

        log::debug!("{}: starting", label.as_deref().unwrap_or("stream"));
        let result = source.start(Controller {
            shared: Arc::clone(self),
        });
        if let Err(e) = &result {
            log::warn!(
                "{}: start failed: {}",
                label.as_deref().unwrap_or("stream"),
                e
            );
            self.finish(StreamState::Errored, Some(e.clone()));
        }

        // The source may have ended the stream while starting; it then missed
        // the release in `finish` and has to be released here.
        let leftover = {
            let mut inner = self.lock();
            if inner.state == StreamState::Active {
                inner.source = Some(source);
                None
            } else {
                Some(source)
            }
        };
        if let Some(mut source) = leftover {
            source.cancel();
        }
        result
    }

    /// Leave `Idle`/`Active` for a terminal state, releasing the source once.
    /// Returns false if the stream had already finished.
    pub(crate) fn finish(&self, next: StreamState, error: Option<StreamError>) -> bool {
        let (was_active, source, label) = {
            let mut inner = self.lock();
            if inner.state.is_finished() {
                return false;
            }
            let was_active = inner.state == StreamState::Active;
            inner.state = next;
            if next != StreamState::Terminated {
                inner.queue.clear();
            }
            inner.error = error;
            (was_active, inner.source.take(), inner.label.clone())
        };

        log::debug!(
            "{}: {:?}",
            label.as_deref().unwrap_or("stream"),
            next
        );
        self.readable.notify_waiters();
        self.changed.notify_waiters();

        if let Some(mut source) = source {
            // An idle source never acquired anything; dropping it releases
            // whatever upstream streams it owns.
            if was_active {
                source.cancel();
            }
        }
        true
    }

    pub(crate) async fn read(&self) -> StreamResult<Option<T>> {
        loop {
            let notified = self.readable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut inner = self.lock();
                if let Some(value) = inner.queue.pop_front() {
                    drop(inner);
                    self.changed.notify_waiters();
                    return Ok(Some(value));
                }
                match inner.state {
                    StreamState::Active => {}
                    StreamState::Errored => {
                        return Err(inner.error.clone().unwrap_or(StreamError::Closed));
                    }
                    _ => return Ok(None),
                }
            }
            notified.await;
        }
    }

    /// Free capacity; a stream that has not started yet reports all of it
    pub(crate) fn desired_size(&self) -> usize {
        let inner = self.lock();
        match inner.state {
            StreamState::Idle | StreamState::Active => {
                inner.capacity.saturating_sub(inner.queue.len())
            }
            _ => 0,
        }
    }

    pub(crate) fn stats(&self) -> QueueStats {
        let inner = self.lock();
        let length = inner.queue.len();
        QueueStats {
            length,
            capacity: inner.capacity,
            utilization: length as f64 / inner.capacity as f64,
            state: inner.state,
        }
    }
}

/// Producer handle for one stream
pub struct Controller<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Controller<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Controller<T>
where
    T: Send + 'static,
{
    /// Queue a value, waiting while the queue is full.
    ///
    /// Fails with [`StreamError::Cancelled`] or [`StreamError::Closed`] once the
    /// stream stops accepting values; producers should stop on any error.
    pub async fn send(&self, value: T) -> StreamResult<()> {
        self.send_if(value, || true).await.map(|_| ())
    }

    /// Like `send`, but `still_wanted` is checked under the queue lock right
    /// before the value is queued. Returns `Ok(false)` and drops the value if
    /// it no longer holds.
    pub(crate) async fn send_if<C>(&self, value: T, still_wanted: C) -> StreamResult<bool>
    where
        C: Fn() -> bool,
    {
        loop {
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut inner = self.shared.lock();
                match inner.state {
                    StreamState::Active => {
                        if !still_wanted() {
                            return Ok(false);
                        }
                        if inner.queue.len() < inner.capacity {
                            inner.queue.push_back(value);
                            drop(inner);
                            self.shared.readable.notify_waiters();
                            return Ok(true);
                        }
                    }
                    StreamState::Cancelled => return Err(StreamError::Cancelled),
                    _ => return Err(StreamError::Closed),
                }
            }
            notified.await;
        }
    }

    /// Queue a value without waiting; the value is handed back on failure
    pub fn try_enqueue(&self, value: T) -> Result<(), TryEnqueueError<T>> {
        let mut inner = self.shared.lock();
        if inner.state != StreamState::Active {
            return Err(TryEnqueueError::Closed(value));
        }
        if inner.queue.len() >= inner.capacity {
            return Err(TryEnqueueError::Full(value));
        }
        inner.queue.push_back(value);
        drop(inner);
        self.shared.readable.notify_waiters();
        Ok(())
    }

    /// Remaining capacity; zero once the stream has finished
    pub fn desired_size(&self) -> usize {
        self.shared.desired_size()
    }

    pub fn is_active(&self) -> bool {
        self.shared.state() == StreamState::Active
    }

    /// Resolves once the stream has ended, errored or been cancelled
    pub async fn closed(&self) {
        loop {
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.state().is_finished() {
                return;
            }
            notified.await;
        }
    }

    /// End the stream normally; queued values are still delivered
    pub fn close(&self) {
        self.shared.finish(StreamState::Terminated, None);
    }

    /// End the stream with an error, discarding queued values
    pub fn error(&self, error: StreamError) {
        let label = self.shared.label();
        if self.shared.finish(StreamState::Errored, Some(error.clone())) {
            log::warn!("{}: errored: {}", label, error);
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.stats()
    }
}

impl<T> fmt::Debug for Controller<T>
where
    T: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("stats", &self.shared.stats())
            .finish()
    }
}

/// Type-erased handle that can cancel a stream without owning its reader
pub(crate) trait Cancel: Send + Sync {
    fn cancel(&self);
}

impl<T> Cancel for Shared<T>
where
    T: Send + 'static,
{
    fn cancel(&self) {
        self.finish(StreamState::Cancelled, None);
    }
}

/// Cancels an upstream stream from the loop that reads it
#[derive(Clone)]
pub struct CancelHandle {
    target: Arc<dyn Cancel>,
}

impl CancelHandle {
    pub(crate) fn new<T>(shared: Arc<Shared<T>>) -> Self
    where
        T: Send + 'static,
    {
        Self { target: shared }
    }

    pub fn cancel(&self) {
        self.target.cancel();
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CancelHandle")
    }
}

/// Queue statistics for monitoring and debugging
#[derive(Debug, Clone)]
pub struct QueueStats {
    pub length: usize,
    pub capacity: usize,
    pub utilization: f64, // 0.0 to 1.0
    pub state: StreamState,
}

impl fmt::Display for QueueStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Queue({}/{}, {:.1}%, {:?})",
            self.length,
            self.capacity,
            self.utilization * 100.0,
            self.state
        )
    }
}
