//! Pull loops: tasks that drain one upstream stream into a downstream queue

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::error::{StreamError, StreamResult};
use crate::pull_stream::PullStream;
use crate::queue::{CancelHandle, Controller};

/// A spawned loop feeding a downstream controller.
///
/// The loop's failure, whether a returned error or a panic, becomes the error
/// termination of its downstream. Cancelling or dropping the loop aborts the
/// task and cancels the upstream streams registered with it.
pub struct PullLoop {
    stage: &'static str,
    task: JoinHandle<()>,
    joined: bool,
    upstream: Vec<CancelHandle>,
}

impl PullLoop {
    pub fn spawn<T, F>(
        stage: &'static str,
        downstream: &Controller<T>,
        upstream: Vec<CancelHandle>,
        body: F,
    ) -> StreamResult<Self>
    where
        T: Send + 'static,
        F: Future<Output = StreamResult<()>> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()?;
        let downstream = downstream.clone();
        let task = runtime.spawn(async move {
            match AssertUnwindSafe(body).catch_unwind().await {
                Ok(Ok(())) => log::trace!("{}: loop finished", stage),
                Ok(Err(e)) => downstream.error(e),
                Err(panic) => {
                    downstream.error(StreamError::transform(stage, panic_message(panic.as_ref())))
                }
            }
        });
        Ok(Self {
            stage,
            task,
            joined: false,
            upstream,
        })
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end on its own; returns at once if already joined
    pub async fn join(&mut self) {
        if self.joined {
            return;
        }
        let _ = (&mut self.task).await;
        self.joined = true;
    }

    pub fn cancel(&mut self) {
        self.task.abort();
        for upstream in self.upstream.drain(..) {
            upstream.cancel();
        }
    }
}

impl Drop for PullLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Forward every value of `input` to `output` until either side ends.
///
/// A read in flight is abandoned as soon as `output` stops accepting values.
pub(crate) async fn forward<T>(mut input: PullStream<T>, output: Controller<T>) -> StreamResult<()>
where
    T: Send + 'static,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = output.closed() => return Ok(()),
            next = input.read() => next?,
        };
        match next {
            Some(value) => output.send(value).await?,
            None => return Ok(()),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_string()
    }
}
