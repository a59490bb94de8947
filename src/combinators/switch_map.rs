//! Switch to a new inner stream on every outer value

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StreamResult;
use crate::pipe::Pipe;
use crate::pull_loop::PullLoop;
use crate::pull_stream::PullStream;
use crate::queue::Controller;
use crate::transform::{transform_stream, Transform};

struct SwitchMap<F> {
    f: F,
    active: Option<PullLoop>,
    generation: Arc<AtomicU64>,
}

#[async_trait]
impl<I, O, F> Transform<I, O> for SwitchMap<F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> PullStream<O> + Send + 'static,
{
    async fn transform(&mut self, chunk: I, output: &Controller<O>) -> StreamResult<()> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(mut previous) = self.active.take() {
            log::trace!("switch_map: cancelling inner stream {}", generation - 1);
            previous.cancel();
        }

        let inner = (self.f)(chunk);
        let upstream = vec![inner.cancel_handle()];
        self.active = Some(PullLoop::spawn(
            "switch_map",
            output,
            upstream,
            forward_current(inner, output.clone(), Arc::clone(&self.generation), generation),
        )?);
        Ok(())
    }

    async fn flush(&mut self, _output: &Controller<O>) -> StreamResult<()> {
        // The output stays open until the last inner stream has drained
        if let Some(active) = self.active.as_mut() {
            active.join().await;
        }
        Ok(())
    }
}

async fn forward_current<O>(
    mut inner: PullStream<O>,
    output: Controller<O>,
    generation: Arc<AtomicU64>,
    current: u64,
) -> StreamResult<()>
where
    O: Send + 'static,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = output.closed() => return Ok(()),
            next = inner.read() => next?,
        };
        let Some(value) = next else {
            return Ok(());
        };
        // Checked under the output lock: aborting this task does not stop it
        // mid-poll on another worker.
        let still_current = || generation.load(Ordering::Acquire) == current;
        if !output.send_if(value, still_current).await? {
            return Ok(());
        }
    }
}

/// For each outer value, forward the stream `f` derives from it, cancelling
/// the previously derived stream.
///
/// The output ends once the outer stream and the last inner stream have
/// ended. A panic in `f` ends the output with a `switch_map` transform error.
pub fn switch_map<I, O, F>(f: F) -> Pipe<I, O>
where
    F: FnMut(I) -> PullStream<O> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| {
        transform_stream(
            input,
            "switch_map",
            SwitchMap {
                f,
                active: None,
                generation: Arc::new(AtomicU64::new(0)),
            },
        )
    })
}
