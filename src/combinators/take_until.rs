use async_trait::async_trait;

use crate::error::StreamResult;
use crate::pipe::Pipe;
use crate::pull_loop::PullLoop;
use crate::pull_stream::PullStream;
use crate::queue::Controller;
use crate::transform::{transform_stream, Transform};

struct TakeUntil<N>
where
    N: Send + 'static,
{
    notifier: Option<PullStream<N>>,
    watcher: Option<PullLoop>,
}

#[async_trait]
impl<T, N> Transform<T, T> for TakeUntil<N>
where
    T: Send + 'static,
    N: Send + 'static,
{
    fn start(&mut self, output: &Controller<T>) -> StreamResult<()> {
        if let Some(notifier) = self.notifier.take() {
            let upstream = vec![notifier.cancel_handle()];
            self.watcher = Some(PullLoop::spawn(
                "take_until",
                output,
                upstream,
                watch(notifier, output.clone()),
            )?);
        }
        Ok(())
    }

    async fn transform(&mut self, chunk: T, output: &Controller<T>) -> StreamResult<()> {
        output.send(chunk).await
    }
}

/// One-shot read of the notifier; its first value or its end closes the output
async fn watch<N, T>(mut notifier: PullStream<N>, output: Controller<T>) -> StreamResult<()>
where
    N: Send + 'static,
    T: Send + 'static,
{
    let fired = tokio::select! {
        biased;
        _ = output.closed() => return Ok(()),
        fired = notifier.read() => fired?,
    };
    log::debug!(
        "take_until: notifier {}, closing output",
        if fired.is_some() { "fired" } else { "ended" }
    );
    output.close();
    Ok(())
}

/// Forward values until `notifier` produces its first value or ends.
///
/// The notifier's value itself is not forwarded. Once it fires the source is
/// cancelled, not merely ignored.
pub fn take_until<T, N>(notifier: PullStream<N>) -> Pipe<T, T>
where
    T: Send + 'static,
    N: Send + 'static,
{
    Pipe::new(move |input| {
        transform_stream(
            input,
            "take_until",
            TakeUntil {
                notifier: Some(notifier),
                watcher: None,
            },
        )
    })
}
