//! Finite stream constructors

use futures_core::Stream;
use futures_util::stream::{self, StreamExt};

use crate::error::StreamResult;
use crate::pull_loop::PullLoop;
use crate::pull_stream::{PullStream, Source};
use crate::queue::Controller;

/// A stream that ends as soon as it is read
pub fn empty<O>() -> PullStream<O>
where
    O: Send + 'static,
{
    struct Empty;

    impl<O> Source<O> for Empty
    where
        O: Send + 'static,
    {
        fn start(&mut self, controller: Controller<O>) -> StreamResult<()> {
            controller.close();
            Ok(())
        }
    }

    PullStream::new(Empty).with_label("empty")
}

/// Create a stream from an iterator
pub fn from_iter<I, O>(iter: I) -> PullStream<O>
where
    I: IntoIterator<Item = O> + Send + 'static,
    <I as IntoIterator>::IntoIter: Send,
    O: Send + 'static,
{
    from_stream(stream::iter(iter)).with_label("from_iter")
}

struct FromStream<S> {
    inner: Option<S>,
    task: Option<PullLoop>,
}

impl<S, O> Source<O> for FromStream<S>
where
    S: Stream<Item = O> + Send + 'static,
    O: Send + 'static,
{
    fn start(&mut self, controller: Controller<O>) -> StreamResult<()> {
        let Some(inner) = self.inner.take() else {
            return Ok(());
        };
        let output = controller.clone();
        self.task = Some(PullLoop::spawn(
            "from_stream",
            &controller,
            Vec::new(),
            drain_into(inner, output),
        )?);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.cancel();
        }
    }
}

async fn drain_into<S, O>(inner: S, output: Controller<O>) -> StreamResult<()>
where
    S: Stream<Item = O> + Send + 'static,
    O: Send + 'static,
{
    let mut inner = Box::pin(inner);
    while let Some(item) = inner.next().await {
        output.send(item).await?;
    }
    output.close();
    Ok(())
}

/// Pull values from any `futures` stream, honouring the queue's capacity
pub fn from_stream<S, O>(s: S) -> PullStream<O>
where
    S: Stream<Item = O> + Send + 'static,
    O: Send + 'static,
{
    PullStream::new(FromStream {
        inner: Some(s),
        task: None,
    })
    .with_label("from_stream")
}
