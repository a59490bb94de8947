//! Transform streams: one input stream in, one output stream out
//!
//! A [`Transform`] sees every input value in order and writes any number of
//! output values through the output's [`Controller`]. [`transform_stream`]
//! drives it with a single pull loop that stops reading as soon as the output
//! stops accepting values.

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::StreamResult;
use crate::pull_loop::PullLoop;
use crate::pull_stream::{PullStream, Source};
use crate::queue::Controller;

#[async_trait]
pub trait Transform<I, O>: Send + 'static
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Runs when the output starts, before the first input value is read
    fn start(&mut self, _output: &Controller<O>) -> StreamResult<()> {
        Ok(())
    }

    async fn transform(&mut self, chunk: I, output: &Controller<O>) -> StreamResult<()>;

    /// Runs once the input has ended; the output is closed afterwards
    async fn flush(&mut self, _output: &Controller<O>) -> StreamResult<()> {
        Ok(())
    }
}

struct TransformSource<I, O, X>
where
    I: Send + 'static,
{
    stage: &'static str,
    input: Option<PullStream<I>>,
    transformer: Option<X>,
    driver: Option<PullLoop>,
    _output: PhantomData<fn() -> O>,
}

impl<I, O, X> Source<O> for TransformSource<I, O, X>
where
    I: Send + 'static,
    O: Send + 'static,
    X: Transform<I, O>,
{
    fn start(&mut self, controller: Controller<O>) -> StreamResult<()> {
        let (Some(input), Some(mut transformer)) = (self.input.take(), self.transformer.take())
        else {
            return Ok(());
        };
        transformer.start(&controller)?;
        let upstream = vec![input.cancel_handle()];
        self.driver = Some(PullLoop::spawn(
            self.stage,
            &controller,
            upstream,
            drive(input, transformer, controller.clone()),
        )?);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.cancel();
        }
    }
}

async fn drive<I, O, X>(
    mut input: PullStream<I>,
    mut transformer: X,
    output: Controller<O>,
) -> StreamResult<()>
where
    I: Send + 'static,
    O: Send + 'static,
    X: Transform<I, O>,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = output.closed() => return Ok(()),
            next = input.read() => next?,
        };
        match next {
            Some(chunk) => transformer.transform(chunk, &output).await?,
            None => {
                transformer.flush(&output).await?;
                output.close();
                return Ok(());
            }
        }
    }
}

/// Output stream of `transformer` applied to `input`.
///
/// `stage` names the combinator in logs and in the
/// [`Transform`](crate::error::StreamError::Transform) error raised when the
/// transformer panics.
pub fn transform_stream<I, O, X>(input: PullStream<I>, stage: &'static str, transformer: X) -> PullStream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    X: Transform<I, O>,
{
    PullStream::new(TransformSource {
        stage,
        input: Some(input),
        transformer: Some(transformer),
        driver: None,
        _output: PhantomData,
    })
    .with_label(stage)
}
