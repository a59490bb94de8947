//! Fan-in of several streams into one

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::StreamResult;
use crate::pull_loop::{forward, PullLoop};
use crate::pull_stream::{PullStream, Source};
use crate::queue::Controller;

struct MergeSource<T>
where
    T: Send + 'static,
{
    inputs: Vec<PullStream<T>>,
    loops: Vec<PullLoop>,
}

impl<T> Source<T> for MergeSource<T>
where
    T: Send + 'static,
{
    fn start(&mut self, controller: Controller<T>) -> StreamResult<()> {
        if self.inputs.is_empty() {
            controller.close();
            return Ok(());
        }

        let remaining = Arc::new(AtomicUsize::new(self.inputs.len()));
        for input in self.inputs.drain(..) {
            let upstream = vec![input.cancel_handle()];
            let pull_loop = PullLoop::spawn(
                "merge",
                &controller,
                upstream,
                merge_one(input, controller.clone(), Arc::clone(&remaining)),
            )?;
            self.loops.push(pull_loop);
        }
        log::debug!("merge: started {} pull loops", self.loops.len());
        Ok(())
    }

    fn cancel(&mut self) {
        for mut pull_loop in self.loops.drain(..) {
            pull_loop.cancel();
        }
    }
}

async fn merge_one<T>(
    input: PullStream<T>,
    output: Controller<T>,
    remaining: Arc<AtomicUsize>,
) -> StreamResult<()>
where
    T: Send + 'static,
{
    forward(input, output.clone()).await?;
    // The last input to end closes the merged stream
    if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
        output.close();
    }
    Ok(())
}

/// Interleave values of all `streams` in arrival order.
///
/// Each input keeps its own order. The result ends once every input has
/// ended; with no inputs it ends immediately. A single input is returned
/// as is.
pub fn merge<T>(mut streams: Vec<PullStream<T>>) -> PullStream<T>
where
    T: Send + 'static,
{
    if streams.len() == 1 {
        if let Some(only) = streams.pop() {
            return only;
        }
    }
    PullStream::new(MergeSource {
        inputs: streams,
        loops: Vec::new(),
    })
    .with_label("merge")
}
