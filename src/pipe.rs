use crate::pull_stream::PullStream;

/// A Pipe represents a stream transformation from one type to another.
/// It's a one-shot function from PullStream[I] to PullStream[O].
pub struct Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    f: Box<dyn FnOnce(PullStream<I>) -> PullStream<O> + Send + 'static>,
}

impl<I, O> Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Create a new pipe from a function
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(PullStream<I>) -> PullStream<O> + Send + 'static,
    {
        Pipe { f: Box::new(f) }
    }

    /// Apply this pipe to a stream
    pub fn apply(self, input: PullStream<I>) -> PullStream<O> {
        (self.f)(input)
    }
}

impl<I> PullStream<I>
where
    I: Send + 'static,
{
    /// Route this stream through `pipe`
    pub fn pipe_through<O>(self, pipe: Pipe<I, O>) -> PullStream<O>
    where
        O: Send + 'static,
    {
        pipe.apply(self)
    }
}

/// Compose two pipes together
pub fn compose<I, M, O>(p1: Pipe<I, M>, p2: Pipe<M, O>) -> Pipe<I, O>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| p2.apply(p1.apply(input)))
}

/// Identity pipe that doesn't transform the stream
pub fn identity<I>() -> Pipe<I, I>
where
    I: Send + 'static,
{
    Pipe::new(|input| input)
}

/// Extension trait for pipes
pub trait PipeExt<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Compose this pipe with another pipe
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: Send + 'static;
}

impl<I, O> PipeExt<I, O> for Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: Send + 'static,
    {
        compose(self, other)
    }
}
