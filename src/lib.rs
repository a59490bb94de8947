//! Resource-safe reactive pull streams
//!
//! Sources ([`from_event`], [`interval`], [`from_iter`]) feed single-reader
//! [`PullStream`]s. Combinators ([`map`], [`merge`], [`switch_map`],
//! [`take_until`], [`pairwise`]) compose them, and a [`WritableSink`] drains
//! the result. Streams start lazily on first read, never buffer beyond their
//! capacity, and release every listener, timer and pull loop upstream when
//! they are cancelled or dropped.

pub mod combinators;
pub mod error;
pub mod pipe;
pub mod pull_loop;
pub mod pull_stream;
pub mod queue;
pub mod sink;
pub mod sources;
pub mod stream_configuration;
pub mod stream_ext;
pub mod transform;

pub use combinators::{map, merge, pairwise, switch_map, take_until, try_map};
pub use error::{StreamError, StreamResult};
pub use pipe::{compose, identity, Pipe, PipeExt};
pub use pull_loop::PullLoop;
pub use pull_stream::{BoxedStream, PullStream, Source};
pub use queue::{CancelHandle, Controller, QueueStats, StreamState, TryEnqueueError};
pub use sink::{sink_fn, FnSink, PipeSummary, WritableSink};
pub use sources::{
    empty, from_event, from_iter, from_stream, interval, Delivery, Emitted, EventEmitter, EventTarget,
    Listener, ListenerId,
};
pub use stream_configuration::{StreamConfig, DEFAULT_HIGH_WATER_MARK};
pub use stream_ext::PullStreamExt;
pub use transform::{transform_stream, Transform};
