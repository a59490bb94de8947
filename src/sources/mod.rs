//! Source adapters: where values enter a pipeline

pub mod constructors;
pub mod event;
pub mod interval;

pub use constructors::{empty, from_iter, from_stream};
pub use event::{from_event, Delivery, Emitted, EventEmitter, EventTarget, Listener, ListenerId};
pub use interval::interval;
