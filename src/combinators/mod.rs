//! Stream combinators
//!
//! Every combinator returns a [`Pipe`](crate::pipe::Pipe), except [`merge`]
//! which takes its inputs directly. [`PullStreamExt`](crate::PullStreamExt)
//! offers them as methods.

pub mod map;
pub mod merge;
pub mod pairwise;
pub mod switch_map;
pub mod take_until;

pub use map::{map, try_map};
pub use merge::merge;
pub use pairwise::pairwise;
pub use switch_map::switch_map;
pub use take_until::take_until;
