//! Engine - Node hierarchy, lifecycle and deferred execution.
//!
//! The engine owns the structural half of the runtime:
//! - [`Node`] - hierarchy, lifecycle hooks, typed events, context
//! - [`Tree`] - root ownership and the per-frame entry points
//! - [`Scheduler`] - the double-buffered deferred queue
//! - [`NodePath`] - filesystem-style node addressing

mod callbacks;
mod context;
mod deferred;
mod node;
mod path;
mod tree;

pub use callbacks::{Dispose, Hook, Subscription};
pub use deferred::{DeferredAction, Scheduler};
pub use node::{Node, WeakNode};
pub use path::{NodePath, Segment};
pub use tree::Tree;
