//! Primitives - Component building blocks.
//!
//! - [`Component`] - the blueprint trait every component implements
//! - [`Group`] / [`FnComponent`] - containers without their own type
//! - [`Conditional`] - children gated by a boolean signal
//! - [`For`] - keyed list rendering with node reuse
//! - [`Portal`] - children built under a node found by path
//!
//! # Architecture
//!
//! Components are immutable descriptions; nodes are the live instances. A
//! component's `init` runs once per node, during the build phase, and is the
//! only place the node is configured: context, handlers, hooks and signal
//! connections all happen there. Structural changes after mount go through
//! throttled signal targets so they land at the deferred flush.

mod component;
mod control_flow;
mod reconcile;

pub use component::{Children, Component, ComponentExt, FnComponent, Group};
pub use control_flow::{Conditional, For, Portal};
