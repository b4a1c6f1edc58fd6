//! # spark-tree
//!
//! Retained-mode component tree runtime for frame-driven applications.
//!
//! ## Architecture
//!
//! A tree of stateful nodes is built once from immutable component
//! blueprints, mounted top-down, updated every frame through typed broadcast
//! events, and torn down bottom-up. Structural changes requested mid-frame are
//! routed through a double-buffered deferred queue flushed once per frame.
//!
//! ```text
//! Component ──build──▶ Node tree ──mount──▶ (call<Phase>* → flush)* ──free──▶
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Frame events, phases, node states
//! - [`engine`] - Node, Tree, context, typed handlers, deferred queue
//! - [`state`] - Signals, reactive lists, resources, frame time
//! - [`primitives`] - Component trait, Conditional, For, Portal
//! - [`pipeline`] - App host loop and runners
//! - [`config`] - TOML app configuration
//! - [`error`] - Tree contract violations

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod state;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export commonly used items
pub use types::*;

pub use config::{AppConfig, ConfigError};
pub use error::{Result, TreeError};

pub use engine::{DeferredAction, Dispose, Hook, Node, NodePath, Scheduler, Segment, Subscription, Tree, WeakNode};

pub use state::{
    Clock, Deferred, FrameTime, OneShot, Out, ReactiveList, ResourceObserver, Resources, Signal,
    SignalTarget, TargetExt, TargetId, Throttled, TimeExt, Timer,
};

pub use primitives::{Children, Component, ComponentExt, Conditional, FnComponent, For, Group, Portal};

pub use pipeline::{App, CloseHandle, FixedStepRunner, Runner};
