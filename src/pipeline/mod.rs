//! Frame Pipeline
//!
//! Drives a component tree frame by frame.
//!
//! ```text
//! App::start → (App::update: phases → flush)* → App::close
//! ```
//!
//! - [`App`] - owns the tree, resources and frame counter
//! - [`Runner`] - strategy that calls `start`/`update`/`close`
//! - [`FixedStepRunner`] - constant delta, optional frame cap

pub mod app;

pub use app::{App, CloseHandle, FixedStepRunner, Runner};
