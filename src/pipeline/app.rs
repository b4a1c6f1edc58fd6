//! App - The host loop around a component tree.
//!
//! One frame is:
//!
//! ```text
//! First → PreUpdate → Update{delta} → PostUpdate → PreDraw → Draw → PostDraw → Last → flush
//! ```
//!
//! Phases disabled in [`AppConfig::phases`] are skipped; the deferred flush
//! always runs exactly once, after the last phase.
//!
//! # Example
//!
//! ```ignore
//! let mut app = App::new(Clock::new().child(Game));
//! let close = app.close_handle();
//!
//! // Option 1: let a runner drive it
//! app.run(&mut FixedStepRunner::from_config(app.config()))?;
//!
//! // Option 2: drive it from your own loop
//! app.start()?;
//! while !app.should_close() {
//!     app.update(window.frame_time());
//! }
//! app.close();
//! ```

use std::cell::Cell;
use std::rc::Rc;

use crate::config::AppConfig;
use crate::engine::{Node, Tree};
use crate::error::Result;
use crate::primitives::Component;
use crate::state::Resources;

// =============================================================================
// Close Handle
// =============================================================================

/// Lets components ask the app to stop after the current frame.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle {
    requested: Rc<Cell<bool>>,
}

impl CloseHandle {
    pub fn request_close(&self) {
        self.requested.set(true);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.get()
    }
}

// =============================================================================
// App
// =============================================================================

pub struct App {
    tree: Tree,
    root: Rc<dyn Component>,
    config: AppConfig,
    resources: Resources,
    close: CloseHandle,
    frame: u64,
}

impl App {
    pub fn new(root: impl Component) -> Self {
        Self::with_config(root, AppConfig::default())
    }

    pub fn with_config(root: impl Component, config: AppConfig) -> Self {
        Self {
            tree: Tree::new(),
            root: Rc::new(root),
            config,
            resources: Resources::new(),
            close: CloseHandle::default(),
            frame: 0,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Frames completed since start.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    pub fn should_close(&self) -> bool {
        self.close.is_requested()
    }

    pub fn set_should_close(&self, close: bool) {
        self.close.requested.set(close);
    }

    /// Build and mount the root component.
    pub fn start(&mut self) -> Result<Node> {
        let root = self.tree.try_build(self.root.as_ref())?;
        tracing::debug!(root = %root.name(), phases = ?self.config.phases, "app started");
        Ok(root)
    }

    /// Run one frame: every enabled phase in order, then one deferred flush.
    pub fn update(&mut self, delta: f32) {
        for phase in self.config.phases.ordered() {
            tracing::trace!(frame = self.frame, ?phase, "dispatch phase");
            phase.dispatch(&self.tree, delta);
        }
        self.tree.flush_deferred_queue();
        self.frame += 1;
    }

    /// Free the tree.
    pub fn close(&mut self) {
        self.tree.free();
        tracing::debug!(frames = self.frame, "app closed");
    }

    pub fn run(&mut self, runner: &mut dyn Runner) -> Result<()> {
        runner.run(self)
    }
}

// =============================================================================
// Runners
// =============================================================================

/// Drives an [`App`] from start to close.
pub trait Runner {
    fn run(&mut self, app: &mut App) -> Result<()>;
}

/// Runs frames with a constant delta until close is requested or the frame
/// cap is reached.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedStepRunner {
    delta: f32,
    max_frames: Option<u64>,
}

impl FixedStepRunner {
    pub fn new(delta: f32) -> Self {
        Self {
            delta,
            max_frames: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            delta: config.fixed_delta,
            max_frames: config.max_frames,
        }
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }
}

impl Runner for FixedStepRunner {
    fn run(&mut self, app: &mut App) -> Result<()> {
        app.start()?;
        while !app.should_close() {
            if self.max_frames.is_some_and(|max| app.frame() >= max) {
                break;
            }
            app.update(self.delta);
        }
        app.close();
        Ok(())
    }
}
