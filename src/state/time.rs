//! Time - Scaled frame clocks and timers.
//!
//! A [`Clock`] component provides the root [`FrameTime`] as context and ticks
//! it on every [`Update`]. Any subtree can install its own scaled clock with
//! [`TimeExt::create_frame_time_override`], e.g. to slow down or pause one
//! part of the scene while the rest keeps running.
//!
//! ```text
//! Clock (scale 1.0)
//! └── Enemies: create_frame_time_override() (scale 0.5)
//!     └── Enemy: use_time().delta() == raw delta * 0.5
//! ```

use std::cell::Cell;
use std::rc::Rc;

use crate::engine::Node;
use crate::primitives::{Children, Component};
use crate::types::Update;

// =============================================================================
// FrameTime
// =============================================================================

/// A frame clock whose delta is scaled by its own scale and every ancestor's.
#[derive(Debug)]
pub struct FrameTime {
    parent: Option<Rc<FrameTime>>,
    scale: Cell<f32>,
    delta: Cell<f32>,
    elapsed: Cell<f32>,
}

impl Default for FrameTime {
    fn default() -> Self {
        Self::root()
    }
}

impl FrameTime {
    pub fn root() -> Self {
        Self::with_parent(None)
    }

    pub fn child_of(parent: Rc<FrameTime>) -> Self {
        Self::with_parent(Some(parent))
    }

    fn with_parent(parent: Option<Rc<FrameTime>>) -> Self {
        Self {
            parent,
            scale: Cell::new(1.0),
            delta: Cell::new(0.0),
            elapsed: Cell::new(0.0),
        }
    }

    /// Local scale.
    pub fn scale(&self) -> f32 {
        self.scale.get()
    }

    pub fn set_scale(&self, scale: f32) {
        self.scale.set(scale);
    }

    /// Product of this clock's scale and all of its ancestors'.
    pub fn final_scale(&self) -> f32 {
        self.scale() * self.parent.as_ref().map_or(1.0, |parent| parent.final_scale())
    }

    /// Scaled seconds of the last tick.
    pub fn delta(&self) -> f32 {
        self.delta.get()
    }

    /// Scaled seconds since the clock started.
    pub fn elapsed(&self) -> f32 {
        self.elapsed.get()
    }

    /// Advance by `raw_delta` unscaled seconds.
    pub fn tick(&self, raw_delta: f32) {
        let delta = raw_delta * self.final_scale();
        self.delta.set(delta);
        self.elapsed.set(self.elapsed.get() + delta);
    }

    /// The topmost clock in the hierarchy.
    pub fn root_clock(self: &Rc<Self>) -> Rc<FrameTime> {
        match &self.parent {
            Some(parent) => parent.root_clock(),
            None => self.clone(),
        }
    }
}

// =============================================================================
// Timer
// =============================================================================

/// Counts scaled seconds towards a duration, optionally repeating.
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    duration: f32,
    repeating: bool,
    seconds: f32,
    just_finished: bool,
}

impl Timer {
    pub fn once(duration: f32) -> Self {
        Self::new(duration, false)
    }

    pub fn repeating(duration: f32) -> Self {
        Self::new(duration, true)
    }

    fn new(duration: f32, repeating: bool) -> Self {
        Self {
            duration,
            repeating,
            seconds: 0.0,
            just_finished: false,
        }
    }

    /// Advance the timer. Returns `true` on the tick the duration is reached.
    ///
    /// A repeating timer carries the overshoot into its next period. A
    /// one-shot timer keeps reporting `true` once it has finished.
    pub fn tick(&mut self, delta: f32) -> bool {
        self.seconds += delta;
        self.just_finished = self.finished();
        if self.just_finished && self.repeating {
            self.seconds -= self.duration;
        }
        self.just_finished
    }

    pub fn reset(&mut self) {
        self.seconds = 0.0;
        self.just_finished = false;
    }

    pub fn just_finished(&self) -> bool {
        self.just_finished
    }

    pub fn finished(&self) -> bool {
        self.seconds >= self.duration
    }

    /// Seconds accumulated in the current period.
    pub fn seconds(&self) -> f32 {
        self.seconds
    }
}

// =============================================================================
// Clock Component
// =============================================================================

/// Provides the root [`FrameTime`] to its subtree and ticks it on [`Update`].
#[derive(Clone, Default)]
pub struct Clock {
    children: Children,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(mut self, component: impl Component) -> Self {
        self.children.push(Rc::new(component));
        self
    }
}

impl Component for Clock {
    fn name(&self) -> String {
        "Clock".into()
    }

    fn init(&self, node: &Node) -> Children {
        let time = node.create_context(FrameTime::root());
        let _ = node.on::<Update>(move |update| time.tick(update.delta));
        self.children.clone()
    }
}

/// Frame time helpers for component init code.
pub trait TimeExt {
    /// The nearest ancestor's [`FrameTime`].
    fn use_time(&self) -> Rc<FrameTime>;

    /// Install a clock for this node's descendants, scaled by the inherited
    /// one and ticked on [`Update`].
    fn create_frame_time_override(&self) -> Rc<FrameTime>;
}

impl TimeExt for Node {
    fn use_time(&self) -> Rc<FrameTime> {
        self.use_context::<FrameTime>()
    }

    fn create_frame_time_override(&self) -> Rc<FrameTime> {
        let parent = self.use_time();
        let time = self.create_context(FrameTime::child_of(parent));
        let ticked = time.clone();
        let _ = self.on::<Update>(move |update| ticked.tick(update.delta));
        time
    }
}
