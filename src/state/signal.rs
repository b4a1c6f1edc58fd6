//! Signal - Typed value holder with observer fan-out.
//!
//! A [`Signal`] stores the last emitted value and broadcasts every emission to
//! its targets in registration order. Targets can be wrapped to change *when*
//! they fire without touching their own logic:
//!
//! - [`TargetExt::deferred`] - fires at the next deferred flush
//! - [`TargetExt::throttled`] - fires once per flush with the latest value
//! - [`TargetExt::one_shot`] - fires on the first emission only
//!
//! # Frozen target list
//!
//! While a signal broadcasts, its target list is frozen: `connect`,
//! `disconnect` and `reset` fail with [`TreeError::SignalFrozen`]. Structural
//! changes triggered by an emission belong in a deferred or throttled target.
//!
//! # Example
//!
//! ```ignore
//! let score = Signal::new(0);
//! node.use_signal(&score, (|value: &i32| println!("{value}")).throttled(node.scheduler()));
//! score.emit(1);
//! score.emit(2);
//! tree.flush_deferred_queue(); // prints "2"
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::engine::Scheduler;
use crate::error::{Result, TreeError, fatal};

// =============================================================================
// Targets
// =============================================================================

/// Receiver of signal emissions.
pub trait SignalTarget<T> {
    fn handle(&self, value: &T);
}

impl<T, F: Fn(&T)> SignalTarget<T> for F {
    fn handle(&self, value: &T) {
        self(value)
    }
}

/// Identifies a connected target for [`Signal::disconnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

// =============================================================================
// Signal
// =============================================================================

struct SignalInner<T> {
    initial: T,
    value: RefCell<T>,
    targets: RefCell<Vec<(TargetId, Rc<dyn SignalTarget<T>>)>>,
    broadcasting: Cell<u32>,
    next_id: Cell<u64>,
}

/// Keeps the target list frozen for the duration of one broadcast.
struct BroadcastGuard<'a>(&'a Cell<u32>);

impl<'a> BroadcastGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for BroadcastGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// Shared handle to a typed signal. Clones refer to the same signal.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Default + Clone + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(initial.clone()),
                initial,
                targets: RefCell::new(Vec::new()),
                broadcasting: Cell::new(0),
                next_id: Cell::new(0),
            }),
        }
    }

    /// The last emitted value (or the initial one).
    ///
    /// The value is cloned out, so no borrow is held while callers react to
    /// it, and re-emitting from there is safe.
    pub fn value(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Store `value`, then hand it to every target in registration order.
    pub fn emit(&self, value: T) {
        *self.inner.value.borrow_mut() = value.clone();

        let _guard = BroadcastGuard::enter(&self.inner.broadcasting);
        let targets = self.inner.targets.borrow();
        for (_, target) in targets.iter() {
            target.handle(&value);
        }
    }

    /// Re-broadcast the current value.
    pub fn replay(&self) {
        self.emit(self.value());
    }

    pub fn is_broadcasting(&self) -> bool {
        self.inner.broadcasting.get() > 0
    }

    pub fn target_count(&self) -> usize {
        self.inner.targets.borrow().len()
    }

    fn ensure_unfrozen(&self) -> Result<()> {
        if self.is_broadcasting() {
            return Err(TreeError::SignalFrozen);
        }
        Ok(())
    }

    pub fn try_connect(&self, target: impl SignalTarget<T> + 'static) -> Result<TargetId> {
        self.ensure_unfrozen()?;
        let id = TargetId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.targets.borrow_mut().push((id, Rc::new(target)));
        Ok(id)
    }

    pub fn connect(&self, target: impl SignalTarget<T> + 'static) -> TargetId {
        self.try_connect(target).unwrap_or_else(|err| fatal(err))
    }

    /// Remove a target. Returns `false` if it was not connected.
    pub fn try_disconnect(&self, id: TargetId) -> Result<bool> {
        self.ensure_unfrozen()?;
        let mut targets = self.inner.targets.borrow_mut();
        let before = targets.len();
        targets.retain(|(target_id, _)| *target_id != id);
        Ok(targets.len() != before)
    }

    pub fn disconnect(&self, id: TargetId) -> bool {
        self.try_disconnect(id).unwrap_or_else(|err| fatal(err))
    }

    /// Restore the initial value and drop every target.
    pub fn try_reset(&self) -> Result<()> {
        self.ensure_unfrozen()?;
        *self.inner.value.borrow_mut() = self.inner.initial.clone();
        self.inner.targets.borrow_mut().clear();
        Ok(())
    }

    pub fn reset(&self) {
        self.try_reset().unwrap_or_else(|err| fatal(err))
    }
}

impl Signal<()> {
    /// Emit on a payload-less signal.
    pub fn notify(&self) {
        self.emit(());
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .field("targets", &self.inner.targets.borrow().len())
            .finish()
    }
}

// =============================================================================
// Delivery Wrappers
// =============================================================================

/// Fires the wrapped target at the next deferred flush, once per emission.
pub struct Deferred<S> {
    origin: Rc<S>,
    scheduler: Scheduler,
}

impl<T, S> SignalTarget<T> for Deferred<S>
where
    T: Clone + 'static,
    S: SignalTarget<T> + 'static,
{
    fn handle(&self, value: &T) {
        let origin = self.origin.clone();
        self.scheduler
            .call_deferred_with(move |value: T| origin.handle(&value), value.clone());
    }
}

struct ThrottleState<T, S> {
    origin: S,
    last: RefCell<Option<T>>,
    queued: Cell<bool>,
}

impl<T, S: SignalTarget<T>> ThrottleState<T, S> {
    fn fire(&self) {
        // Re-arm first so emissions made by the target reach the next flush
        self.queued.set(false);
        let value = self.last.borrow_mut().take();
        if let Some(value) = value {
            self.origin.handle(&value);
        }
    }
}

/// Collapses every emission between two flushes into one call carrying the
/// latest value.
pub struct Throttled<T, S> {
    state: Rc<ThrottleState<T, S>>,
    scheduler: Scheduler,
}

impl<T, S> SignalTarget<T> for Throttled<T, S>
where
    T: Clone + 'static,
    S: SignalTarget<T> + 'static,
{
    fn handle(&self, value: &T) {
        *self.state.last.borrow_mut() = Some(value.clone());
        if self.state.queued.replace(true) {
            return;
        }
        let state = self.state.clone();
        self.scheduler.call_deferred(move || state.fire());
    }
}

/// Fires on the first emission only.
pub struct OneShot<S> {
    origin: S,
    fired: Cell<bool>,
}

impl<T, S: SignalTarget<T>> SignalTarget<T> for OneShot<S> {
    fn handle(&self, value: &T) {
        if self.fired.replace(true) {
            return;
        }
        self.origin.handle(value);
    }
}

/// Delivery combinators for any [`SignalTarget`].
pub trait TargetExt<T>: SignalTarget<T> + Sized + 'static {
    fn deferred(self, scheduler: &Scheduler) -> Deferred<Self> {
        Deferred {
            origin: Rc::new(self),
            scheduler: scheduler.clone(),
        }
    }

    fn throttled(self, scheduler: &Scheduler) -> Throttled<T, Self> {
        Throttled {
            state: Rc::new(ThrottleState {
                origin: self,
                last: RefCell::new(None),
                queued: Cell::new(false),
            }),
            scheduler: scheduler.clone(),
        }
    }

    fn one_shot(self) -> OneShot<Self> {
        OneShot {
            origin: self,
            fired: Cell::new(false),
        }
    }
}

impl<T, S: SignalTarget<T> + 'static> TargetExt<T> for S {}
