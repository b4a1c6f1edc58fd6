//! Deferred Queue - Double-buffered actions flushed once per frame.
//!
//! Separates "when something is requested" from "when it runs":
//! - [`Scheduler::enqueue`] / [`Scheduler::call_deferred`] push into the current buffer
//! - [`Scheduler::flush`] swaps buffers, then runs the settled one in enqueue order
//!
//! Actions enqueued while a flush is running land in the other buffer and run
//! at the next flush, never in the one that scheduled them.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = Scheduler::new();
//! scheduler.call_deferred(|| println!("next flush"));
//! scheduler.flush(); // prints
//! ```

use std::cell::RefCell;
use std::rc::Rc;

// =============================================================================
// Actions
// =============================================================================

/// Work scheduled for the next flush.
///
/// Enqueuing the same `Rc` twice into one buffer generation runs it once.
pub trait DeferredAction {
    fn invoke(&self);
}

impl<F: Fn()> DeferredAction for F {
    fn invoke(&self) {
        self()
    }
}

/// A `FnOnce` adapted to [`DeferredAction`]. Runs at most once.
struct OnceAction {
    action: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl DeferredAction for OnceAction {
    fn invoke(&self) {
        let action = self.action.borrow_mut().take();
        if let Some(action) = action {
            action();
        }
    }
}

// =============================================================================
// Queue
// =============================================================================

#[derive(Default)]
struct DeferredQueue {
    buffers: [Vec<Rc<dyn DeferredAction>>; 2],
    current: usize,
}

impl DeferredQueue {
    fn enqueue(&mut self, action: Rc<dyn DeferredAction>) -> bool {
        let buffer = &mut self.buffers[self.current];
        let queued = buffer
            .iter()
            .any(|existing| std::ptr::addr_eq(Rc::as_ptr(existing), Rc::as_ptr(&action)));
        if queued {
            return false;
        }
        buffer.push(action);
        true
    }

    /// Flip the current buffer and hand out the settled one.
    fn swap(&mut self) -> (usize, Vec<Rc<dyn DeferredAction>>) {
        let settled = self.current;
        self.current ^= 1;
        (settled, std::mem::take(&mut self.buffers[settled]))
    }

    fn restore(&mut self, index: usize, mut buffer: Vec<Rc<dyn DeferredAction>>) {
        buffer.clear();
        if self.buffers[index].is_empty() {
            self.buffers[index] = buffer;
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Shared handle to a tree's deferred queue.
///
/// Cloning is cheap; all clones feed the same queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Rc<RefCell<DeferredQueue>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an action instance. Returns `false` if that exact instance is
    /// already waiting in the current buffer.
    pub fn enqueue(&self, action: Rc<dyn DeferredAction>) -> bool {
        self.queue.borrow_mut().enqueue(action)
    }

    /// Run `action` at the next flush.
    pub fn call_deferred(&self, action: impl FnOnce() + 'static) {
        self.enqueue(Rc::new(OnceAction {
            action: RefCell::new(Some(Box::new(action))),
        }));
    }

    /// Run `action(args)` at the next flush.
    pub fn call_deferred_with<T: 'static>(&self, action: impl FnOnce(T) + 'static, args: T) {
        self.call_deferred(move || action(args));
    }

    /// Number of actions waiting for the next flush.
    pub fn pending(&self) -> usize {
        let queue = self.queue.borrow();
        queue.buffers[queue.current].len()
    }

    /// Run one buffered generation of actions. Returns how many ran.
    pub fn flush(&self) -> usize {
        let (index, batch) = self.queue.borrow_mut().swap();
        let count = batch.len();
        for action in &batch {
            action.invoke();
        }
        if count > 0 {
            tracing::trace!(count, "deferred queue flushed");
        }
        self.queue.borrow_mut().restore(index, batch);
        count
    }
}
