//! Callback registries - Typed event handlers and lifecycle hooks.
//!
//! Handlers are keyed by the `TypeId` of the event they accept, so a dispatch
//! only visits the handlers registered for that exact type.

use std::any::{Any, TypeId};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::node::NodeInner;

// =============================================================================
// Handler Table
// =============================================================================

pub(crate) type ErasedHandler = Rc<dyn Fn(&dyn Any)>;

struct HandlerEntry {
    id: u64,
    handler: ErasedHandler,
    live: Rc<Cell<bool>>,
}

/// Which of a node's two handler tables a subscription lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandlerSlot {
    /// Runs before the node's children.
    Immediate,
    /// Runs after the node's children.
    Late,
}

#[derive(Default)]
pub(crate) struct HandlerTable {
    by_type: HashMap<TypeId, Vec<HandlerEntry>>,
    next_id: u64,
}

impl HandlerTable {
    pub(crate) fn add<T: 'static>(
        &mut self,
        handler: impl Fn(&T) + 'static,
    ) -> (TypeId, u64, Rc<Cell<bool>>) {
        let id = self.next_id;
        self.next_id += 1;

        let live = Rc::new(Cell::new(true));
        let erased: ErasedHandler = Rc::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<T>() {
                handler(event);
            }
        });

        let type_id = TypeId::of::<T>();
        self.by_type.entry(type_id).or_default().push(HandlerEntry {
            id,
            handler: erased,
            live: live.clone(),
        });
        (type_id, id, live)
    }

    pub(crate) fn remove(&mut self, type_id: TypeId, id: u64) -> bool {
        let Some(entries) = self.by_type.get_mut(&type_id) else {
            return false;
        };
        let Some(position) = entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = entries.remove(position);
        entry.live.set(false);
        if entries.is_empty() {
            self.by_type.remove(&type_id);
        }
        true
    }

    /// Handlers for `T` in registration order, detached from the table so
    /// they can run while the table is borrowed again.
    pub(crate) fn snapshot<T: 'static>(&self) -> Vec<(ErasedHandler, Rc<Cell<bool>>)> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| (entry.handler.clone(), entry.live.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        for entry in self.by_type.values().flatten() {
            entry.live.set(false);
        }
        self.by_type.clear();
    }
}

/// Run a snapshot against one event, skipping handlers disposed mid-dispatch.
pub(crate) fn dispatch<T: 'static>(handlers: Vec<(ErasedHandler, Rc<Cell<bool>>)>, event: &T) {
    for (handler, live) in handlers {
        if live.get() {
            handler(event as &dyn Any);
        }
    }
}

// =============================================================================
// Dispose
// =============================================================================

/// A registration handle that can be torn down, e.g. by
/// [`Node::auto_dispose`](crate::Node::auto_dispose).
pub trait Dispose {
    fn dispose(self);
}

// =============================================================================
// Subscription
// =============================================================================

/// Handle to a typed handler registered with [`Node::on`](crate::Node::on)
/// or [`Node::on_late`](crate::Node::on_late).
///
/// Dropping the handle keeps the handler registered; call [`dispose`](Self::dispose)
/// to remove it, or hand it to [`Node::auto_dispose`](crate::Node::auto_dispose).
#[must_use = "the handler stays registered until dispose() is called"]
pub struct Subscription {
    node: Weak<NodeInner>,
    slot: HandlerSlot,
    type_id: TypeId,
    id: u64,
    live: Rc<Cell<bool>>,
}

impl Subscription {
    pub(crate) fn new(
        node: Weak<NodeInner>,
        slot: HandlerSlot,
        (type_id, id, live): (TypeId, u64, Rc<Cell<bool>>),
    ) -> Self {
        Self {
            node,
            slot,
            type_id,
            id,
            live,
        }
    }

    /// Whether the handler is still registered.
    pub fn is_active(&self) -> bool {
        self.live.get()
    }

    /// Deregister the handler. A handler disposed during a dispatch does not
    /// run for the rest of that dispatch.
    pub fn dispose(self) {
        self.live.set(false);
        if let Some(node) = self.node.upgrade() {
            node.handlers(self.slot).borrow_mut().remove(self.type_id, self.id);
        }
    }
}

impl Dispose for Subscription {
    fn dispose(self) {
        Subscription::dispose(self);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("slot", &self.slot)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// Lifecycle Hooks
// =============================================================================

/// One-shot lifecycle hook.
pub type Hook = Box<dyn FnOnce()>;

#[derive(Default)]
pub(crate) struct LifecycleHooks {
    pub(crate) on_mount: Vec<Hook>,
    pub(crate) on_late_mount: Vec<Hook>,
    pub(crate) on_cleanup: Vec<Hook>,
    pub(crate) on_late_cleanup: Vec<Hook>,
}

impl LifecycleHooks {
    pub(crate) fn clear(&mut self) {
        self.on_mount.clear();
        self.on_late_mount.clear();
        self.on_cleanup.clear();
        self.on_late_cleanup.clear();
    }
}
