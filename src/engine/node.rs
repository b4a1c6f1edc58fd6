//! Node - The live unit of the component tree.
//!
//! A node owns its children, its context map, two typed handler tables
//! (immediate and late) and four one-shot lifecycle hook lists. Its parent is
//! a weak back-reference used only for upward queries: name checks, context
//! lookup and path resolution.
//!
//! # Ordering
//!
//! ```text
//! mount:  on_mount → children.mount → on_late_mount
//! free:   on_cleanup → children.free → on_late_cleanup
//! call:   on::<T> → children.call → on_late::<T>
//! ```
//!
//! A parent therefore sets up before its children and observes them after
//! they are fully live, for lifecycle and frame events alike.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::callbacks::{
    self, Dispose, HandlerSlot, HandlerTable, Hook, LifecycleHooks, Subscription,
};
use super::context::ContextMap;
use super::deferred::Scheduler;
use super::path::{NodePath, Segment};
use super::tree::{Tree, TreeInner};
use crate::error::{Result, TreeError, fatal};
use crate::primitives::Component;
use crate::state::{Out, Signal, SignalTarget, TargetId};
use crate::types::NodeState;

// =============================================================================
// Node Storage
// =============================================================================

pub(crate) struct NodeInner {
    name: RefCell<String>,
    state: Cell<NodeState>,
    parent: RefCell<Weak<NodeInner>>,
    children: RefCell<Vec<Node>>,
    context: RefCell<ContextMap>,
    handlers: RefCell<HandlerTable>,
    late_handlers: RefCell<HandlerTable>,
    hooks: RefCell<LifecycleHooks>,
    tree: Weak<TreeInner>,
    scheduler: Scheduler,
}

impl NodeInner {
    pub(crate) fn handlers(&self, slot: HandlerSlot) -> &RefCell<HandlerTable> {
        match slot {
            HandlerSlot::Immediate => &self.handlers,
            HandlerSlot::Late => &self.late_handlers,
        }
    }
}

/// Shared handle to a node. Clones refer to the same node; equality is identity.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

/// Non-owning handle to a node.
#[derive(Clone, Default)]
pub struct WeakNode {
    inner: Weak<NodeInner>,
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.inner.upgrade().map(|inner| Node { inner })
    }

    /// Upgrade only if the node has not been freed.
    pub fn upgrade_live(&self) -> Option<Node> {
        self.upgrade().filter(|node| !node.is_freed())
    }
}

impl Node {
    pub(crate) fn new(name: impl Into<String>, tree: Weak<TreeInner>, scheduler: Scheduler) -> Node {
        Node {
            inner: Rc::new(NodeInner {
                name: RefCell::new(name.into()),
                state: Cell::new(NodeState::Building),
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                context: RefCell::new(ContextMap::default()),
                handlers: RefCell::new(HandlerTable::default()),
                late_handlers: RefCell::new(HandlerTable::default()),
                hooks: RefCell::new(LifecycleHooks::default()),
                tree,
                scheduler,
            }),
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn name(&self) -> String {
        self.inner.name.borrow().clone()
    }

    /// Rename the node. Collisions with siblings are disambiguated again.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.inner.name.borrow_mut() = name.into();
        if let Some(parent) = self.parent() {
            parent.validate_child_name(self);
        }
    }

    pub fn state(&self) -> NodeState {
        self.inner.state.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.state() == NodeState::Mounted
    }

    pub fn is_freed(&self) -> bool {
        self.state() == NodeState::Freed
    }

    /// Absolute path from the topmost attached ancestor, e.g. `/root/a/b`.
    pub fn path(&self) -> String {
        let mut names = vec![self.name()];
        let mut current = self.parent();
        while let Some(node) = current {
            names.push(node.name());
            current = node.parent();
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    pub fn parent(&self) -> Option<Node> {
        self.inner.parent.borrow().upgrade().map(|inner| Node { inner })
    }

    /// Snapshot of the children in order.
    pub fn children(&self) -> Vec<Node> {
        self.inner.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub fn get_child(&self, name: &str) -> Option<Node> {
        self.inner
            .children
            .borrow()
            .iter()
            .find(|child| *child.inner.name.borrow() == name)
            .cloned()
    }

    /// Attach `child` as the last child. The child must be detached.
    pub fn try_add_child(&self, child: &Node) -> Result<()> {
        if child.parent().is_some() {
            return Err(TreeError::AlreadyHasParent {
                child: child.path(),
                parent: self.path(),
            });
        }
        if child.is_ancestor_of(self) {
            return Err(TreeError::WouldCycle {
                child: child.path(),
                parent: self.path(),
            });
        }

        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.children.borrow_mut().push(child.clone());
        self.validate_child_name(child);
        Ok(())
    }

    pub fn add_child(&self, child: &Node) {
        self.try_add_child(child).unwrap_or_else(|err| fatal(err))
    }

    /// Detach `child` without freeing it.
    pub fn try_remove_child(&self, child: &Node) -> Result<()> {
        let is_parent = child.parent().is_some_and(|parent| parent.ptr_eq(self));
        if !is_parent {
            return Err(TreeError::NotAChild {
                child: child.path(),
                parent: self.path(),
            });
        }

        *child.inner.parent.borrow_mut() = Weak::new();
        self.inner.children.borrow_mut().retain(|node| !node.ptr_eq(child));
        Ok(())
    }

    pub fn remove_child(&self, child: &Node) {
        self.try_remove_child(child).unwrap_or_else(|err| fatal(err))
    }

    /// Detach and free every child, last first.
    pub fn clear_children(&self) {
        for child in self.children().into_iter().rev() {
            self.remove_child(&child);
            child.free();
        }
    }

    /// True if `self` is `node` or one of its ancestors.
    fn is_ancestor_of(&self, node: &Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if candidate.ptr_eq(self) {
                return true;
            }
            current = candidate.parent();
        }
        false
    }

    fn has_other_child_named(&self, except: &Node, name: &str) -> bool {
        self.inner
            .children
            .borrow()
            .iter()
            .any(|child| !child.ptr_eq(except) && *child.inner.name.borrow() == name)
    }

    /// Rename `child` to `@name@index` if a sibling already uses its name.
    fn validate_child_name(&self, child: &Node) {
        let name = child.name();
        if !self.has_other_child_named(child, &name) {
            return;
        }

        let mut suffix = {
            let children = self.inner.children.borrow();
            children
                .iter()
                .position(|node| node.ptr_eq(child))
                .unwrap_or(children.len())
        };
        loop {
            let candidate = format!("@{name}@{suffix}");
            if !self.has_other_child_named(child, &candidate) {
                *child.inner.name.borrow_mut() = candidate;
                return;
            }
            suffix += 1;
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Run on-mount hooks, mount children still building, then run
    /// late-mount hooks. Valid only from [`NodeState::Building`].
    pub fn try_mount(&self) -> Result<()> {
        let state = self.state();
        if state != NodeState::Building {
            return Err(TreeError::InvalidState {
                node: self.path(),
                action: "mount",
                state,
            });
        }

        self.inner.state.set(NodeState::Mounted);
        tracing::trace!(node = %self.path(), "mount");

        self.run_hooks(|hooks| &mut hooks.on_mount);
        for child in self.children() {
            // A parent's on-mount hook may already have mounted it
            if child.state() == NodeState::Building {
                child.try_mount()?;
            }
        }
        self.run_hooks(|hooks| &mut hooks.on_late_mount);
        Ok(())
    }

    pub fn mount(&self) {
        self.try_mount().unwrap_or_else(|err| fatal(err))
    }

    /// Run cleanup hooks, free children, run late-cleanup hooks, then
    /// release everything the node holds. Freeing twice is a no-op.
    pub fn free(&self) {
        if self.is_freed() {
            return;
        }
        tracing::trace!(node = %self.path(), "free");

        self.run_hooks(|hooks| &mut hooks.on_cleanup);
        for child in self.children() {
            child.free();
        }
        self.run_hooks(|hooks| &mut hooks.on_late_cleanup);

        self.inner.state.set(NodeState::Freed);
        self.release();
    }

    /// Detach from the parent and free at the next deferred flush.
    pub fn queue_free(&self) {
        if matches!(self.state(), NodeState::QueuedForDeletion | NodeState::Freed) {
            return;
        }
        self.inner.state.set(NodeState::QueuedForDeletion);

        let weak = self.downgrade();
        self.inner.scheduler.call_deferred(move || {
            let Some(node) = weak.upgrade() else { return };
            if let Some(parent) = node.parent() {
                parent.remove_child(&node);
            }
            node.free();
        });
    }

    fn release(&self) {
        self.inner.hooks.borrow_mut().clear();
        self.inner.handlers.borrow_mut().clear();
        self.inner.late_handlers.borrow_mut().clear();
        self.inner.context.borrow_mut().clear();

        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children {
            *child.inner.parent.borrow_mut() = Weak::new();
        }
    }

    fn run_hooks(&self, select: fn(&mut LifecycleHooks) -> &mut Vec<Hook>) {
        let hooks = std::mem::take(select(&mut self.inner.hooks.borrow_mut()));
        for hook in hooks {
            hook();
        }
    }

    /// Runs once when the node mounts, before its children.
    pub fn on_mount(&self, hook: impl FnOnce() + 'static) {
        self.inner.hooks.borrow_mut().on_mount.push(Box::new(hook));
    }

    /// Runs once after the whole subtree has mounted.
    pub fn on_late_mount(&self, hook: impl FnOnce() + 'static) {
        self.inner.hooks.borrow_mut().on_late_mount.push(Box::new(hook));
    }

    /// Runs once when the node is freed, before its children.
    pub fn on_cleanup(&self, hook: impl FnOnce() + 'static) {
        self.inner.hooks.borrow_mut().on_cleanup.push(Box::new(hook));
    }

    /// Runs once after the whole subtree has been freed.
    pub fn on_late_cleanup(&self, hook: impl FnOnce() + 'static) {
        self.inner.hooks.borrow_mut().on_late_cleanup.push(Box::new(hook));
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Handle `T` before this node's children do.
    pub fn on<T: 'static>(&self, handler: impl Fn(&T) + 'static) -> Subscription {
        let entry = self.inner.handlers.borrow_mut().add(handler);
        Subscription::new(Rc::downgrade(&self.inner), HandlerSlot::Immediate, entry)
    }

    /// Handle `T` after this node's children have.
    pub fn on_late<T: 'static>(&self, handler: impl Fn(&T) + 'static) -> Subscription {
        let entry = self.inner.late_handlers.borrow_mut().add(handler);
        Subscription::new(Rc::downgrade(&self.inner), HandlerSlot::Late, entry)
    }

    /// Dispatch `event` depth-first through this subtree.
    ///
    /// Nodes that are not mounted are skipped together with their subtree.
    pub fn call<T: 'static>(&self, event: &T) {
        if !self.state().receives_events() {
            return;
        }

        let immediate = self.inner.handlers.borrow().snapshot::<T>();
        callbacks::dispatch(immediate, event);

        for child in self.children() {
            child.call(event);
        }

        let late = self.inner.late_handlers.borrow().snapshot::<T>();
        callbacks::dispatch(late, event);
    }

    /// Dispatch `T::default()`.
    pub fn call_default<T: Default + 'static>(&self) {
        self.call(&T::default());
    }

    /// Number of registered typed handlers, immediate and late.
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.borrow().len() + self.inner.late_handlers.borrow().len()
    }

    /// Dispose `handle` when this node is cleaned up.
    pub fn auto_dispose<D: Dispose + 'static>(&self, handle: D) {
        self.on_cleanup(move || handle.dispose());
    }

    /// Fill `out` for whoever created it and clear it when this node is
    /// cleaned up.
    pub fn init_out<T: 'static>(&self, out: &Out<T>, value: T) {
        out.init(value);
        self.auto_dispose(out.clone());
    }

    // =========================================================================
    // Context
    // =========================================================================

    /// Register a context value for this node's descendants.
    pub fn try_create_context<T: 'static>(&self, value: T) -> Result<Rc<T>> {
        self.try_provide_context(Rc::new(value))
    }

    pub fn create_context<T: 'static>(&self, value: T) -> Rc<T> {
        self.try_create_context(value).unwrap_or_else(|err| fatal(err))
    }

    /// Register a shared (possibly unsized) context value, e.g. `Rc<dyn Trait>`.
    pub fn try_provide_context<T: ?Sized + 'static>(&self, value: Rc<T>) -> Result<Rc<T>> {
        if !self.inner.context.borrow_mut().insert(value.clone()) {
            return Err(TreeError::DuplicateContext {
                type_name: type_name::<T>(),
                node: self.path(),
            });
        }
        Ok(value)
    }

    pub fn provide_context<T: ?Sized + 'static>(&self, value: Rc<T>) -> Rc<T> {
        self.try_provide_context(value).unwrap_or_else(|err| fatal(err))
    }

    /// Find `T` in the nearest ancestor providing it. A node never sees
    /// its own context.
    pub fn use_nullable_context<T: ?Sized + 'static>(&self) -> Option<Rc<T>> {
        let mut current = self.parent();
        while let Some(node) = current {
            if let Some(value) = node.inner.context.borrow().get::<T>() {
                return Some(value);
            }
            current = node.parent();
        }
        None
    }

    pub fn try_use_context<T: ?Sized + 'static>(&self) -> Result<Rc<T>> {
        self.use_nullable_context::<T>()
            .ok_or_else(|| TreeError::MissingContext {
                type_name: type_name::<T>(),
                node: self.path(),
            })
    }

    pub fn use_context<T: ?Sized + 'static>(&self) -> Rc<T> {
        self.try_use_context::<T>().unwrap_or_else(|err| fatal(err))
    }

    /// Whether this node itself provides `T`.
    pub fn has_own_context<T: ?Sized + 'static>(&self) -> bool {
        self.inner.context.borrow().contains::<T>()
    }

    // =========================================================================
    // Paths
    // =========================================================================

    /// Resolve a path relative to this node (or to the root if absolute).
    ///
    /// Returns `None` as soon as a segment does not resolve.
    pub fn get_node(&self, path: impl Into<NodePath>) -> Option<Node> {
        let path = path.into();
        let mut current = if path.is_absolute() {
            None
        } else {
            Some(self.clone())
        };

        for segment in path.segments() {
            current = match (segment, current) {
                (Segment::Current, current) => current,
                (Segment::Parent, Some(node)) => Some(node.parent()?),
                (Segment::Parent, None) => return None,
                (Segment::Named(name), None) => {
                    let root = self.tree_root()?;
                    if root.name() != name {
                        return None;
                    }
                    Some(root)
                }
                (Segment::Named(name), Some(node)) => Some(node.get_child(name)?),
            };
        }
        current
    }

    fn tree_root(&self) -> Option<Node> {
        self.inner.tree.upgrade().and_then(|tree| tree.root())
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// The deferred queue of the tree this node belongs to.
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn call_deferred(&self, action: impl FnOnce() + 'static) {
        self.inner.scheduler.call_deferred(action);
    }

    pub fn call_deferred_with<T: 'static>(&self, action: impl FnOnce(T) + 'static, args: T) {
        self.inner.scheduler.call_deferred_with(action, args);
    }

    // =========================================================================
    // Components
    // =========================================================================

    pub fn try_tree(&self) -> Result<Tree> {
        self.inner
            .tree
            .upgrade()
            .map(Tree::from_inner)
            .ok_or_else(|| TreeError::TreeDropped { node: self.path() })
    }

    pub fn tree(&self) -> Tree {
        self.try_tree().unwrap_or_else(|err| fatal(err))
    }

    /// Build `component` as the last child. The child is not mounted.
    pub fn create_child(&self, component: &dyn Component) -> Node {
        component.build(&self.tree(), Some(self))
    }

    pub fn create_child_and_mount(&self, component: &dyn Component) -> Node {
        let child = self.create_child(component);
        child.mount();
        child
    }

    pub fn create_children(&self, components: &[Rc<dyn Component>]) -> Vec<Node> {
        components
            .iter()
            .map(|component| self.create_child(component.as_ref()))
            .collect()
    }

    pub fn create_children_and_mount(&self, components: &[Rc<dyn Component>]) -> Vec<Node> {
        components
            .iter()
            .map(|component| self.create_child_and_mount(component.as_ref()))
            .collect()
    }

    /// Free every child, then build `components` in their place.
    pub fn replace_children(&self, components: &[Rc<dyn Component>]) -> Vec<Node> {
        self.clear_children();
        self.create_children_live(components)
    }

    /// Build a child and mount it right away if this node is already live.
    /// Otherwise it mounts together with this node.
    pub fn create_child_live(&self, component: &dyn Component) -> Node {
        if self.state().receives_events() {
            self.create_child_and_mount(component)
        } else {
            self.create_child(component)
        }
    }

    pub fn create_children_live(&self, components: &[Rc<dyn Component>]) -> Vec<Node> {
        components
            .iter()
            .map(|component| self.create_child_live(component.as_ref()))
            .collect()
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Connect `target` to `signal` for as long as this node lives. The
    /// connection is dropped when the node is cleaned up.
    pub fn use_signal<T: Clone + 'static>(
        &self,
        signal: &Signal<T>,
        target: impl SignalTarget<T> + 'static,
    ) -> TargetId {
        let id = signal.connect(target);
        let signal = signal.clone();
        self.on_cleanup(move || {
            signal.disconnect(id);
        });
        id
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path())
            .field("state", &self.state())
            .field("children", &self.child_count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
