//! Tree - Owner of the root node and the deferred queue.
//!
//! The tree is the entry point the host loop talks to:
//! - [`Tree::build`] turns a root component into a mounted node hierarchy
//! - [`Tree::call`] dispatches a frame event from the root
//! - [`Tree::flush_deferred_queue`] runs everything scheduled during the frame
//! - [`Tree::free`] tears the hierarchy down
//!
//! # Example
//!
//! ```ignore
//! let tree = Tree::new();
//! tree.build(&Group::named("root").child(Player));
//! tree.call(&Update { delta: 0.016 });
//! tree.flush_deferred_queue();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use super::deferred::{DeferredAction, Scheduler};
use super::node::Node;
use super::path::NodePath;
use crate::error::{Result, TreeError, fatal};
use crate::primitives::Component;

pub(crate) struct TreeInner {
    scheduler: Scheduler,
    root: RefCell<Option<Node>>,
}

impl TreeInner {
    pub(crate) fn root(&self) -> Option<Node> {
        self.root.borrow().clone()
    }
}

/// Shared handle to a component tree. Clones refer to the same tree.
#[derive(Clone)]
pub struct Tree {
    inner: Rc<TreeInner>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(TreeInner {
                scheduler: Scheduler::new(),
                root: RefCell::new(None),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<TreeInner>) -> Self {
        Self { inner }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// A detached node bound to this tree, in the `Building` state.
    pub fn create_node(&self, name: impl Into<String>) -> Node {
        Node::new(name, Rc::downgrade(&self.inner), self.inner.scheduler.clone())
    }

    pub fn root(&self) -> Option<Node> {
        self.inner.root()
    }

    // =========================================================================
    // Build / Free
    // =========================================================================

    /// Build `component` as the root and mount the resulting hierarchy.
    pub fn try_build(&self, component: &dyn Component) -> Result<Node> {
        self.ensure_unbuilt()?;
        let root = component.build(self, None);
        self.install_root(root.clone())?;
        Ok(root)
    }

    pub fn build(&self, component: &dyn Component) -> Node {
        self.try_build(component).unwrap_or_else(|err| fatal(err))
    }

    /// Adopt a node assembled by hand as the root and mount it.
    pub fn try_build_node(&self, root: &Node) -> Result<()> {
        self.ensure_unbuilt()?;
        self.install_root(root.clone())
    }

    pub fn build_node(&self, root: &Node) {
        self.try_build_node(root).unwrap_or_else(|err| fatal(err))
    }

    fn ensure_unbuilt(&self) -> Result<()> {
        match self.root() {
            Some(root) => Err(TreeError::AlreadyBuilt { root: root.name() }),
            None => Ok(()),
        }
    }

    fn install_root(&self, root: Node) -> Result<()> {
        *self.inner.root.borrow_mut() = Some(root.clone());
        root.try_mount()?;
        tracing::debug!(root = %root.name(), "tree built");
        Ok(())
    }

    /// Free the root and its subtree. The tree can be built again afterwards.
    pub fn free(&self) {
        let root = self.inner.root.borrow_mut().take();
        if let Some(root) = root {
            root.free();
            tracing::debug!(root = %root.name(), "tree freed");
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Dispatch `event` from the root. No-op before the tree is built.
    pub fn call<T: 'static>(&self, event: &T) {
        if let Some(root) = self.root() {
            root.call(event);
        }
    }

    pub fn call_default<T: Default + 'static>(&self) {
        self.call(&T::default());
    }

    /// Resolve an absolute path, e.g. `/root/player`.
    pub fn get_node(&self, path: impl Into<NodePath>) -> Option<Node> {
        self.root()?.get_node(path)
    }

    // =========================================================================
    // Deferred Queue
    // =========================================================================

    pub fn enqueue(&self, action: Rc<dyn DeferredAction>) -> bool {
        self.inner.scheduler.enqueue(action)
    }

    pub fn call_deferred(&self, action: impl FnOnce() + 'static) {
        self.inner.scheduler.call_deferred(action);
    }

    pub fn call_deferred_with<T: 'static>(&self, action: impl FnOnce(T) + 'static, args: T) {
        self.inner.scheduler.call_deferred_with(action, args);
    }

    /// Run the actions scheduled since the last flush. Returns how many ran.
    pub fn flush_deferred_queue(&self) -> usize {
        self.inner.scheduler.flush()
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("root", &self.root())
            .field("pending", &self.inner.scheduler.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{FnComponent, Group};
    use crate::test_support::CallLog;
    use crate::types::NodeState;
    use std::cell::Cell;

    #[test]
    fn test_build_mounts_root_component() {
        let tree = Tree::new();
        let root = tree.build(&Group::named("root").child(Group::named("child")));

        assert!(root.is_mounted());
        assert_eq!(root.name(), "root");
        assert!(tree.get_node("/root/child").unwrap().is_mounted());
    }

    #[test]
    fn test_build_twice_is_rejected() {
        let tree = Tree::new();
        tree.build(&Group::named("root"));

        let err = tree.try_build(&Group::named("again")).unwrap_err();
        assert_eq!(err, TreeError::AlreadyBuilt { root: "root".into() });
    }

    #[test]
    fn test_free_then_rebuild() {
        let tree = Tree::new();
        let first = tree.build(&Group::named("root"));
        tree.free();
        assert_eq!(first.state(), NodeState::Freed);
        assert!(tree.root().is_none());

        let second = tree.build(&Group::named("root"));
        assert!(!second.ptr_eq(&first));
    }

    #[test]
    fn test_root_is_visible_to_mount_hooks() {
        let tree = Tree::new();
        let found = Rc::new(Cell::new(false));
        let found_clone = found.clone();

        tree.build(&FnComponent::new(move |node, _| {
            let found = found_clone.clone();
            let hook_node = node.clone();
            node.on_mount(move || found.set(hook_node.get_node("/FnComponent").is_some()));
            Vec::new()
        }));
        assert!(found.get());
    }

    #[test]
    fn test_call_before_build_is_noop() {
        let tree = Tree::new();
        tree.call(&42_u32);
        assert_eq!(tree.flush_deferred_queue(), 0);
    }

    #[test]
    fn test_deferred_calls_run_on_flush() {
        let tree = Tree::new();
        let log = CallLog::default();

        tree.call_deferred(log.hook("first"));
        tree.call_deferred_with(
            {
                let log = log.clone();
                move |name: &'static str| log.push(name)
            },
            "second",
        );
        assert!(log.entries().is_empty());

        assert_eq!(tree.flush_deferred_queue(), 2);
        assert_eq!(log.entries(), vec!["first", "second"]);
    }
}
