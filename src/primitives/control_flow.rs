//! Control Flow Primitives - Conditional, keyed list and portal components.
//!
//! - [`Conditional`] - mounts a fixed child set while a boolean signal is true
//! - [`For`] - one child per item of a keyed collection, reconciled on change
//! - [`Portal`] - builds its children under another node, found by path
//!
//! # Pattern: Synchronous initial state, throttled updates
//!
//! `Conditional` and `For` read their signal's current value during init and
//! return (or create) the matching children right away, so they mount with
//! the rest of the subtree and a signal set before the component existed is
//! never missed. Every later emission goes through a throttled target: any
//! number of changes within one frame collapse into a single structural
//! update at the next deferred flush, carrying the latest value.
//!
//! ```ignore
//! let visible = Signal::new(true);
//! let enemies = ReactiveList::new();
//!
//! Group::named("level")
//!     .child(Hud.when(&visible))
//!     .child(For::over(&enemies, |enemy: &Enemy| enemy.id, |enemy, _| EnemyView::new(enemy)));
//! ```
//!
//! # Component Lifecycle
//!
//! ## Conditional
//! - `false → true`: children are built and mounted
//! - `true → false`: children are freed and detached
//! - repeated values are no-ops
//!
//! ## For
//! - new keys: a node is built from the render function and mounted
//! - surviving keys: the same node is moved into the new order
//! - removed keys: the node is freed
//! - duplicate keys in one emission are a contract violation

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use super::component::{Children, Component};
use super::reconcile::{self, KeyedNodes};
use crate::engine::{Node, NodePath};
use crate::error::fatal;
use crate::state::{ReactiveList, Signal, TargetExt};

// =============================================================================
// Conditional
// =============================================================================

/// Mounts `children` while `when` is true.
#[derive(Clone)]
pub struct Conditional {
    when: Signal<bool>,
    children: Children,
}

impl Conditional {
    pub fn new(when: Signal<bool>, children: Children) -> Self {
        Self { when, children }
    }

    pub fn child(mut self, component: impl Component) -> Self {
        self.children.push(Rc::new(component));
        self
    }
}

impl Component for Conditional {
    fn name(&self) -> String {
        "Conditional".into()
    }

    fn init(&self, node: &Node) -> Children {
        let visible = Rc::new(Cell::new(self.when.value()));

        let weak = node.downgrade();
        let children = self.children.clone();
        let state = visible.clone();
        let apply = move |show: &bool| {
            let Some(node) = weak.upgrade_live() else {
                return;
            };
            if state.replace(*show) == *show {
                return;
            }

            if *show {
                node.create_children_live(&children);
            } else {
                node.clear_children();
            }
        };
        node.use_signal(&self.when, apply.throttled(node.scheduler()));

        if visible.get() {
            self.children.clone()
        } else {
            Vec::new()
        }
    }
}

// =============================================================================
// For
// =============================================================================

type KeyFn<T, K> = Rc<dyn Fn(&T) -> K>;
type RenderFn<T> = Rc<dyn Fn(&T, usize) -> Rc<dyn Component>>;

/// Renders one child per item of a keyed collection.
///
/// # Arguments
///
/// * `items` - signal emitting the full collection after every change
/// * `key` - stable, unique key per item
/// * `render` - builds the component for a newly seen item and its index
///
/// Nodes of items that survive an update are moved, never rebuilt, so any
/// state their component keeps (timers, tweens, handlers) carries over.
pub struct For<T, K> {
    items: Signal<Vec<T>>,
    key: KeyFn<T, K>,
    render: RenderFn<T>,
}

impl<T, K> Clone for For<T, K> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            key: self.key.clone(),
            render: self.render.clone(),
        }
    }
}

impl<T, K> For<T, K>
where
    T: Clone + 'static,
    K: Eq + Hash + Debug + 'static,
{
    pub fn new<C: Component>(
        items: &Signal<Vec<T>>,
        key: impl Fn(&T) -> K + 'static,
        render: impl Fn(&T, usize) -> C + 'static,
    ) -> Self {
        Self {
            items: items.clone(),
            key: Rc::new(key),
            render: Rc::new(move |item: &T, index| Rc::new(render(item, index)) as Rc<dyn Component>),
        }
    }

    /// Follow a [`ReactiveList`].
    pub fn over<C: Component>(
        list: &ReactiveList<T>,
        key: impl Fn(&T) -> K + 'static,
        render: impl Fn(&T, usize) -> C + 'static,
    ) -> Self
    where
        T: PartialEq,
    {
        Self::new(list.changed(), key, render)
    }
}

impl<T, K> Component for For<T, K>
where
    T: Clone + 'static,
    K: Eq + Hash + Debug + 'static,
{
    fn name(&self) -> String {
        "For".into()
    }

    fn init(&self, node: &Node) -> Children {
        let live: Rc<RefCell<KeyedNodes<K>>> = Rc::default();

        let weak = node.downgrade();
        let key = self.key.clone();
        let render = self.render.clone();
        let nodes = live.clone();
        let update = move |items: &Vec<T>| {
            let Some(node) = weak.upgrade_live() else {
                return;
            };
            // No borrow of the map is held while components are built
            let mut current = std::mem::take(&mut *nodes.borrow_mut());
            let result = reconcile::reconcile(&node, &mut current, items, &*key, &*render);
            *nodes.borrow_mut() = current;
            if let Err(err) = result {
                fatal(err);
            }
        };

        // Initial items become ordinary children of the node being built
        let initial = self.items.value();
        update(&initial);

        node.use_signal(&self.items, update.throttled(node.scheduler()));
        node.on_cleanup(move || live.borrow_mut().clear());
        Vec::new()
    }
}

// =============================================================================
// Portal
// =============================================================================

/// Builds its children under the node at `target` instead of under itself.
///
/// The target is resolved relative to the portal at the first deferred flush
/// after init, when the rest of the tree exists. Portaled children look up
/// context from their new ancestors. They are freed with the portal.
#[derive(Clone)]
pub struct Portal {
    target: NodePath,
    children: Children,
}

impl Portal {
    pub fn new(target: impl Into<NodePath>) -> Self {
        Self {
            target: target.into(),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, component: impl Component) -> Self {
        self.children.push(Rc::new(component));
        self
    }
}

impl Component for Portal {
    fn name(&self) -> String {
        "Portal".into()
    }

    fn init(&self, node: &Node) -> Children {
        let portaled: Rc<RefCell<Vec<Node>>> = Rc::default();

        let weak = node.downgrade();
        let target = self.target.clone();
        let children = self.children.clone();
        let built = portaled.clone();
        node.call_deferred(move || {
            let Some(portal) = weak.upgrade_live() else {
                return;
            };
            let Some(destination) = portal.get_node(&target) else {
                tracing::warn!(portal = %portal.path(), target = %target, "portal target not found");
                return;
            };
            *built.borrow_mut() = destination.create_children_live(&children);
        });

        node.on_cleanup(move || {
            for child in portaled.take() {
                if let Some(parent) = child.parent() {
                    parent.remove_child(&child);
                }
                child.free();
            }
        });
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::children;
    use crate::engine::Tree;
    use crate::primitives::{ComponentExt, FnComponent, Group};
    use crate::test_support::CallLog;
    use tracing_test::traced_test;

    // -------------------------------------------------------------------------
    // Conditional
    // -------------------------------------------------------------------------

    fn tracked(log: &CallLog, name: &'static str) -> FnComponent {
        let log = log.clone();
        FnComponent::new(move |node, _| {
            node.on_mount(log.hook(&format!("{name}.mount")));
            node.on_cleanup(log.hook(&format!("{name}.cleanup")));
            Vec::new()
        })
        .with_name(name)
    }

    #[test]
    fn test_conditional_replays_initial_true() {
        let tree = Tree::new();
        let log = CallLog::default();
        let visible = Signal::new(false);
        visible.emit(true);

        tree.build(&Group::named("root").child(tracked(&log, "panel").when(&visible)));

        assert_eq!(log.entries(), vec!["panel.mount"]);
        assert!(tree.get_node("/root/Conditional/panel").unwrap().is_mounted());
    }

    #[test]
    fn test_conditional_initial_false_builds_nothing() {
        let tree = Tree::new();
        let log = CallLog::default();
        let visible = Signal::new(false);

        tree.build(&Group::named("root").child(tracked(&log, "panel").when(&visible)));
        tree.flush_deferred_queue();

        assert!(log.entries().is_empty());
        assert_eq!(tree.get_node("/root/Conditional").unwrap().child_count(), 0);
    }

    #[test]
    fn test_conditional_toggles_at_flush() {
        let tree = Tree::new();
        let log = CallLog::default();
        let visible = Signal::new(false);
        tree.build(&Group::named("root").child(tracked(&log, "panel").when(&visible)));

        visible.emit(true);
        assert!(log.entries().is_empty());
        tree.flush_deferred_queue();
        assert_eq!(log.entries(), vec!["panel.mount"]);

        visible.emit(false);
        tree.flush_deferred_queue();
        assert_eq!(log.entries(), vec!["panel.mount", "panel.cleanup"]);
        assert_eq!(tree.get_node("/root/Conditional").unwrap().child_count(), 0);
    }

    #[test]
    fn test_conditional_collapses_flips_within_a_frame() {
        let tree = Tree::new();
        let log = CallLog::default();
        let visible = Signal::new(true);
        tree.build(&Group::named("root").child(tracked(&log, "panel").when(&visible)));

        visible.emit(false);
        visible.emit(true);
        visible.emit(true);
        tree.flush_deferred_queue();

        assert_eq!(log.entries(), vec!["panel.mount"]);
    }

    #[test]
    fn test_conditional_disconnects_when_freed() {
        let tree = Tree::new();
        let visible = Signal::new(true);
        tree.build(&Group::named("root").child(Group::named("panel").when(&visible)));
        assert_eq!(visible.target_count(), 1);

        tree.free();
        assert_eq!(visible.target_count(), 0);
    }

    // -------------------------------------------------------------------------
    // For
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
    }

    fn item_list(log: &CallLog, ids: &[&'static str]) -> (ReactiveList<Item>, For<Item, &'static str>) {
        let list = ReactiveList::from_items(ids.iter().map(|id| Item { id }).collect());
        let log = log.clone();
        let component = For::over(&list, |item: &Item| item.id, move |item, _| tracked(&log, item.id));
        (list, component)
    }

    fn child_names(node: &Node) -> Vec<String> {
        node.children().iter().map(Node::name).collect()
    }

    #[test]
    fn test_for_renders_initial_items_with_the_subtree() {
        let tree = Tree::new();
        let log = CallLog::default();
        let (_list, component) = item_list(&log, &["a", "b"]);

        let root = tree.build(&component);
        assert_eq!(child_names(&root), vec!["a", "b"]);
        assert_eq!(log.entries(), vec!["a.mount", "b.mount"]);
    }

    #[test]
    fn test_for_reuses_surviving_nodes() {
        let tree = Tree::new();
        let log = CallLog::default();
        let (list, component) = item_list(&log, &["A", "B", "C"]);
        let root = tree.build(&component);
        let before = root.children();

        list.remove(&Item { id: "A" });
        list.add(Item { id: "D" });
        tree.flush_deferred_queue();

        let after = root.children();
        assert_eq!(child_names(&root), vec!["B", "C", "D"]);
        assert!(after[0].ptr_eq(&before[1]));
        assert!(after[1].ptr_eq(&before[2]));
        assert!(before[0].is_freed());
        assert!(after[2].is_mounted());

        assert_eq!(log.count("A.cleanup"), 1);
        assert_eq!(log.count("D.mount"), 1);
        assert_eq!(log.count("B.mount"), 1);
        assert_eq!(log.count("C.mount"), 1);
        assert_eq!(log.count("B.cleanup"), 0);
        assert_eq!(log.count("C.cleanup"), 0);
    }

    #[test]
    fn test_for_reconciles_once_per_flush() {
        let tree = Tree::new();
        let log = CallLog::default();
        let (list, component) = item_list(&log, &[]);
        let root = tree.build(&component);

        list.add(Item { id: "x" });
        list.remove(&Item { id: "x" });
        list.add(Item { id: "y" });
        assert_eq!(root.child_count(), 0);

        tree.flush_deferred_queue();
        assert_eq!(child_names(&root), vec!["y"]);
        assert_eq!(log.entries(), vec!["y.mount"]);
    }

    #[test]
    fn test_for_reorders() {
        let tree = Tree::new();
        let items = Signal::new(vec![1, 2, 3]);
        let root = tree.build(&For::new(&items, |n: &i32| *n, |n, _| Group::named(n.to_string())));
        let before = root.children();

        items.emit(vec![3, 1, 2]);
        tree.flush_deferred_queue();

        let after = root.children();
        assert!(after[0].ptr_eq(&before[2]));
        assert!(after[1].ptr_eq(&before[0]));
        assert!(after[2].ptr_eq(&before[1]));
    }

    #[test]
    #[should_panic(expected = "duplicate key")]
    fn test_for_duplicate_keys_are_fatal() {
        let tree = Tree::new();
        let items = Signal::new(vec![1, 1]);
        tree.build(&For::new(&items, |n: &i32| *n, |n, _| Group::named(n.to_string())));
    }

    #[test]
    fn test_for_render_receives_index() {
        let tree = Tree::new();
        let items = Signal::new(vec!["x", "y"]);
        let root = tree.build(&For::new(&items, |s: &&'static str| *s, |s, index| {
            Group::named(format!("{s}{index}"))
        }));
        assert_eq!(child_names(&root), vec!["x0", "y1"]);
    }

    // -------------------------------------------------------------------------
    // Portal
    // -------------------------------------------------------------------------

    #[test]
    fn test_portal_children_use_target_context() {
        let tree = Tree::new();
        let seen = Rc::new(Cell::new(0));

        let sink = seen.clone();
        tree.build(&FnComponent::new(move |node, _| {
            node.create_context(0_i32);
            let sink = sink.clone();
            children![
                FnComponent::new(|node, _| {
                    node.create_context(1_i32);
                    Vec::new()
                })
                .with_name("remote-parent"),
                Portal::new("/root/remote-parent").child(FnComponent::new(move |node, _| {
                    sink.set(*node.use_context::<i32>());
                    Vec::new()
                })),
            ]
        })
        .with_name("root"));

        assert_eq!(seen.get(), 0);
        tree.flush_deferred_queue();
        assert_eq!(seen.get(), 1);
        assert!(tree.get_node("/root/remote-parent/FnComponent").unwrap().is_mounted());
    }

    #[test]
    fn test_portal_is_deferred() {
        let tree = Tree::new();
        let log = CallLog::default();
        tree.build(
            &Group::named("root")
                .child(Group::named("target"))
                .child(Portal::new("../target").child(tracked(&log, "portaled"))),
        );

        assert!(log.entries().is_empty());
        tree.flush_deferred_queue();
        assert_eq!(log.entries(), vec!["portaled.mount"]);
    }

    #[test]
    fn test_portal_cleanup_frees_portaled_children() {
        let tree = Tree::new();
        let log = CallLog::default();
        let root = tree.build(
            &Group::named("root")
                .child(Group::named("target"))
                .child(Portal::new("/root/target").child(tracked(&log, "portaled"))),
        );
        tree.flush_deferred_queue();

        let portal = root.get_child("Portal").unwrap();
        root.remove_child(&portal);
        portal.free();

        assert_eq!(log.entries(), vec!["portaled.mount", "portaled.cleanup"]);
        assert_eq!(root.get_child("target").unwrap().child_count(), 0);
    }

    #[traced_test]
    #[test]
    fn test_portal_missing_target_warns() {
        let tree = Tree::new();
        let log = CallLog::default();
        tree.build(&Group::named("root").child(Portal::new("/root/nowhere").child(tracked(&log, "lost"))));
        tree.flush_deferred_queue();

        assert!(log.entries().is_empty());
        assert!(logs_contain("portal target not found"));
    }
}
