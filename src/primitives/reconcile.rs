//! Keyed Reconciliation - Diff a keyed collection against live nodes.
//!
//! One pass over a new snapshot of items:
//! 1. Every live `(key, node)` pair moves to a scratch map and is detached
//! 2. Items are walked in order; a key found in scratch reclaims its node and
//!    re-attaches it, an unknown key builds a new node from the render function
//! 3. Every node is registered again under its key
//! 4. Whatever is left in scratch belongs to removed items and is freed
//!
//! Reclaimed nodes keep their identity, so any state their component set up
//! (handlers, timers, context) survives reordering and unrelated updates.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use super::component::Component;
use crate::engine::Node;
use crate::error::{Result, TreeError};
use crate::types::NodeState;

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReconcileStats {
    /// Nodes reclaimed from the previous generation.
    pub reused: usize,
    /// Nodes built from the render function.
    pub created: usize,
    /// Nodes freed because their item disappeared.
    pub freed: usize,
}

impl ReconcileStats {
    pub(crate) fn is_noop(&self) -> bool {
        self.created == 0 && self.freed == 0
    }
}

/// Live item nodes of one keyed list, by key.
pub(crate) type KeyedNodes<K> = HashMap<K, Node>;

/// Reconcile `parent`'s item children against `items`.
///
/// Keys are checked for duplicates before the tree is touched, so a
/// [`TreeError::DuplicateKey`] leaves `live` and the children unchanged.
pub(crate) fn reconcile<T, K>(
    parent: &Node,
    live: &mut KeyedNodes<K>,
    items: &[T],
    key_of: &dyn Fn(&T) -> K,
    render: &dyn Fn(&T, usize) -> Rc<dyn Component>,
) -> Result<ReconcileStats>
where
    K: Eq + Hash + Debug,
{
    let keys: Vec<K> = items.iter().map(key_of).collect();
    let mut seen = HashSet::with_capacity(keys.len());
    for key in &keys {
        if !seen.insert(key) {
            return Err(TreeError::DuplicateKey {
                key: format!("{key:?}"),
            });
        }
    }

    let mut scratch = std::mem::take(live);
    for node in scratch.values() {
        detach(parent, node);
    }

    let mut stats = ReconcileStats::default();
    for (index, (item, key)) in items.iter().zip(keys).enumerate() {
        let node = match scratch.remove(&key) {
            Some(node) if is_reusable(&node) => {
                parent.try_add_child(&node)?;
                stats.reused += 1;
                node
            }
            stale => {
                if let Some(stale) = stale {
                    stale.free();
                    stats.freed += 1;
                }
                stats.created += 1;
                parent.create_child_live(render(item, index).as_ref())
            }
        };
        live.insert(key, node);
    }

    for node in scratch.into_values() {
        node.free();
        stats.freed += 1;
    }

    if !stats.is_noop() {
        tracing::debug!(
            list = %parent.path(),
            reused = stats.reused,
            created = stats.created,
            freed = stats.freed,
            "keyed list reconciled"
        );
    }
    Ok(stats)
}

fn detach(parent: &Node, node: &Node) {
    let attached = node.parent().is_some_and(|current| current.ptr_eq(parent));
    if attached {
        parent.remove_child(node);
    }
}

/// Nodes queued for deletion or already freed are replaced, not reclaimed.
fn is_reusable(node: &Node) -> bool {
    matches!(node.state(), NodeState::Building | NodeState::Mounted) && node.parent().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Tree;
    use crate::primitives::Group;
    use proptest::prelude::*;

    fn render_named(item: &&'static str, _index: usize) -> Rc<dyn Component> {
        Rc::new(Group::named(*item))
    }

    fn setup() -> (Tree, Node) {
        let tree = Tree::new();
        let list = tree.build(&Group::named("list"));
        (tree, list)
    }

    fn names(node: &Node) -> Vec<String> {
        node.children().iter().map(Node::name).collect()
    }

    #[test]
    fn test_first_pass_creates_everything() {
        let (_tree, list) = setup();
        let mut live = KeyedNodes::new();

        let stats = reconcile(&list, &mut live, &["a", "b"], &|item| *item, &render_named).unwrap();
        assert_eq!(stats, ReconcileStats { reused: 0, created: 2, freed: 0 });
        assert_eq!(names(&list), vec!["a", "b"]);
        assert!(list.children().iter().all(Node::is_mounted));
    }

    #[test]
    fn test_reorder_keeps_nodes() {
        let (_tree, list) = setup();
        let mut live = KeyedNodes::new();
        reconcile(&list, &mut live, &["a", "b", "c"], &|item| *item, &render_named).unwrap();
        let before = list.children();

        let stats = reconcile(&list, &mut live, &["c", "a", "b"], &|item| *item, &render_named).unwrap();
        assert!(stats.is_noop());
        assert_eq!(stats.reused, 3);
        assert_eq!(names(&list), vec!["c", "a", "b"]);
        assert!(list.children()[0].ptr_eq(&before[2]));
    }

    #[test]
    fn test_duplicate_key_leaves_tree_untouched() {
        let (_tree, list) = setup();
        let mut live = KeyedNodes::new();
        reconcile(&list, &mut live, &["a"], &|item| *item, &render_named).unwrap();

        let err = reconcile(&list, &mut live, &["b", "b"], &|item| *item, &render_named).unwrap_err();
        assert_eq!(err, TreeError::DuplicateKey { key: "\"b\"".into() });
        assert_eq!(names(&list), vec!["a"]);
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn test_node_queued_for_deletion_is_replaced() {
        let (tree, list) = setup();
        let mut live = KeyedNodes::new();
        reconcile(&list, &mut live, &["a"], &|item| *item, &render_named).unwrap();
        let old = list.children()[0].clone();

        old.queue_free();
        let stats = reconcile(&list, &mut live, &["a"], &|item| *item, &render_named).unwrap();
        assert_eq!(stats, ReconcileStats { reused: 0, created: 1, freed: 1 });

        tree.flush_deferred_queue();
        assert!(old.is_freed());
        assert_eq!(list.child_count(), 1);
        assert!(!list.children()[0].ptr_eq(&old));
    }

    proptest! {
        #[test]
        fn test_surviving_keys_keep_their_nodes(
            first in proptest::collection::hash_set(0u8..16, 0..10),
            second in proptest::collection::hash_set(0u8..16, 0..10),
        ) {
            let (_tree, list) = setup();
            let mut live = KeyedNodes::new();
            let render = |item: &u8, _: usize| -> Rc<dyn Component> {
                Rc::new(Group::named(item.to_string()))
            };

            let first: Vec<u8> = first.into_iter().collect();
            let second: Vec<u8> = second.into_iter().collect();
            reconcile(&list, &mut live, &first, &|item| *item, &render).unwrap();
            let before = live.clone();

            let stats = reconcile(&list, &mut live, &second, &|item| *item, &render).unwrap();

            let kept = second.iter().filter(|key| before.contains_key(*key)).count();
            prop_assert_eq!(stats.reused, kept);
            prop_assert_eq!(stats.created, second.len() - kept);
            prop_assert_eq!(stats.freed, first.len() - kept);
            prop_assert_eq!(list.child_count(), second.len());

            for (key, node) in &before {
                match live.get(key) {
                    Some(current) => {
                        prop_assert!(current.ptr_eq(node));
                    }
                    None => {
                        prop_assert!(node.is_freed());
                    }
                }
            }
            let order: Vec<String> = list.children().iter().map(Node::name).collect();
            let expected: Vec<String> = second.iter().map(u8::to_string).collect();
            prop_assert_eq!(order, expected);
        }
    }
}
