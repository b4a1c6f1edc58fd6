//! Tree Errors - Contract violations of the component tree.
//!
//! Every variant describes a broken tree invariant. The core never recovers
//! from these: the plain API forms (`add_child`, `use_context`, ...) log the
//! error and panic, while the `try_*` forms hand it back to the caller.

use crate::types::NodeState;

/// A violated tree contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A child was attached while it still had a parent.
    #[error("node `{child}` already has a parent; detach it before attaching it to `{parent}`")]
    AlreadyHasParent {
        /// Path of the child being attached.
        child: String,
        /// Path of the would-be parent.
        parent: String,
    },

    /// A node was detached from a parent it does not belong to.
    #[error("node `{child}` is not a child of `{parent}`")]
    NotAChild {
        /// Path of the node being detached.
        child: String,
        /// Path of the node it was detached from.
        parent: String,
    },

    /// Attaching would make a node its own ancestor.
    #[error("attaching `{child}` under `{parent}` would create a cycle")]
    WouldCycle {
        /// Path of the node being attached.
        child: String,
        /// Path of the would-be parent.
        parent: String,
    },

    /// The same context type was created twice on one node.
    #[error("context {type_name} already exists on node `{node}`")]
    DuplicateContext {
        /// Rust type name of the context value.
        type_name: &'static str,
        /// Path of the node.
        node: String,
    },

    /// No ancestor provides the requested context type.
    #[error("unable to find a context value for {type_name} above node `{node}`")]
    MissingContext {
        /// Rust type name of the context value.
        type_name: &'static str,
        /// Path of the node performing the lookup.
        node: String,
    },

    /// A signal's target list was modified during its own broadcast.
    #[error("cannot modify signal targets while the signal is broadcasting")]
    SignalFrozen,

    /// An output slot was filled twice.
    #[error("output slot for {type_name} is already initialized")]
    OutAlreadyInitialized {
        /// Rust type name of the slot's value.
        type_name: &'static str,
    },

    /// A keyed list update produced the same key twice.
    #[error("duplicate key {key} in a single keyed list update")]
    DuplicateKey {
        /// Debug rendering of the key.
        key: String,
    },

    /// A lifecycle transition was requested from the wrong state.
    #[error("cannot {action} node `{node}` while it is {state:?}")]
    InvalidState {
        /// Path of the node.
        node: String,
        /// The attempted transition.
        action: &'static str,
        /// The state the node was in.
        state: NodeState,
    },

    /// `Tree::build` was called on a tree that already has a root.
    #[error("tree already has a root node `{root}`")]
    AlreadyBuilt {
        /// Name of the existing root.
        root: String,
    },

    /// A node outlived the tree that created it.
    #[error("the tree owning node `{node}` was dropped")]
    TreeDropped {
        /// Path of the orphaned node.
        node: String,
    },
}

/// Result alias for tree operations.
pub type Result<T, E = TreeError> = std::result::Result<T, E>;

/// Report a contract violation and abort the current operation.
#[track_caller]
pub(crate) fn fatal(err: TreeError) -> ! {
    tracing::error!(error = %err, "tree contract violation");
    panic!("{err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_nodes() {
        let err = TreeError::AlreadyHasParent {
            child: "/root/a".into(),
            parent: "/root/b".into(),
        };
        assert_eq!(
            err.to_string(),
            "node `/root/a` already has a parent; detach it before attaching it to `/root/b`"
        );

        let err = TreeError::InvalidState {
            node: "/root".into(),
            action: "mount",
            state: NodeState::Freed,
        };
        assert_eq!(err.to_string(), "cannot mount node `/root` while it is Freed");
    }

    #[test]
    #[should_panic(expected = "cannot modify signal targets")]
    fn test_fatal_panics_with_message() {
        fatal(TreeError::SignalFrozen);
    }
}
