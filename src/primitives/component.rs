//! Components - Blueprints that build nodes.
//!
//! A component is an immutable description. Building it creates a [`Node`],
//! attaches it to the parent, runs [`Component::init`] against the node and
//! then builds whatever children `init` returned. Nothing is mounted during
//! the build; the tree mounts the finished hierarchy top-down afterwards.
//!
//! # Example
//!
//! ```ignore
//! struct Player;
//!
//! impl Component for Player {
//!     fn init(&self, node: &Node) -> Children {
//!         let time = node.use_time();
//!         let _ = node.on::<Update>(move |_| println!("{}", time.elapsed()));
//!         children![Sprite::new("player.png")]
//!     }
//! }
//! ```

use std::rc::Rc;

use crate::engine::{Node, Tree};
use crate::state::Signal;

use super::control_flow::Conditional;

/// The child blueprints returned from [`Component::init`].
pub type Children = Vec<Rc<dyn Component>>;

/// Build a [`Children`] list from component values.
#[macro_export]
macro_rules! children {
    () => {
        ::std::vec::Vec::<::std::rc::Rc<dyn $crate::primitives::Component>>::new()
    };
    ($($component:expr),+ $(,)?) => {
        ::std::vec![$(::std::rc::Rc::new($component) as ::std::rc::Rc<dyn $crate::primitives::Component>),+]
    };
}

pub trait Component: 'static {
    /// Initial node name. Defaults to the type name without its module path.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Set up `node` (context, handlers, hooks, signals) and return its children.
    fn init(&self, node: &Node) -> Children;

    /// Create the node, attach it under `parent`, initialize it and build its
    /// children. Override only to change how the node itself is created.
    fn build(&self, tree: &Tree, parent: Option<&Node>) -> Node {
        let node = tree.create_node(self.name());
        if let Some(parent) = parent {
            parent.add_child(&node);
        }

        let children = self.init(&node);
        for child in &children {
            child.build(tree, Some(&node));
        }
        node
    }
}

/// `my_crate::ui::Panel<my_crate::Item>` → `Panel`
fn short_type_name(full: &str) -> String {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_owned()
}

/// Convenience adapters for any concrete component.
pub trait ComponentExt: Component + Sized {
    fn rc(self) -> Rc<dyn Component> {
        Rc::new(self)
    }

    /// Mount this component only while `condition` is true.
    fn when(self, condition: &Signal<bool>) -> Conditional {
        Conditional::new(condition.clone(), vec![self.rc()])
    }
}

impl<C: Component> ComponentExt for C {}

// =============================================================================
// Group
// =============================================================================

/// A plain named container of child components.
#[derive(Clone, Default)]
pub struct Group {
    name: Option<String>,
    children: Children,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, component: impl Component) -> Self {
        self.children.push(Rc::new(component));
        self
    }

    pub fn children(mut self, children: Children) -> Self {
        self.children.extend(children);
        self
    }
}

impl Component for Group {
    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "Group".into())
    }

    fn init(&self, _node: &Node) -> Children {
        self.children.clone()
    }
}

// =============================================================================
// FnComponent
// =============================================================================

type InitFn = Rc<dyn Fn(&Node, &Children) -> Children>;

/// A component defined by a closure. The closure receives the node and the
/// children given with [`FnComponent::child`], and returns the children to build.
#[derive(Clone)]
pub struct FnComponent {
    name: Option<String>,
    init: InitFn,
    children: Children,
}

impl FnComponent {
    pub fn new(init: impl Fn(&Node, &Children) -> Children + 'static) -> Self {
        Self {
            name: None,
            init: Rc::new(init),
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn child(mut self, component: impl Component) -> Self {
        self.children.push(Rc::new(component));
        self
    }
}

impl Component for FnComponent {
    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "FnComponent".into())
    }

    fn init(&self, node: &Node) -> Children {
        (self.init)(node, &self.children)
    }
}
