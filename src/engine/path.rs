//! Node Paths - Filesystem-style addressing of nodes.
//!
//! - `/root/a` - absolute, first segment names the tree root
//! - `.` - the current node
//! - `..` - the parent
//! - `name` - a named child
//!
//! Empty segments are ignored, so `a//b/` equals `a/b`.

use std::fmt;

/// A parsed path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Current,
    Parent,
    Named(&'a str),
}

/// A path to a node, resolved with [`Node::get_node`](crate::Node::get_node).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    raw: String,
}

impl NodePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self { raw: path.into() }
    }

    /// Whether the path starts at the tree root.
    pub fn is_absolute(&self) -> bool {
        self.raw.starts_with('/')
    }

    /// Non-empty segments in order.
    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        self.raw
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "." => Segment::Current,
                ".." => Segment::Parent,
                name => Segment::Named(name),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for NodePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for NodePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<&NodePath> for NodePath {
    fn from(path: &NodePath) -> Self {
        path.clone()
    }
}
