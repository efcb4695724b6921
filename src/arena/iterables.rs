//! Definition of the interface for nodes stored in an arena
use std::fmt::Debug;

/// A node stored in an arena (a `Vec`) that refers to its children by index.
pub trait Nodelike {
    /// Index type used to refer to other nodes of the same arena.
    type Index: Copy + Debug + Into<usize>;

    fn index(&self) -> Self::Index;

    /// Children in the order they were added.
    fn children(&self) -> &[Self::Index];

    /// Get the node's distance to the root node.
    fn depth(&self) -> usize;

    fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }
}
