//! [Arena memory allocated](https://en.wikipedia.org/wiki/Region-based_memory_management)
//! tree helpers: depth-first traversal of nodes that refer to each other by index, and
//! in-place renumbering of an arena once a better order is known.

pub mod iterables;
pub mod iterators;
mod utils;

pub use iterables::Nodelike;
pub use iterators::DepthFirstIterator;
pub use utils::{invert_permutation, sort_by_indices};
