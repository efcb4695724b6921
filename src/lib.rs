//! ## About
//!
//! **Warning: still under heavy development**
//!
//! This crate turns a user-specified collection of rigid bodies ("links") and the joints
//! between them into a *spanning forest* of mobilized bodies ("mobods"), the structure
//! recursive multibody dynamics algorithms operate on. The input graph may contain
//! kinematic loops, disconnected subgraphs and massless links:
//!
//! * subgraphs without a path to World get a floating (or fixed) base joint,
//! * loops are cut by splitting a link into a primary and a shadow, which are then
//!   welded back together by a loop constraint,
//! * mobilized bodies are numbered depth-first and own contiguous coordinate ranges.
//!
//! See the [LinkJointGraph] struct to get started.
//!
//! ## Reading list
//!
//! * [Sherman et al., Procedia IUTAM 2011: Simbody](https://doi.org/10.1016/j.piutam.2011.04.023)
//! * [Featherstone, Rigid Body Dynamics Algorithms](https://doi.org/10.1007/978-1-4899-7560-7)
//!
//! ## Naming conventions
//! * Structs – substantives that indicate entities
//! * Methods – imperative forms with the exception of getters and factories, which
//!             are uses substantives (i.e., omit a `get_` prefix) much like the standard library.
//!             Fallible getters that check their index use a `get_` prefix, as `slice::get` does.
//! * Indices – one newtype per kind of element, named `<Element>Index`

pub mod arena;
pub mod errors;
pub mod forest;
pub mod graph;
pub mod indexes;
pub mod options;

pub use arena::{DepthFirstIterator, Nodelike};
pub use errors::{Result, TopologyError};
pub use forest::{ForestState, Mobod, SpanningForest, Tree};
pub use graph::{Joint, JointModeling, JointTraits, Link, LinkJointGraph, LoopConstraint};
pub use indexes::{
    BodyIndex, JointIndex, JointTypeIndex, LinkCompositeIndex, LoopConstraintIndex, MobodIndex, ModelInstanceIndex,
    TreeIndex, WeldedMobodsIndex, DEFAULT_MODEL_INSTANCE, WORLD_INDEX, WORLD_MOBOD_INDEX, WORLD_MODEL_INSTANCE,
};
pub use options::{BaseBodyCandidate, BaseBodyPolicy, ForestBuildingOptions, JointFlags, LinkFlags};
