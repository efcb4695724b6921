//! Type-safe indices into the arenas of the graph and the forest.
//!
//! Every element lives in a `Vec` and is referred to by position only, never by
//! reference. Each kind of element gets its own newtype so a [BodyIndex] cannot be
//! used where a [MobodIndex] is expected.

use core::fmt;

macro_rules! arena_index {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub usize);

        impl $name {
            /// Position in the arena this index refers to.
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }

        impl From<$name> for usize {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_index!(
    /// Identifies a Link. World is always `BodyIndex(0)`.
    BodyIndex
);
arena_index!(
    /// Identifies a Joint slot. Slots of removed joints are never reused.
    JointIndex
);
arena_index!(
    /// Identifies a registered joint type; `JointTypeIndex(0)` is the weld.
    JointTypeIndex
);
arena_index!(ModelInstanceIndex);
arena_index!(
    /// Identifies a mobilized body. World is always `MobodIndex(0)` and the rest are
    /// numbered depth-first once the forest is built.
    MobodIndex
);
arena_index!(TreeIndex);
arena_index!(LoopConstraintIndex);
arena_index!(WeldedMobodsIndex);
arena_index!(LinkCompositeIndex);

/// The model instance World must belong to.
pub const WORLD_MODEL_INSTANCE: ModelInstanceIndex = ModelInstanceIndex(0);

/// The model instance for elements that were not given one explicitly.
pub const DEFAULT_MODEL_INSTANCE: ModelInstanceIndex = ModelInstanceIndex(1);

/// World's link.
pub const WORLD_INDEX: BodyIndex = BodyIndex(0);

/// World's mobilized body.
pub const WORLD_MOBOD_INDEX: MobodIndex = MobodIndex(0);
