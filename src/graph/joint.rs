//! Connections between two links and the registry entries describing their types.

use crate::{BodyIndex, JointFlags, JointIndex, JointTypeIndex, LinkCompositeIndex, MobodIndex, ModelInstanceIndex};

/// This is all we need to know about a joint type for topological purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointTraits {
    pub name: String,
    /// Number of generalized positions.
    pub nq: usize,
    /// Number of generalized velocities.
    pub nv: usize,
    /// If so, the first four positions are a quaternion in w, x, y, z order.
    pub has_quaternion: bool,
}

impl JointTraits {
    pub(crate) fn new(name: &str, nq: usize, nv: usize, has_quaternion: bool) -> Self {
        JointTraits {
            name: name.to_string(),
            nq,
            nv,
            has_quaternion,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.nq <= 7 && self.nv <= 6 && self.nv <= self.nq && (!self.has_quaternion || self.nq >= 4)
    }
}

/// How a joint is represented in the current forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointModeling {
    /// No valid forest, or the joint has not been reached yet.
    #[default]
    Unmodeled,
    /// The inboard mobilizer of this mobilized body implements the joint.
    Mobod(MobodIndex),
    /// A weld absorbed into a composite that moves as a single mobilized body.
    Composite(LinkCompositeIndex),
}

/// A connection between a parent and a child link.
///
/// Parent and child are kept exactly as given; they define the sign convention of
/// the joint coordinates even when the mobilizer runs the other way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joint {
    pub(crate) index: JointIndex,
    pub(crate) name: String,
    pub(crate) model_instance: ModelInstanceIndex,
    pub(crate) type_index: JointTypeIndex,
    pub(crate) parent: BodyIndex,
    pub(crate) child: BodyIndex,
    pub(crate) flags: JointFlags,
    pub(crate) ephemeral: bool,
    pub(crate) how_modeled: JointModeling,
}

impl Joint {
    pub(crate) fn new(
        index: JointIndex,
        name: &str,
        model_instance: ModelInstanceIndex,
        type_index: JointTypeIndex,
        parent: BodyIndex,
        child: BodyIndex,
        ephemeral: bool,
    ) -> Self {
        Joint {
            index,
            name: name.to_string(),
            model_instance,
            type_index,
            parent,
            child,
            flags: JointFlags::empty(),
            ephemeral,
            how_modeled: JointModeling::Unmodeled,
        }
    }

    pub fn index(&self) -> JointIndex {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_instance(&self) -> ModelInstanceIndex {
        self.model_instance
    }

    pub fn type_index(&self) -> JointTypeIndex {
        self.type_index
    }

    pub fn parent_link(&self) -> BodyIndex {
        self.parent
    }

    pub fn child_link(&self) -> BodyIndex {
        self.child
    }

    pub fn flags(&self) -> JointFlags {
        self.flags
    }

    pub fn must_be_modeled(&self) -> bool {
        self.flags.contains(JointFlags::MUST_BE_MODELED)
    }

    pub fn is_weld(&self) -> bool {
        self.type_index == crate::LinkJointGraph::weld_type_index()
    }

    /// Added while building the forest (a base joint to World).
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn how_modeled(&self) -> JointModeling {
        self.how_modeled
    }

    pub fn connects(&self, link: BodyIndex) -> bool {
        self.parent == link || self.child == link
    }

    /// The link on the other end. `link` must be one of the joint's links.
    pub fn other_link(&self, link: BodyIndex) -> BodyIndex {
        debug_assert!(self.connects(link));
        if self.parent == link {
            self.child
        } else {
            self.parent
        }
    }
}

/// Order-independent key for the pair of links a joint connects, used to detect
/// redundant joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BodiesKey(BodyIndex, BodyIndex);

impl BodiesKey {
    pub(crate) fn new(first: BodyIndex, second: BodyIndex) -> Self {
        if first <= second {
            BodiesKey(first, second)
        } else {
            BodiesKey(second, first)
        }
    }
}
