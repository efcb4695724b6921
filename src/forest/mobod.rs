use crate::{arena::Nodelike, BodyIndex, JointIndex, MobodIndex, TreeIndex, WeldedMobodsIndex};

/// A mobilized body: a node of the [super::SpanningForest].
///
/// It follows one or more links (several when a composite of welded links was
/// merged) and is connected to its inboard body by a mobilizer that models one joint.
/// The mobilizer runs from inboard to outboard, which is the opposite of the joint's
/// parent to child direction when [Mobod::is_reversed] is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mobod {
    pub(crate) index: MobodIndex,
    /// The active link first.
    pub(crate) links: Vec<BodyIndex>,
    pub(crate) joint: Option<JointIndex>,
    pub(crate) inboard: Option<MobodIndex>,
    pub(crate) outboards: Vec<MobodIndex>,
    pub(crate) level: usize,
    pub(crate) tree: Option<TreeIndex>,
    pub(crate) welded_mobods_group: Option<WeldedMobodsIndex>,
    pub(crate) is_reversed: bool,
    pub(crate) is_weld: bool,
    pub(crate) is_shadow: bool,

    pub(crate) q_start: usize,
    pub(crate) nq: usize,
    pub(crate) v_start: usize,
    pub(crate) nv: usize,
    pub(crate) has_quaternion: bool,

    pub(crate) num_subtree_mobods: usize,
    pub(crate) nq_outboard: usize,
    pub(crate) nv_outboard: usize,
}

impl Mobod {
    pub(crate) fn world(link: BodyIndex) -> Self {
        Mobod {
            index: crate::WORLD_MOBOD_INDEX,
            links: vec![link],
            joint: None,
            inboard: None,
            outboards: vec![],
            level: 0,
            tree: None,
            welded_mobods_group: Some(WeldedMobodsIndex(0)),
            is_reversed: false,
            is_weld: false,
            is_shadow: false,
            q_start: 0,
            nq: 0,
            v_start: 0,
            nv: 0,
            has_quaternion: false,
            num_subtree_mobods: 1,
            nq_outboard: 0,
            nv_outboard: 0,
        }
    }

    pub(crate) fn new(
        index: MobodIndex,
        link: BodyIndex,
        joint: JointIndex,
        inboard: MobodIndex,
        level: usize,
        tree: TreeIndex,
    ) -> Self {
        Mobod {
            index,
            links: vec![link],
            joint: Some(joint),
            inboard: Some(inboard),
            level,
            tree: Some(tree),
            welded_mobods_group: None,
            ..Mobod::world(link)
        }
    }

    pub fn index(&self) -> MobodIndex {
        self.index
    }

    pub fn is_world(&self) -> bool {
        self.level == 0
    }

    /// The link whose frame moves with this body.
    pub fn link(&self) -> BodyIndex {
        self.links[0]
    }

    /// All links following this body, the active link first.
    pub fn follower_links(&self) -> &[BodyIndex] {
        &self.links
    }

    /// The joint its inboard mobilizer models; `None` only for World.
    pub fn joint(&self) -> Option<JointIndex> {
        self.joint
    }

    /// `None` only for World.
    pub fn inboard(&self) -> Option<MobodIndex> {
        self.inboard
    }

    pub fn outboards(&self) -> &[MobodIndex] {
        &self.outboards
    }

    /// Zero for World, one for base bodies.
    pub fn level(&self) -> usize {
        self.level
    }

    /// `None` only for World.
    pub fn tree(&self) -> Option<TreeIndex> {
        self.tree
    }

    pub fn welded_mobods_group(&self) -> Option<WeldedMobodsIndex> {
        self.welded_mobods_group
    }

    pub fn is_base_body(&self) -> bool {
        self.level == 1
    }

    /// The mobilizer moves the joint's parent link relative to its child link.
    pub fn is_reversed(&self) -> bool {
        self.is_reversed
    }

    pub fn is_weld(&self) -> bool {
        self.is_weld
    }

    /// Follows a shadow link split off to break a loop.
    pub fn is_shadow(&self) -> bool {
        self.is_shadow
    }

    pub fn is_leaf(&self) -> bool {
        self.outboards.is_empty()
    }

    pub fn q_start(&self) -> usize {
        self.q_start
    }

    pub fn nq(&self) -> usize {
        self.nq
    }

    pub fn v_start(&self) -> usize {
        self.v_start
    }

    pub fn nv(&self) -> usize {
        self.nv
    }

    pub fn has_quaternion(&self) -> bool {
        self.has_quaternion
    }

    /// Number of mobilized bodies in the subtree rooted here, including this one.
    /// They are numbered consecutively starting at [Mobod::index].
    pub fn num_subtree_mobods(&self) -> usize {
        self.num_subtree_mobods
    }

    /// Positions of all mobilizers outboard of this one, excluding its own.
    pub fn nq_outboard(&self) -> usize {
        self.nq_outboard
    }

    pub fn nv_outboard(&self) -> usize {
        self.nv_outboard
    }
}

impl Nodelike for Mobod {
    type Index = MobodIndex;

    fn index(&self) -> MobodIndex {
        self.index
    }

    fn children(&self) -> &[MobodIndex] {
        &self.outboards
    }

    fn depth(&self) -> usize {
        self.level
    }
}
