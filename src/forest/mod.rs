//! The spanning forest of mobilized bodies that models a [crate::LinkJointGraph].
//!
//! The forest is derived data: it is rebuilt from scratch by
//! [crate::LinkJointGraph::build_forest] and never edited incrementally. Once valid, it
//! answers every structural question downstream dynamics code asks by indexing into
//! flat arrays:
//!
//! * mobilized bodies are numbered depth-first, World first, so that a body's inboard
//!   body always has a lower index and every subtree is a contiguous range,
//! * each tree owns a contiguous range of position (q) and velocity (v) coordinates,
//! * welded mobilized bodies are grouped, World's group first.

mod build;
mod coordinates;
pub mod mobod;
mod reorder;
pub mod tree;

pub use mobod::Mobod;
pub use tree::Tree;

use crate::{BodyIndex, LoopConstraintIndex, MobodIndex, TreeIndex, WeldedMobodsIndex, WORLD_MOBOD_INDEX};
use tracing::warn;

/// Progress of a build. Anything but [ForestState::Valid] means the forest must be
/// rebuilt before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForestState {
    #[default]
    Cleared,
    TopologyChosen,
    DepthFirstRenumbered,
    Valid,
}

/// Weld between the mobilized bodies of a primary link and one of its shadows that
/// dynamics must enforce as a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConstraint {
    pub(crate) index: LoopConstraintIndex,
    pub(crate) primary_mobod: MobodIndex,
    pub(crate) shadow_mobod: MobodIndex,
}

impl LoopConstraint {
    pub fn index(&self) -> LoopConstraintIndex {
        self.index
    }

    pub fn primary_mobod(&self) -> MobodIndex {
        self.primary_mobod
    }

    pub fn shadow_mobod(&self) -> MobodIndex {
        self.shadow_mobod
    }
}

/// Mobilized bodies arranged in trees rooted at World, plus the loop constraints that
/// close the cycles the trees had to cut.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanningForest {
    pub(crate) state: ForestState,
    pub(crate) mobods: Vec<Mobod>,
    pub(crate) loop_constraints: Vec<LoopConstraint>,
    pub(crate) trees: Vec<Tree>,
    /// Number of levels including World's
    pub(crate) forest_height: usize,
    pub(crate) welded_mobods: Vec<Vec<MobodIndex>>,
    pub(crate) q_to_mobod: Vec<MobodIndex>,
    pub(crate) v_to_mobod: Vec<MobodIndex>,
    pub(crate) dynamics_ok: bool,
    pub(crate) why_no_dynamics: String,
}

impl Default for SpanningForest {
    fn default() -> Self {
        SpanningForest {
            state: ForestState::Cleared,
            mobods: vec![],
            loop_constraints: vec![],
            trees: vec![],
            forest_height: 0,
            welded_mobods: vec![],
            q_to_mobod: vec![],
            v_to_mobod: vec![],
            dynamics_ok: true,
            why_no_dynamics: String::new(),
        }
    }
}

impl SpanningForest {
    pub(crate) fn clear(&mut self) {
        *self = SpanningForest::default();
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.state == ForestState::Cleared && self.mobods.is_empty()
    }

    /// Records a problem that rules out dynamics without stopping the build.
    pub(crate) fn record_no_dynamics(&mut self, message: String) {
        warn!("{message}");
        if !self.why_no_dynamics.is_empty() {
            self.why_no_dynamics.push('\n');
        }
        self.why_no_dynamics.push_str(&message);
        self.dynamics_ok = false;
    }

    pub fn state(&self) -> ForestState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state == ForestState::Valid
    }

    /// `false` if a loop joins two massless links or a massless body ends a branch.
    /// The forest is still fine for kinematics.
    pub fn dynamics_ok(&self) -> bool {
        self.dynamics_ok
    }

    /// Why [SpanningForest::dynamics_ok] is `false`, one problem per line; empty otherwise.
    pub fn why_no_dynamics(&self) -> &str {
        &self.why_no_dynamics
    }

    /// All mobilized bodies in depth-first order, World first.
    pub fn mobods(&self) -> &[Mobod] {
        &self.mobods
    }

    pub fn mobod(&self, index: MobodIndex) -> &Mobod {
        &self.mobods[index.0]
    }

    pub fn world_mobod(&self) -> &Mobod {
        &self.mobods[WORLD_MOBOD_INDEX.0]
    }

    pub fn num_mobods(&self) -> usize {
        self.mobods.len()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn tree(&self, index: TreeIndex) -> &Tree {
        &self.trees[index.0]
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn loop_constraints(&self) -> &[LoopConstraint] {
        &self.loop_constraints
    }

    /// Number of levels, counting World's as one; the longest path from World has
    /// `height() - 1` mobilizers.
    pub fn height(&self) -> usize {
        self.forest_height
    }

    /// Groups of mobilized bodies that cannot move relative to each other. The first
    /// group holds World and anything welded to it; a mobilized body that is not
    /// welded to any other is in no group.
    pub fn welded_mobods(&self) -> &[Vec<MobodIndex>] {
        &self.welded_mobods
    }

    pub fn welded_mobods_group(&self, index: WeldedMobodsIndex) -> &[MobodIndex] {
        &self.welded_mobods[index.0]
    }

    /// The active link of a mobilized body.
    pub fn mobod_to_link(&self, mobod: MobodIndex) -> BodyIndex {
        self.mobods[mobod.0].link()
    }

    /// All links following a mobilized body, the active link first.
    pub fn mobod_to_links(&self, mobod: MobodIndex) -> &[BodyIndex] {
        self.mobods[mobod.0].follower_links()
    }

    pub fn num_positions(&self) -> usize {
        self.q_to_mobod.len()
    }

    pub fn num_velocities(&self) -> usize {
        self.v_to_mobod.len()
    }

    pub fn q_to_mobod(&self, q: usize) -> MobodIndex {
        self.q_to_mobod[q]
    }

    pub fn v_to_mobod(&self, v: usize) -> MobodIndex {
        self.v_to_mobod[v]
    }

    pub fn q_to_tree(&self, q: usize) -> TreeIndex {
        self.tree_of(self.q_to_mobod[q])
    }

    pub fn v_to_tree(&self, v: usize) -> TreeIndex {
        self.tree_of(self.v_to_mobod[v])
    }

    fn tree_of(&self, mobod: MobodIndex) -> TreeIndex {
        self.mobods[mobod.0]
            .tree
            .expect("Internal error. Only World has no tree and it has no coordinates!")
    }

    /// Mobilized bodies from World to `mobod`, both included.
    pub fn find_path_from_world(&self, mobod: MobodIndex) -> Vec<MobodIndex> {
        let mut path = Vec::with_capacity(self.mobods[mobod.0].level + 1);
        let mut current = Some(mobod);
        while let Some(index) = current {
            path.push(index);
            current = self.mobods[index.0].inboard;
        }
        path.reverse();
        path
    }

    /// The outermost mobilized body that is inboard of (or equal to) both. World if
    /// they are in different trees.
    pub fn find_first_common_ancestor(&self, mut a: MobodIndex, mut b: MobodIndex) -> MobodIndex {
        let level = |m: MobodIndex| self.mobods[m.0].level;
        let inboard = |m: MobodIndex| self.mobods[m.0].inboard.unwrap_or(WORLD_MOBOD_INDEX);
        while level(a) > level(b) {
            a = inboard(a);
        }
        while level(b) > level(a) {
            b = inboard(b);
        }
        while a != b {
            a = inboard(a);
            b = inboard(b);
        }
        a
    }

    /// `mobod` and everything outboard of it, in depth-first order.
    pub fn find_subtree_mobods(&self, mobod: MobodIndex) -> Vec<MobodIndex> {
        let num = self.mobods[mobod.0].num_subtree_mobods;
        (mobod.0..mobod.0 + num).map(MobodIndex).collect()
    }

    pub fn mobods_are_welded(&self, a: MobodIndex, b: MobodIndex) -> bool {
        if a == b {
            return true;
        }
        match (self.mobods[a.0].welded_mobods_group, self.mobods[b.0].welded_mobods_group) {
            (Some(group_a), Some(group_b)) => group_a == group_b,
            _ => false,
        }
    }
}
