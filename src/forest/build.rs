//! Choosing the topology: growing trees outward from World, giving floating subgraphs
//! a base body, and cutting the remaining cycles with shadow links.

use super::{ForestState, LoopConstraint, Mobod, SpanningForest, Tree};
use crate::{
    graph::JointModeling, BaseBodyCandidate, BodyIndex, ForestBuildingOptions, JointIndex, JointTypeIndex,
    LinkJointGraph, LoopConstraintIndex, MobodIndex, TreeIndex, WeldedMobodsIndex, WORLD_INDEX, WORLD_MOBOD_INDEX,
};
use itertools::Itertools;
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, trace};
use tracing_attributes::instrument;

impl SpanningForest {
    /// Runs every phase. The graph must have World and no ephemeral elements left
    /// from a previous build.
    pub(crate) fn build(&mut self, graph: &mut LinkJointGraph) {
        self.clear();

        self.choose_forest_topology(graph);
        self.state = ForestState::TopologyChosen;

        let new_to_old = self.create_depth_first_reordering();
        self.fixup_forest_to_use_new_numbering(graph, new_to_old);
        self.state = ForestState::DepthFirstRenumbered;

        self.assign_coordinates(graph);
        self.state = ForestState::Valid;
    }

    /// Builds a forest with the right structure but numbered in construction order.
    #[instrument(skip_all)]
    fn choose_forest_topology(&mut self, graph: &mut LinkJointGraph) {
        self.mobods.push(Mobod::world(WORLD_INDEX));
        self.welded_mobods.push(vec![WORLD_MOBOD_INDEX]);
        self.forest_height = 1;
        graph.set_mobod_for_link(WORLD_INDEX, WORLD_MOBOD_INDEX, None);
        graph.create_world_link_composite();

        self.connect_links_to_world(graph);

        let mut loop_joints = BTreeSet::new();
        let world_joints = graph.link(WORLD_INDEX).joints().iter().copied().sorted().collect_vec();
        self.extend_trees(graph, world_joints, &mut loop_joints);
        self.choose_base_bodies_and_add_trees(graph, &mut loop_joints);

        debug!(loop_joints = loop_joints.len(), "grew trees");
        for joint in loop_joints {
            self.handle_loop_closure(graph, joint);
        }

        self.check_for_terminal_massless_bodies(graph);
    }

    /// Welds static links to World and connects must-be-base links directly to it,
    /// unless the user already joined them to World.
    fn connect_links_to_world(&mut self, graph: &mut LinkJointGraph) {
        for link in (1..graph.num_user_links()).map(BodyIndex) {
            let is_static = graph.link_is_static(graph.link(link));
            if !is_static && !graph.link(link).must_be_base_body() {
                continue;
            }
            if graph.maybe_get_joint_between(WORLD_INDEX, link).is_some() {
                continue;
            }
            let type_index = if is_static {
                LinkJointGraph::weld_type_index()
            } else {
                base_joint_type(graph, link)
            };
            graph.add_ephemeral_joint_to_world(type_index, link);
        }
    }

    /// Breadth-first growth from already modeled links, one level at a time. Within a
    /// level, joints are handled in increasing index order. A joint whose links are
    /// both modeled already closes a loop and is deferred.
    fn extend_trees(
        &mut self,
        graph: &mut LinkJointGraph,
        mut level_joints: Vec<JointIndex>,
        loop_joints: &mut BTreeSet<JointIndex>,
    ) {
        while !level_joints.is_empty() {
            let mut newly_modeled = vec![];
            for j in level_joints {
                let joint = graph.joint(j);
                if joint.how_modeled() != JointModeling::Unmodeled || loop_joints.contains(&j) {
                    continue;
                }
                let (parent, child) = (joint.parent_link(), joint.child_link());
                match (graph.link(parent).mobod(), graph.link(child).mobod()) {
                    (Some(_), Some(_)) => {
                        trace!(joint = %j, "deferred loop joint");
                        loop_joints.insert(j);
                    }
                    (Some(_), None) => {
                        self.model_joint(graph, j, parent, child, false);
                        newly_modeled.push(child);
                    }
                    (None, Some(_)) => {
                        self.model_joint(graph, j, child, parent, true);
                        newly_modeled.push(parent);
                    }
                    (None, None) => unreachable!("Internal error. Joint {j} is not reachable yet!"),
                }
            }

            level_joints = newly_modeled
                .iter()
                .flat_map(|&link| graph.link(link).joints().iter().copied())
                .filter(|&j| graph.joint(j).how_modeled() == JointModeling::Unmodeled)
                .sorted()
                .dedup()
                .collect_vec();
        }
    }

    /// Models `joint` by moving `outboard_link` relative to the modeled `inboard_link`,
    /// either with a new mobilized body or, for a weld in an instance that merges
    /// composites, by having the link follow the inboard body. Welds flagged
    /// [crate::JointFlags::MUST_BE_MODELED] always get a mobilized body.
    fn model_joint(
        &mut self,
        graph: &mut LinkJointGraph,
        joint: JointIndex,
        inboard_link: BodyIndex,
        outboard_link: BodyIndex,
        is_reversed: bool,
    ) {
        let merge = graph.joint(joint).is_weld()
            && !graph.joint(joint).must_be_modeled()
            && graph
                .forest_building_options_in_use(graph.link(outboard_link).model_instance())
                .contains(ForestBuildingOptions::MERGE_LINK_COMPOSITES);
        if merge {
            let mobod = graph
                .link(inboard_link)
                .mobod()
                .expect("Internal error. Inboard link must be modeled!");
            self.mobods[mobod.0].links.push(outboard_link);
            graph.set_mobod_for_link(outboard_link, mobod, Some(joint));
            let composite = graph.add_to_link_composite(inboard_link, outboard_link);
            graph.set_joint_modeling(joint, JointModeling::Composite(composite));
            trace!(%joint, link = %outboard_link, %mobod, "merged into composite");
        } else {
            self.add_new_mobod(graph, joint, inboard_link, outboard_link, is_reversed);
        }
    }

    /// Adds a mobilized body for `outboard_link` whose mobilizer models `joint`. If the
    /// inboard body is World, this starts a new tree.
    fn add_new_mobod(
        &mut self,
        graph: &mut LinkJointGraph,
        joint: JointIndex,
        inboard_link: BodyIndex,
        outboard_link: BodyIndex,
        is_reversed: bool,
    ) -> MobodIndex {
        let index = MobodIndex(self.mobods.len());
        let inboard = graph
            .link(inboard_link)
            .mobod()
            .expect("Internal error. Inboard link must be modeled!");
        let level = self.mobods[inboard.0].level + 1;
        let tree = match self.mobods[inboard.0].tree {
            Some(tree) => tree,
            None => {
                let tree = TreeIndex(self.trees.len());
                self.trees.push(Tree::new(tree, index));
                tree
            }
        };
        let is_weld = graph.joint(joint).is_weld();
        let is_shadow = graph.link(outboard_link).is_shadow();

        let mut mobod = Mobod::new(index, outboard_link, joint, inboard, level, tree);
        mobod.is_reversed = is_reversed;
        mobod.is_weld = is_weld;
        mobod.is_shadow = is_shadow;
        self.mobods.push(mobod);
        self.mobods[inboard.0].outboards.push(index);
        self.forest_height = self.forest_height.max(level + 1);
        let tree = &mut self.trees[tree.0];
        tree.height = tree.height.max(level);

        if is_weld {
            self.join_welded_mobods(inboard, index);
            if !is_shadow {
                graph.add_to_link_composite(inboard_link, outboard_link);
            }
        }
        graph.set_mobod_for_link(outboard_link, index, Some(joint));
        graph.set_joint_modeling(joint, JointModeling::Mobod(index));
        trace!(%joint, link = %outboard_link, mobod = %index, %inboard, is_reversed, "added mobod");
        index
    }

    fn join_welded_mobods(&mut self, inboard: MobodIndex, outboard: MobodIndex) {
        let group = match self.mobods[inboard.0].welded_mobods_group {
            Some(group) => group,
            None => {
                let group = WeldedMobodsIndex(self.welded_mobods.len());
                self.welded_mobods.push(vec![inboard]);
                self.mobods[inboard.0].welded_mobods_group = Some(group);
                group
            }
        };
        self.welded_mobods[group.0].push(outboard);
        self.mobods[outboard.0].welded_mobods_group = Some(group);
    }

    /// Every link still unmodeled belongs to a subgraph with no path to World. Each
    /// such subgraph, taken in order of its lowest link index, gets a base body joined
    /// to World by an ephemeral joint and its tree is grown from there.
    #[instrument(skip_all)]
    fn choose_base_bodies_and_add_trees(&mut self, graph: &mut LinkJointGraph, loop_joints: &mut BTreeSet<JointIndex>) {
        while let Some(start) =
            (1..graph.num_user_links()).map(BodyIndex).find(|&link| graph.link(link).mobod().is_none())
        {
            let policy = graph.base_body_policy();
            let base = policy
                .choose(unmodeled_subgraph(graph, start).into_iter().map(|link| {
                    let link = graph.link(link);
                    BaseBodyCandidate {
                        link: link.index(),
                        must_be_base_body: link.must_be_base_body(),
                        num_joints: link.joints().len(),
                    }
                }))
                .unwrap_or(start);
            let type_index = base_joint_type(graph, base);
            let joint = graph.add_ephemeral_joint_to_world(type_index, base);
            debug!(%base, %joint, ?policy, "chose base body");
            self.extend_trees(graph, vec![joint], loop_joints);
        }
    }

    /// Cuts the loop closed by `joint` by splitting one of its links. The shadow gets a
    /// mobilized body that models the joint, and a loop constraint welds the shadow
    /// back to its primary. Prefers splitting the child, unless the child has mass and
    /// the parent does not; World is never split.
    fn handle_loop_closure(&mut self, graph: &mut LinkJointGraph, joint: JointIndex) {
        let (parent, child) = {
            let joint = graph.joint(joint);
            (joint.parent_link(), joint.child_link())
        };
        let parent_mobod = graph.link(parent).mobod();
        if parent_mobod == graph.link(child).mobod() {
            // Both links were merged into one mobilized body through welds, so they
            // cannot move relative to each other whatever this joint's type.
            let composite = graph
                .link(parent)
                .composite()
                .expect("Internal error. Links sharing a mobod must be in a composite!");
            graph.set_joint_modeling(joint, JointModeling::Composite(composite));
            trace!(%joint, %composite, "loop joint inside a merged composite");
            return;
        }

        let parent_massless = graph.must_treat_as_massless(parent);
        let child_massless = graph.must_treat_as_massless(child);
        if parent_massless && child_massless {
            self.record_no_dynamics(format!(
                "Loop closing joint {} connects the massless links {} and {}.",
                graph.joint(joint).name(),
                graph.link(parent).name(),
                graph.link(child).name()
            ));
        }

        let split_parent = child == WORLD_INDEX || (parent != WORLD_INDEX && parent_massless && !child_massless);
        let (primary, inboard_link) = if split_parent { (parent, child) } else { (child, parent) };
        let shadow = graph.add_shadow_link(primary, joint, split_parent);
        let shadow_mobod = self.add_new_mobod(graph, joint, inboard_link, shadow, split_parent);

        let primary_mobod = graph
            .link(primary)
            .mobod()
            .expect("Internal error. Primary link must be modeled!");
        self.loop_constraints.push(LoopConstraint {
            index: LoopConstraintIndex(self.loop_constraints.len()),
            primary_mobod,
            shadow_mobod,
        });
        graph.add_loop_constraint(primary, shadow);
        debug!(%joint, %primary, %shadow, "closed loop");
    }

    /// A massless body must not end a branch, or dynamics would have to invert a zero
    /// mass matrix. Welded groups count as one body whose mass is that of all its links;
    /// World's group is massful. Shadows are carried by their primaries and are exempt.
    fn check_for_terminal_massless_bodies(&mut self, graph: &LinkJointGraph) {
        let mut messages = vec![];
        for mobod in self.mobods.iter().skip(1) {
            if mobod.is_shadow {
                continue;
            }
            let members = match mobod.welded_mobods_group {
                Some(WeldedMobodsIndex(0)) => continue,
                // Checked once, from the group's innermost body.
                Some(group) if self.welded_mobods[group.0][0] != mobod.index => continue,
                Some(group) => self.welded_mobods[group.0].as_slice(),
                None => std::slice::from_ref(&mobod.index),
            };
            let is_terminal = members
                .iter()
                .flat_map(|m| self.mobods[m.0].outboards.iter())
                .all(|outboard| members.contains(outboard));
            let is_massless = members
                .iter()
                .flat_map(|m| self.mobods[m.0].links.iter())
                .all(|&link| graph.must_treat_as_massless(link));
            if is_terminal && is_massless {
                messages.push(format!(
                    "Link {} is massless and ends a branch without being welded to a massful link.",
                    graph.link(mobod.link()).name()
                ));
            }
        }
        for message in messages {
            self.record_no_dynamics(message);
        }
    }
}

/// Floating or fixed joint for a base body, depending on its instance's options.
fn base_joint_type(graph: &LinkJointGraph, link: BodyIndex) -> JointTypeIndex {
    let options = graph.forest_building_options_in_use(graph.link(link).model_instance());
    if options.contains(ForestBuildingOptions::USE_FIXED_BASE) {
        LinkJointGraph::weld_type_index()
    } else if options.contains(ForestBuildingOptions::USE_RPY_FLOATING_JOINTS) {
        LinkJointGraph::rpy_floating_type_index()
    } else {
        LinkJointGraph::quaternion_floating_type_index()
    }
}

/// Unmodeled links connected to `start`, which must be unmodeled itself.
fn unmodeled_subgraph(graph: &LinkJointGraph, start: BodyIndex) -> Vec<BodyIndex> {
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(link) = queue.pop_front() {
        for &j in graph.link(link).joints() {
            let other = graph.joint(j).other_link(link);
            if graph.link(other).mobod().is_none() && seen.insert(other) {
                queue.push_back(other);
            }
        }
    }
    seen.into_iter().collect()
}
