//! The user-editable model: links (rigid bodies) interconnected by joints.
//!
//! A [LinkJointGraph] is a directed, possibly cyclic graph whose nodes are [Link]s and
//! whose edges are [Joint]s. It owns the [SpanningForest] built from it and, while that
//! forest is valid, the "as built" annotations and the ephemeral elements (shadow
//! links, base joints to World, loop constraints) the forest needed.
//!
//! Ephemeral links and joints are always stored after the user's, so stripping them is
//! a truncation. Removed joints leave an empty slot behind so that every other index
//! stays stable.

pub mod joint;
pub mod link;
pub mod loop_constraint;
mod welded;

pub use joint::{Joint, JointModeling, JointTraits};
pub use link::Link;
pub use loop_constraint::LoopConstraint;

use crate::{
    errors::{Result, TopologyError},
    BaseBodyPolicy, BodyIndex, ForestBuildingOptions, JointFlags, JointIndex, JointTypeIndex, LinkCompositeIndex,
    LinkFlags, LoopConstraintIndex, MobodIndex, ModelInstanceIndex, SpanningForest, WORLD_INDEX, WORLD_MODEL_INSTANCE,
};
use joint::BodiesKey;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};
use tracing_attributes::instrument;

/// Graph of links and joints plus the spanning forest that models it.
///
/// Cloning deep-copies the forest along with the graph; the forest keeps no reference
/// back to its graph so the copy is immediately usable.
#[derive(Debug, Clone)]
pub struct LinkJointGraph {
    joint_traits: Vec<JointTraits>,
    joint_type_name_to_index: HashMap<String, JointTypeIndex>,

    /// World first, then user links, then ephemeral (shadow) links
    pub(crate) links: Vec<Link>,
    /// User slots first (`None` once removed), then ephemeral joints
    pub(crate) joints: Vec<Option<Joint>>,
    num_user_links: usize,
    num_user_joints: usize,
    /// Present joints, user and ephemeral
    num_joints: usize,

    pub(crate) loop_constraints: Vec<LoopConstraint>,
    /// Composite 0 is World and whatever is welded to it.
    pub(crate) link_composites: Vec<Vec<BodyIndex>>,

    // Names are unique per model instance; ephemeral elements are not listed here.
    link_names: HashMap<ModelInstanceIndex, HashMap<String, BodyIndex>>,
    joint_names: HashMap<ModelInstanceIndex, HashMap<String, JointIndex>>,
    bodies_to_joint: HashMap<BodiesKey, JointIndex>,

    global_options: ForestBuildingOptions,
    model_instance_options: BTreeMap<ModelInstanceIndex, ForestBuildingOptions>,
    base_body_policy: BaseBodyPolicy,

    forest: SpanningForest,
}

impl Default for LinkJointGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkJointGraph {
    /// An empty graph with the joint types the forest builder relies on. The first
    /// link added defines World.
    pub fn new() -> Self {
        let mut graph = LinkJointGraph {
            joint_traits: vec![],
            joint_type_name_to_index: HashMap::new(),
            links: vec![],
            joints: vec![],
            num_user_links: 0,
            num_user_joints: 0,
            num_joints: 0,
            loop_constraints: vec![],
            link_composites: vec![],
            link_names: HashMap::new(),
            joint_names: HashMap::new(),
            bodies_to_joint: HashMap::new(),
            global_options: ForestBuildingOptions::default(),
            model_instance_options: BTreeMap::new(),
            base_body_policy: BaseBodyPolicy::default(),
            forest: SpanningForest::default(),
        };
        for (name, nq, nv, has_quaternion) in [
            (Self::weld_type_name(), 0, 0, false),
            ("quaternion_floating", 7, 6, true),
            ("rpy_floating", 6, 6, false),
        ] {
            graph.push_joint_traits(JointTraits::new(name, nq, nv, has_quaternion));
        }
        graph
    }

    /// Restores the state of [LinkJointGraph::new]: no links or joints, only the
    /// predefined joint types and default options. The forest is left cleared.
    pub fn clear(&mut self) {
        *self = Self::new();
        debug!("cleared graph");
    }

    /// Index of the "weld" joint type, registered at construction.
    pub fn weld_type_index() -> JointTypeIndex {
        JointTypeIndex(0)
    }

    /// The reserved name of the weld type (SDF calls it "fixed").
    pub fn weld_type_name() -> &'static str {
        "weld"
    }

    pub fn quaternion_floating_type_index() -> JointTypeIndex {
        JointTypeIndex(1)
    }

    pub fn rpy_floating_type_index() -> JointTypeIndex {
        JointTypeIndex(2)
    }

    fn push_joint_traits(&mut self, traits: JointTraits) -> JointTypeIndex {
        let index = JointTypeIndex(self.joint_traits.len());
        self.joint_type_name_to_index.insert(traits.name.clone(), index);
        self.joint_traits.push(traits);
        index
    }

    /// Registers a joint type by name together with its coordinate counts.
    ///
    /// Fails if the name is taken (including the predefined "weld", "quaternion_floating"
    /// and "rpy_floating") or if the counts are impossible: at most 7 positions, at most
    /// 6 velocities, no more velocities than positions, and at least 4 positions for a
    /// quaternion.
    pub fn register_joint_type(
        &mut self,
        name: &str,
        nq: usize,
        nv: usize,
        has_quaternion: bool,
    ) -> Result<JointTypeIndex> {
        if self.is_joint_type_registered(name) {
            return Err(TopologyError::DuplicateJointType(name.to_string()));
        }
        let traits = JointTraits::new(name, nq, nv, has_quaternion);
        if !traits.is_valid() {
            return Err(TopologyError::InvalidJointTraits {
                name: name.to_string(),
                nq,
                nv,
                has_quaternion,
            });
        }
        Ok(self.push_joint_traits(traits))
    }

    pub fn is_joint_type_registered(&self, name: &str) -> bool {
        self.joint_type_name_to_index.contains_key(name)
    }

    pub fn joint_type_index(&self, name: &str) -> Option<JointTypeIndex> {
        self.joint_type_name_to_index.get(name).copied()
    }

    pub fn num_joint_types(&self) -> usize {
        self.joint_traits.len()
    }

    pub fn joint_traits(&self) -> &[JointTraits] {
        &self.joint_traits
    }

    /// Panics if `index` was not handed out by this graph.
    pub fn joint_type(&self, index: JointTypeIndex) -> &JointTraits {
        &self.joint_traits[index.0]
    }

    /// Adds a rigid body with no special flags. See [LinkJointGraph::add_link].
    pub fn add_rigid_body(&mut self, name: &str, model_instance: ModelInstanceIndex) -> Result<BodyIndex> {
        self.add_link(name, model_instance, LinkFlags::empty())
    }

    /// Adds a link and invalidates the forest.
    ///
    /// The very first call defines World whatever its name, and must use
    /// [WORLD_MODEL_INSTANCE]; no later link may use that instance. Names must be unique
    /// within a model instance. [LinkFlags::SHADOW] is reserved for the forest builder.
    pub fn add_link(&mut self, name: &str, model_instance: ModelInstanceIndex, flags: LinkFlags) -> Result<BodyIndex> {
        if flags.contains(LinkFlags::SHADOW) {
            return Err(TopologyError::InternalFlag(name.to_string()));
        }
        if self.links.is_empty() {
            if model_instance != WORLD_MODEL_INSTANCE {
                return Err(TopologyError::WorldInWrongModelInstance(model_instance));
            }
        } else if model_instance == WORLD_MODEL_INSTANCE {
            return Err(TopologyError::WorldModelInstanceReserved(name.to_string()));
        }
        if self.has_link_named(name, model_instance) {
            return Err(TopologyError::DuplicateLinkName {
                name: name.to_string(),
                model_instance,
            });
        }

        self.invalidate_forest();
        let index = BodyIndex(self.links.len());
        debug_assert_eq!(index.0, self.num_user_links);
        self.links.push(Link::new(index, name, model_instance, flags));
        self.num_user_links += 1;
        self.link_names
            .entry(model_instance)
            .or_default()
            .insert(name.to_string(), index);
        trace!(%index, name, "added link");
        Ok(index)
    }

    /// Adds a joint with no special flags. See [LinkJointGraph::add_joint_with_flags].
    pub fn add_joint(
        &mut self,
        name: &str,
        model_instance: ModelInstanceIndex,
        type_name: &str,
        parent: BodyIndex,
        child: BodyIndex,
    ) -> Result<JointIndex> {
        self.add_joint_with_flags(name, model_instance, type_name, parent, child, JointFlags::empty())
    }

    /// Adds a joint from `parent` to `child` and invalidates the forest.
    ///
    /// Fails if the name is taken within `model_instance`, the type is unknown, either
    /// link index is not a user link, both links are the same, the two links are
    /// already connected by a joint (in either direction), or a static link would be
    /// connected to World by anything but a weld.
    pub fn add_joint_with_flags(
        &mut self,
        name: &str,
        model_instance: ModelInstanceIndex,
        type_name: &str,
        parent: BodyIndex,
        child: BodyIndex,
        flags: JointFlags,
    ) -> Result<JointIndex> {
        if self.links.is_empty() {
            return Err(TopologyError::WorldNotDefined);
        }
        if self.has_joint_named(name, model_instance) {
            return Err(TopologyError::DuplicateJointName {
                name: name.to_string(),
                model_instance,
            });
        }
        let type_index = self
            .joint_type_index(type_name)
            .ok_or_else(|| TopologyError::UnknownJointType(type_name.to_string()))?;
        for link in [parent, child] {
            if link.0 >= self.num_user_links {
                return Err(TopologyError::InvalidLinkIndex(link));
            }
        }
        if parent == child {
            return Err(TopologyError::SelfJoint(name.to_string(), parent));
        }
        let key = BodiesKey::new(parent, child);
        if let Some(&existing) = self.bodies_to_joint.get(&key) {
            return Err(TopologyError::RedundantJoint {
                name: name.to_string(),
                existing,
                first: parent,
                second: child,
            });
        }
        self.check_static_link_is_welded(name, type_index, parent, child)?;

        self.invalidate_forest();
        let index = JointIndex(self.joints.len());
        debug_assert_eq!(index.0, self.num_user_joints);
        let mut joint = Joint::new(index, name, model_instance, type_index, parent, child, false);
        joint.flags = flags;
        self.joints.push(Some(joint));
        self.num_user_joints += 1;
        self.num_joints += 1;
        self.links[parent.0].add_joint_as_parent(index);
        self.links[child.0].add_joint_as_child(index);
        self.joint_names
            .entry(model_instance)
            .or_default()
            .insert(name.to_string(), index);
        self.bodies_to_joint.insert(key, index);
        trace!(%index, name, type_name, %parent, %child, "added joint");
        Ok(index)
    }

    fn check_static_link_is_welded(
        &self,
        joint_name: &str,
        type_index: JointTypeIndex,
        parent: BodyIndex,
        child: BodyIndex,
    ) -> Result<()> {
        if type_index == Self::weld_type_index() {
            return Ok(());
        }
        let other = match (parent, child) {
            (WORLD_INDEX, other) | (other, WORLD_INDEX) => other,
            _ => return Ok(()),
        };
        let link = &self.links[other.0];
        if self.link_is_static(link) {
            return Err(TopologyError::StaticLinkNotWelded {
                link: link.name.clone(),
                joint: joint_name.to_string(),
                joint_type: self.joint_type(type_index).name.clone(),
            });
        }
        Ok(())
    }

    /// Fails if `link` would be static with `flags` under `options` while a user joint
    /// other than a weld connects it to World.
    fn check_world_joint_stays_welded(
        &self,
        link: &Link,
        flags: LinkFlags,
        options: ForestBuildingOptions,
    ) -> Result<()> {
        if link.is_world() || !(flags.contains(LinkFlags::STATIC) || options.contains(ForestBuildingOptions::STATIC)) {
            return Ok(());
        }
        let Some(&index) = self.bodies_to_joint.get(&BodiesKey::new(WORLD_INDEX, link.index)) else {
            return Ok(());
        };
        let joint = self.joint(index);
        if joint.is_weld() {
            return Ok(());
        }
        Err(TopologyError::StaticLinkNotWelded {
            link: link.name.clone(),
            joint: joint.name.clone(),
            joint_type: self.joint_type(joint.type_index).name.clone(),
        })
    }

    /// User links, World excluded.
    fn user_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().take(self.num_user_links).skip(1)
    }

    /// Removes a user joint, leaving its slot empty so other indices stay valid, and
    /// invalidates the forest.
    pub fn remove_joint(&mut self, index: JointIndex) -> Result<()> {
        if index.0 >= self.num_user_joints {
            return match self.joints.get(index.0) {
                Some(Some(_)) => Err(TopologyError::EphemeralJoint(index)),
                _ => Err(TopologyError::InvalidJointIndex(index)),
            };
        }
        if self.joints[index.0].is_none() {
            return Err(TopologyError::InvalidJointIndex(index));
        }

        self.invalidate_forest();
        let joint = self.joints[index.0]
            .take()
            .expect("Internal error. Joint slot was checked above!");
        self.num_joints -= 1;
        self.links[joint.parent.0].remove_joint(index);
        self.links[joint.child.0].remove_joint(index);
        if let Some(names) = self.joint_names.get_mut(&joint.model_instance) {
            names.remove(&joint.name);
        }
        self.bodies_to_joint.remove(&BodiesKey::new(joint.parent, joint.child));
        trace!(%index, name = joint.name, "removed joint");
        Ok(())
    }

    /// Replaces the flags of a user link and invalidates the forest.
    ///
    /// Making a link static fails if a joint other than a weld connects it to World.
    pub fn change_link_flags(&mut self, link: BodyIndex, flags: LinkFlags) -> Result<()> {
        if link.0 >= self.num_user_links {
            return Err(TopologyError::InvalidLinkIndex(link));
        }
        let existing = &self.links[link.0];
        if flags.contains(LinkFlags::SHADOW) {
            return Err(TopologyError::InternalFlag(existing.name.clone()));
        }
        self.check_world_joint_stays_welded(
            existing,
            flags,
            self.forest_building_options_in_use(existing.model_instance),
        )?;
        self.invalidate_forest();
        self.links[link.0].flags = flags;
        Ok(())
    }

    /// Changes the type of an existing user joint and invalidates the forest.
    pub fn change_joint_type(&mut self, index: JointIndex, type_name: &str) -> Result<()> {
        let joint = self.user_joint(index)?;
        let type_index = self
            .joint_type_index(type_name)
            .ok_or_else(|| TopologyError::UnknownJointType(type_name.to_string()))?;
        self.check_static_link_is_welded(&joint.name, type_index, joint.parent, joint.child)?;

        self.invalidate_forest();
        if let Some(joint) = self.joints[index.0].as_mut() {
            joint.type_index = type_index;
        }
        Ok(())
    }

    /// Replaces the flags of an existing user joint and invalidates the forest.
    pub fn change_joint_flags(&mut self, index: JointIndex, flags: JointFlags) -> Result<()> {
        self.user_joint(index)?;
        self.invalidate_forest();
        if let Some(joint) = self.joints[index.0].as_mut() {
            joint.flags = flags;
        }
        Ok(())
    }

    fn user_joint(&self, index: JointIndex) -> Result<&Joint> {
        if index.0 >= self.num_user_joints {
            return match self.joints.get(index.0) {
                Some(Some(_)) => Err(TopologyError::EphemeralJoint(index)),
                _ => Err(TopologyError::InvalidJointIndex(index)),
            };
        }
        self.joints[index.0]
            .as_ref()
            .ok_or(TopologyError::InvalidJointIndex(index))
    }

    /// World's link, or an error if nothing has been registered yet.
    pub fn world_link(&self) -> Result<&Link> {
        self.links.first().ok_or(TopologyError::WorldNotDefined)
    }

    /// The name given to World by the first registration.
    pub fn world_body_name(&self) -> Result<&str> {
        self.world_link().map(Link::name)
    }

    /// All links, World first. Shadow links follow the user links while the forest is valid.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Panics if `index` is out of range; use [LinkJointGraph::get_link] to check.
    pub fn link(&self, index: BodyIndex) -> &Link {
        &self.links[index.0]
    }

    pub fn get_link(&self, index: BodyIndex) -> Result<&Link> {
        self.links.get(index.0).ok_or(TopologyError::InvalidLinkIndex(index))
    }

    /// Number of links including World and any shadow links.
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Links with this index or higher are ephemeral.
    pub fn num_user_links(&self) -> usize {
        self.num_user_links
    }

    /// Iterates over present joints (user and ephemeral), skipping removed slots.
    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter().flatten()
    }

    /// Panics if there is no joint at `index`; use [LinkJointGraph::get_joint] to check.
    pub fn joint(&self, index: JointIndex) -> &Joint {
        self.joints[index.0]
            .as_ref()
            .expect("Internal error. Joint has been removed!")
    }

    pub fn get_joint(&self, index: JointIndex) -> Result<&Joint> {
        self.joints
            .get(index.0)
            .and_then(Option::as_ref)
            .ok_or(TopologyError::InvalidJointIndex(index))
    }

    pub fn has_joint(&self, index: JointIndex) -> bool {
        matches!(self.joints.get(index.0), Some(Some(_)))
    }

    /// Number of present joints, user and ephemeral.
    pub fn num_joints(&self) -> usize {
        self.num_joints
    }

    /// Joint slots with this index or higher are ephemeral.
    pub fn num_user_joints(&self) -> usize {
        self.num_user_joints
    }

    pub fn has_link_named(&self, name: &str, model_instance: ModelInstanceIndex) -> bool {
        self.link_names
            .get(&model_instance)
            .is_some_and(|names| names.contains_key(name))
    }

    pub fn has_joint_named(&self, name: &str, model_instance: ModelInstanceIndex) -> bool {
        self.joint_names
            .get(&model_instance)
            .is_some_and(|names| names.contains_key(name))
    }

    pub fn link_by_name(&self, name: &str, model_instance: ModelInstanceIndex) -> Option<BodyIndex> {
        self.link_names.get(&model_instance)?.get(name).copied()
    }

    pub fn joint_by_name(&self, name: &str, model_instance: ModelInstanceIndex) -> Option<JointIndex> {
        self.joint_names.get(&model_instance)?.get(name).copied()
    }

    /// Returns the joint connecting the two links, in either direction. Cost is linear
    /// in the number of joints of the less connected link.
    pub fn maybe_get_joint_between(&self, first: BodyIndex, second: BodyIndex) -> Option<JointIndex> {
        let (first, second) = (self.links.get(first.0)?, self.links.get(second.0)?);
        let (fewer, other) = if first.joints.len() <= second.joints.len() {
            (first, second)
        } else {
            (second, first)
        };
        let key = BodiesKey::new(fewer.index, other.index);
        fewer.joints.iter().copied().find(|&j| {
            let joint = self.joint(j);
            BodiesKey::new(joint.parent, joint.child) == key
        })
    }

    /// Ephemeral loop-closing welds; empty without a valid forest.
    pub fn loop_constraints(&self) -> &[LoopConstraint] {
        &self.loop_constraints
    }

    pub fn loop_constraint(&self, index: LoopConstraintIndex) -> &LoopConstraint {
        &self.loop_constraints[index.0]
    }

    /// Groups of links welded together, discovered while building the forest. The
    /// first group always starts with World; the others exist only for two or more
    /// links and start with the link whose mobilizer moves the group. Empty without a
    /// valid forest.
    pub fn link_composites(&self) -> &[Vec<BodyIndex>] {
        &self.link_composites
    }

    /// The mobilized body the link follows, `None` without a valid forest.
    pub fn link_to_mobod(&self, link: BodyIndex) -> Option<MobodIndex> {
        self.links.get(link.0)?.mobod
    }

    /// A link is massless if flagged so, unless it is welded into a composite that
    /// contains a massful link. World is never massless.
    ///
    /// Panics if `link` is out of range, as [LinkJointGraph::link] does.
    pub fn must_treat_as_massless(&self, link: BodyIndex) -> bool {
        let link = &self.links[link.0];
        match link.composite {
            Some(composite) => self.link_composites[composite.0]
                .iter()
                .all(|&l| !self.links[l.0].is_world() && self.links[l.0].treat_as_massless()),
            None => !link.is_world() && link.treat_as_massless(),
        }
    }

    /// A link is static if flagged so or if its model instance is.
    pub fn link_is_static(&self, link: &Link) -> bool {
        !link.is_world()
            && (link.flags.contains(LinkFlags::STATIC)
                || self
                    .forest_building_options_in_use(link.model_instance)
                    .contains(ForestBuildingOptions::STATIC))
    }

    // Forest building options

    /// Options for model instances that have none of their own. Invalidates the forest.
    ///
    /// Fails, changing nothing, if [ForestBuildingOptions::STATIC] would make a link
    /// static that is joined to World by anything but a weld.
    pub fn set_global_forest_building_options(&mut self, options: ForestBuildingOptions) -> Result<()> {
        for link in self
            .user_links()
            .filter(|link| !self.model_instance_options.contains_key(&link.model_instance))
        {
            self.check_world_joint_stays_welded(link, link.flags, options)?;
        }
        self.invalidate_forest();
        self.global_options = options;
        Ok(())
    }

    pub fn global_forest_building_options(&self) -> ForestBuildingOptions {
        self.global_options
    }

    /// Options for one model instance, replacing (not blending with) the global ones.
    /// The instance need not have any elements yet. Invalidates the forest.
    ///
    /// Fails like [LinkJointGraph::set_global_forest_building_options], for the links
    /// of this instance.
    pub fn set_forest_building_options(
        &mut self,
        model_instance: ModelInstanceIndex,
        options: ForestBuildingOptions,
    ) -> Result<()> {
        for link in self.user_links().filter(|link| link.model_instance == model_instance) {
            self.check_world_joint_stays_welded(link, link.flags, options)?;
        }
        self.invalidate_forest();
        self.model_instance_options.insert(model_instance, options);
        Ok(())
    }

    pub fn forest_building_options_in_use(&self, model_instance: ModelInstanceIndex) -> ForestBuildingOptions {
        self.model_instance_options
            .get(&model_instance)
            .copied()
            .unwrap_or(self.global_options)
    }

    /// Back to default global options and no per-instance options. Invalidates the forest.
    pub fn reset_forest_building_options(&mut self) {
        self.invalidate_forest();
        self.global_options = ForestBuildingOptions::default();
        self.model_instance_options.clear();
    }

    /// Invalidates the forest.
    pub fn set_base_body_policy(&mut self, policy: BaseBodyPolicy) {
        self.invalidate_forest();
        self.base_body_policy = policy;
    }

    pub fn base_body_policy(&self) -> BaseBodyPolicy {
        self.base_body_policy
    }

    // Forest

    /// Builds the spanning forest from scratch, whether or not the current one is valid.
    ///
    /// Returns whether the forest can be used for dynamics. If not, the forest is still
    /// valid for kinematics and [SpanningForest::why_no_dynamics] explains the problem.
    /// Fails only if World has not been defined.
    #[instrument(skip_all)]
    pub fn build_forest(&mut self) -> Result<bool> {
        if self.links.is_empty() {
            return Err(TopologyError::WorldNotDefined);
        }
        self.invalidate_forest();
        let mut forest = std::mem::take(&mut self.forest);
        forest.build(self);
        self.forest = forest;
        debug!(
            mobods = self.forest.num_mobods(),
            trees = self.forest.num_trees(),
            dynamics_ok = self.forest.dynamics_ok(),
            "built forest"
        );
        Ok(self.forest.dynamics_ok())
    }

    /// Rebuilds the forest only if it is out of date.
    pub fn ensure_forest(&mut self) -> Result<&SpanningForest> {
        if !self.forest_is_valid() {
            self.build_forest()?;
        }
        Ok(&self.forest)
    }

    /// Clears the forest and strips everything the last build added to the graph.
    /// Every mutation of the graph or of the options calls this.
    pub fn invalidate_forest(&mut self) {
        if self.forest.is_cleared() {
            return;
        }
        for index in self.num_user_joints..self.joints.len() {
            if self.joints[index].is_some() {
                self.num_joints -= 1;
            }
        }
        self.joints.truncate(self.num_user_joints);
        self.links.truncate(self.num_user_links);
        let num_user_joints = self.num_user_joints;
        self.links.iter_mut().for_each(|link| link.clear_model(num_user_joints));
        self.joints
            .iter_mut()
            .flatten()
            .for_each(|joint| joint.how_modeled = JointModeling::Unmodeled);
        self.loop_constraints.clear();
        self.link_composites.clear();
        self.forest.clear();
    }

    pub fn forest_is_valid(&self) -> bool {
        self.forest.is_valid()
    }

    /// The forest, whether or not it is up to date; check [LinkJointGraph::forest_is_valid]
    /// or use [LinkJointGraph::ensure_forest].
    pub fn forest(&self) -> &SpanningForest {
        &self.forest
    }

    // As-built bookkeeping, used by the forest builder only.

    pub(crate) fn set_mobod_for_link(&mut self, link: BodyIndex, mobod: MobodIndex, joint: Option<JointIndex>) {
        let link = &mut self.links[link.0];
        debug_assert!(link.mobod.is_none());
        link.mobod = Some(mobod);
        link.inboard_joint = joint;
    }

    pub(crate) fn set_joint_modeling(&mut self, joint: JointIndex, how_modeled: JointModeling) {
        if let Some(joint) = self.joints[joint.0].as_mut() {
            debug_assert_eq!(joint.how_modeled, JointModeling::Unmodeled);
            joint.how_modeled = how_modeled;
        }
    }

    pub(crate) fn create_world_link_composite(&mut self) {
        debug_assert!(self.link_composites.is_empty());
        self.link_composites.push(vec![WORLD_INDEX]);
        self.links[WORLD_INDEX.0].composite = Some(LinkCompositeIndex(0));
    }

    /// Adds `new_link` to the composite of `existing`, creating one with `existing` as
    /// its active link if needed.
    pub(crate) fn add_to_link_composite(&mut self, existing: BodyIndex, new_link: BodyIndex) -> LinkCompositeIndex {
        let composite = match self.links[existing.0].composite {
            Some(composite) => composite,
            None => {
                let composite = LinkCompositeIndex(self.link_composites.len());
                self.link_composites.push(vec![existing]);
                self.links[existing.0].composite = Some(composite);
                composite
            }
        };
        self.link_composites[composite.0].push(new_link);
        self.links[new_link.0].composite = Some(composite);
        composite
    }

    /// Adds an ephemeral joint from World to `child` for a base body.
    pub(crate) fn add_ephemeral_joint_to_world(&mut self, type_index: JointTypeIndex, child: BodyIndex) -> JointIndex {
        let index = JointIndex(self.joints.len());
        let link = &self.links[child.0];
        let name = format!("$world_{}", link.name);
        let joint = Joint::new(index, &name, link.model_instance, type_index, WORLD_INDEX, child, true);
        self.joints.push(Some(joint));
        self.num_joints += 1;
        self.links[WORLD_INDEX.0].add_joint_as_parent(index);
        self.links[child.0].add_joint_as_child(index);
        trace!(%index, name, "added base joint");
        index
    }

    /// Adds a shadow of `primary` that takes the primary's place on `shadow_joint`.
    /// The joint itself keeps its original parent and child.
    pub(crate) fn add_shadow_link(
        &mut self,
        primary: BodyIndex,
        shadow_joint: JointIndex,
        shadow_is_parent: bool,
    ) -> BodyIndex {
        let index = BodyIndex(self.links.len());
        let primary_link = &self.links[primary.0];
        let name = format!("{}${}", primary_link.name, primary_link.shadow_links.len() + 1);
        let flags = LinkFlags::SHADOW | (primary_link.flags & LinkFlags::TREAT_AS_MASSLESS);
        let mut shadow = Link::new(index, &name, primary_link.model_instance, flags);
        shadow.primary_link = Some(primary);
        if shadow_is_parent {
            shadow.add_joint_as_parent(shadow_joint);
        } else {
            shadow.add_joint_as_child(shadow_joint);
        }
        self.links.push(shadow);
        self.links[primary.0].shadow_links.push(index);
        trace!(%index, name, %primary, "added shadow link");
        index
    }

    pub(crate) fn add_loop_constraint(&mut self, primary: BodyIndex, shadow: BodyIndex) -> LoopConstraintIndex {
        let index = LoopConstraintIndex(self.loop_constraints.len());
        let shadow_link = &self.links[shadow.0];
        self.loop_constraints.push(LoopConstraint {
            index,
            name: format!("$loop_{}", shadow_link.name),
            model_instance: shadow_link.model_instance,
            primary_link: primary,
            shadow_link: shadow,
        });
        self.links[primary.0].loop_constraints.push(index);
        self.links[shadow.0].loop_constraints.push(index);
        index
    }

    /// Rewrites every stored mobilized body index; `old_to_new` must be a permutation.
    pub(crate) fn renumber_mobod_indexes(&mut self, old_to_new: &[MobodIndex]) {
        for link in self.links.iter_mut() {
            if let Some(mobod) = link.mobod.as_mut() {
                *mobod = old_to_new[mobod.0];
            }
        }
        for joint in self.joints.iter_mut().flatten() {
            if let JointModeling::Mobod(mobod) = joint.how_modeled {
                joint.how_modeled = JointModeling::Mobod(old_to_new[mobod.0]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_MODEL_INSTANCE;

    fn graph_with_world() -> LinkJointGraph {
        let mut graph = LinkJointGraph::new();
        graph.add_rigid_body("world", WORLD_MODEL_INSTANCE).unwrap();
        graph.register_joint_type("revolute", 1, 1, false).unwrap();
        graph
    }

    #[test_log::test]
    fn test_world_is_first_link() {
        let mut graph = LinkJointGraph::new();
        assert_eq!(graph.world_link().unwrap_err(), TopologyError::WorldNotDefined);
        assert_eq!(
            graph.add_rigid_body("world", DEFAULT_MODEL_INSTANCE).unwrap_err(),
            TopologyError::WorldInWrongModelInstance(DEFAULT_MODEL_INSTANCE)
        );
        assert_eq!(graph.num_links(), 0);

        let world = graph.add_rigid_body("ground", WORLD_MODEL_INSTANCE).unwrap();
        assert_eq!(world, WORLD_INDEX);
        assert_eq!(graph.world_body_name().unwrap(), "ground");
        assert!(graph.world_link().unwrap().is_world());

        assert!(matches!(
            graph.add_rigid_body("other", WORLD_MODEL_INSTANCE),
            Err(TopologyError::WorldModelInstanceReserved(_))
        ));
    }

    #[test_log::test]
    fn test_predefined_joint_types() {
        let mut graph = LinkJointGraph::new();
        assert_eq!(graph.num_joint_types(), 3);
        assert_eq!(graph.joint_type_index("weld"), Some(LinkJointGraph::weld_type_index()));
        assert_eq!(
            graph.register_joint_type("weld", 0, 0, false).unwrap_err(),
            TopologyError::DuplicateJointType("weld".to_string())
        );
        assert!(matches!(
            graph.register_joint_type("bad", 2, 3, false),
            Err(TopologyError::InvalidJointTraits { .. })
        ));

        let revolute = graph.register_joint_type("revolute", 1, 1, false).unwrap();
        assert_eq!(revolute, JointTypeIndex(3));
        assert!(graph.is_joint_type_registered("revolute"));
        assert_eq!(graph.joint_type(revolute).nv, 1);
    }

    #[test_log::test]
    fn test_duplicate_names_are_per_instance() {
        let mut graph = graph_with_world();
        let other_instance = ModelInstanceIndex(2);
        graph.add_rigid_body("a", DEFAULT_MODEL_INSTANCE).unwrap();
        graph.add_rigid_body("a", other_instance).unwrap();
        assert!(matches!(
            graph.add_rigid_body("a", DEFAULT_MODEL_INSTANCE),
            Err(TopologyError::DuplicateLinkName { .. })
        ));
        assert!(graph.has_link_named("a", other_instance));
        assert!(!graph.has_link_named("b", other_instance));
        assert_eq!(graph.num_links(), 3);
    }

    #[test_log::test]
    fn test_add_joint_failures_leave_graph_unchanged() {
        let mut graph = graph_with_world();
        let a = graph.add_rigid_body("a", DEFAULT_MODEL_INSTANCE).unwrap();
        let b = graph.add_rigid_body("b", DEFAULT_MODEL_INSTANCE).unwrap();
        graph
            .add_joint("ab", DEFAULT_MODEL_INSTANCE, "revolute", a, b)
            .unwrap();

        assert!(matches!(
            graph.add_joint("ab", DEFAULT_MODEL_INSTANCE, "revolute", WORLD_INDEX, a),
            Err(TopologyError::DuplicateJointName { .. })
        ));
        assert_eq!(
            graph
                .add_joint("x", DEFAULT_MODEL_INSTANCE, "helical", WORLD_INDEX, a)
                .unwrap_err(),
            TopologyError::UnknownJointType("helical".to_string())
        );
        assert_eq!(
            graph
                .add_joint("x", DEFAULT_MODEL_INSTANCE, "revolute", WORLD_INDEX, BodyIndex(9))
                .unwrap_err(),
            TopologyError::InvalidLinkIndex(BodyIndex(9))
        );
        assert!(matches!(
            graph.add_joint("x", DEFAULT_MODEL_INSTANCE, "revolute", a, a),
            Err(TopologyError::SelfJoint(..))
        ));
        // Reversed direction is still the same pair of links
        assert!(matches!(
            graph.add_joint("ba", DEFAULT_MODEL_INSTANCE, "weld", b, a),
            Err(TopologyError::RedundantJoint { .. })
        ));

        assert_eq!(graph.num_joints(), 1);
        assert_eq!(graph.link(a).joints(), &[JointIndex(0)]);
        assert_eq!(graph.maybe_get_joint_between(b, a), Some(JointIndex(0)));
        assert_eq!(graph.maybe_get_joint_between(WORLD_INDEX, a), None);
    }

    #[test_log::test]
    fn test_remove_joint_leaves_tombstone() {
        let mut graph = graph_with_world();
        let a = graph.add_rigid_body("a", DEFAULT_MODEL_INSTANCE).unwrap();
        let b = graph.add_rigid_body("b", DEFAULT_MODEL_INSTANCE).unwrap();
        let first = graph
            .add_joint("wa", DEFAULT_MODEL_INSTANCE, "revolute", WORLD_INDEX, a)
            .unwrap();
        let second = graph
            .add_joint("ab", DEFAULT_MODEL_INSTANCE, "revolute", a, b)
            .unwrap();

        graph.remove_joint(first).unwrap();
        assert_eq!(graph.remove_joint(first).unwrap_err(), TopologyError::InvalidJointIndex(first));
        assert_eq!(
            graph.remove_joint(JointIndex(17)).unwrap_err(),
            TopologyError::InvalidJointIndex(JointIndex(17))
        );
        assert!(!graph.has_joint(first));
        assert!(graph.has_joint(second));
        assert!(!graph.has_joint_named("wa", DEFAULT_MODEL_INSTANCE));
        assert_eq!(graph.num_joints(), 1);
        assert_eq!(graph.num_user_joints(), 2);
        assert!(graph.link(WORLD_INDEX).joints().is_empty());
        assert_eq!(graph.link(a).joints(), &[second]);

        // The pair is free again and the new joint gets a fresh slot
        let third = graph
            .add_joint("wa", DEFAULT_MODEL_INSTANCE, "revolute", WORLD_INDEX, a)
            .unwrap();
        assert_eq!(third, JointIndex(2));
    }

    #[test_log::test]
    fn test_static_link_needs_weld_to_world() {
        let mut graph = graph_with_world();
        let a = graph
            .add_link("a", DEFAULT_MODEL_INSTANCE, LinkFlags::STATIC)
            .unwrap();
        assert!(matches!(
            graph.add_joint("wa", DEFAULT_MODEL_INSTANCE, "revolute", WORLD_INDEX, a),
            Err(TopologyError::StaticLinkNotWelded { .. })
        ));
        let weld = graph
            .add_joint("wa", DEFAULT_MODEL_INSTANCE, "weld", WORLD_INDEX, a)
            .unwrap();
        assert!(matches!(
            graph.change_joint_type(weld, "revolute"),
            Err(TopologyError::StaticLinkNotWelded { .. })
        ));
        assert!(matches!(
            graph.add_link("s", DEFAULT_MODEL_INSTANCE, LinkFlags::SHADOW),
            Err(TopologyError::InternalFlag(_))
        ));
    }

    #[test_log::test]
    fn test_link_flagged_static_needs_weld_to_world() {
        let mut graph = graph_with_world();
        let a = graph.add_rigid_body("a", DEFAULT_MODEL_INSTANCE).unwrap();
        let b = graph.add_rigid_body("b", DEFAULT_MODEL_INSTANCE).unwrap();
        let c = graph.add_rigid_body("c", DEFAULT_MODEL_INSTANCE).unwrap();
        graph
            .add_joint("wa", DEFAULT_MODEL_INSTANCE, "revolute", WORLD_INDEX, a)
            .unwrap();
        graph
            .add_joint("ab", DEFAULT_MODEL_INSTANCE, "revolute", a, b)
            .unwrap();
        graph.build_forest().unwrap();

        assert_eq!(
            graph.change_link_flags(a, LinkFlags::STATIC).unwrap_err(),
            TopologyError::StaticLinkNotWelded {
                link: "a".to_string(),
                joint: "wa".to_string(),
                joint_type: "revolute".to_string(),
            }
        );
        assert_eq!(graph.link(a).flags(), LinkFlags::empty());
        assert!(graph.forest_is_valid());

        // c floats on a base joint the forest added, which does not count
        graph.change_link_flags(c, LinkFlags::STATIC).unwrap();
        assert!(!graph.forest_is_valid());
        // b is only joined to a
        graph.change_link_flags(b, LinkFlags::STATIC).unwrap();

        assert!(graph.build_forest().unwrap());
        let forest = graph.forest();
        for link in [b, c] {
            let mobod = graph.link_to_mobod(link).unwrap();
            assert!(forest.mobods_are_welded(mobod, crate::WORLD_MOBOD_INDEX));
        }
        assert!(!forest.mobod(graph.link_to_mobod(a).unwrap()).is_weld());
    }

    #[test_log::test]
    fn test_static_options_need_welds_to_world() {
        let mut graph = graph_with_world();
        let other_instance = ModelInstanceIndex(2);
        let a = graph.add_rigid_body("a", DEFAULT_MODEL_INSTANCE).unwrap();
        let b = graph.add_rigid_body("b", other_instance).unwrap();
        graph
            .add_joint("wa", DEFAULT_MODEL_INSTANCE, "revolute", WORLD_INDEX, a)
            .unwrap();
        graph.add_joint("wb", other_instance, "weld", WORLD_INDEX, b).unwrap();
        graph.build_forest().unwrap();

        assert!(matches!(
            graph.set_forest_building_options(DEFAULT_MODEL_INSTANCE, ForestBuildingOptions::STATIC),
            Err(TopologyError::StaticLinkNotWelded { .. })
        ));
        assert!(matches!(
            graph.set_global_forest_building_options(ForestBuildingOptions::STATIC),
            Err(TopologyError::StaticLinkNotWelded { .. })
        ));
        assert!(graph.forest_is_valid());
        assert_eq!(
            graph.forest_building_options_in_use(DEFAULT_MODEL_INSTANCE),
            ForestBuildingOptions::empty()
        );

        // Everything in b's instance is already welded to World
        graph
            .set_forest_building_options(other_instance, ForestBuildingOptions::STATIC)
            .unwrap();
        // Once a's instance has options of its own, the global ones no longer reach it
        graph
            .set_forest_building_options(DEFAULT_MODEL_INSTANCE, ForestBuildingOptions::empty())
            .unwrap();
        graph
            .set_global_forest_building_options(ForestBuildingOptions::STATIC)
            .unwrap();
        assert!(graph.build_forest().unwrap());
        assert_eq!(graph.forest().num_positions(), 1);
    }

    #[test_log::test]
    fn test_joint_flags() {
        let mut graph = graph_with_world();
        let a = graph.add_rigid_body("a", DEFAULT_MODEL_INSTANCE).unwrap();
        let joint = graph
            .add_joint_with_flags(
                "wa",
                DEFAULT_MODEL_INSTANCE,
                "weld",
                WORLD_INDEX,
                a,
                JointFlags::MUST_BE_MODELED,
            )
            .unwrap();
        assert!(graph.joint(joint).must_be_modeled());
        graph.build_forest().unwrap();

        graph.change_joint_flags(joint, JointFlags::empty()).unwrap();
        assert!(!graph.forest_is_valid());
        assert_eq!(graph.joint(joint).flags(), JointFlags::empty());
        assert_eq!(
            graph.change_joint_flags(JointIndex(3), JointFlags::MUST_BE_MODELED),
            Err(TopologyError::InvalidJointIndex(JointIndex(3)))
        );
    }

    #[test_log::test]
    fn test_clear_restores_new_graph() {
        let mut graph = graph_with_world();
        let a = graph.add_rigid_body("a", DEFAULT_MODEL_INSTANCE).unwrap();
        graph
            .add_joint("wa", DEFAULT_MODEL_INSTANCE, "revolute", WORLD_INDEX, a)
            .unwrap();
        graph
            .set_global_forest_building_options(ForestBuildingOptions::USE_FIXED_BASE)
            .unwrap();
        graph.set_base_body_policy(BaseBodyPolicy::MostConnected);
        graph.build_forest().unwrap();

        graph.clear();
        assert_eq!(graph.num_links(), 0);
        assert_eq!(graph.num_joints(), 0);
        assert_eq!(graph.world_link().unwrap_err(), TopologyError::WorldNotDefined);
        assert_eq!(graph.num_joint_types(), 3);
        assert!(!graph.is_joint_type_registered("revolute"));
        assert!(graph.is_joint_type_registered("quaternion_floating"));
        assert_eq!(graph.global_forest_building_options(), ForestBuildingOptions::empty());
        assert_eq!(graph.base_body_policy(), BaseBodyPolicy::RegistrationOrder);
        assert_eq!(graph.forest().state(), crate::ForestState::Cleared);
        assert!(!graph.forest_is_valid());

        graph.add_rigid_body("ground", WORLD_MODEL_INSTANCE).unwrap();
        assert!(graph.build_forest().unwrap());
    }

    #[test_log::test]
    #[should_panic]
    fn test_must_treat_as_massless_checks_index() {
        let graph = graph_with_world();
        graph.must_treat_as_massless(BodyIndex(4));
    }

    #[test_log::test]
    fn test_options_per_instance_override_global() {
        let mut graph = graph_with_world();
        let instance = ModelInstanceIndex(5);
        graph
            .set_global_forest_building_options(ForestBuildingOptions::USE_FIXED_BASE)
            .unwrap();
        assert_eq!(
            graph.forest_building_options_in_use(instance),
            ForestBuildingOptions::USE_FIXED_BASE
        );
        graph
            .set_forest_building_options(instance, ForestBuildingOptions::USE_RPY_FLOATING_JOINTS)
            .unwrap();
        assert_eq!(
            graph.forest_building_options_in_use(instance),
            ForestBuildingOptions::USE_RPY_FLOATING_JOINTS
        );
        assert_eq!(
            graph.forest_building_options_in_use(DEFAULT_MODEL_INSTANCE),
            ForestBuildingOptions::USE_FIXED_BASE
        );
        graph.reset_forest_building_options();
        assert_eq!(
            graph.forest_building_options_in_use(instance),
            ForestBuildingOptions::empty()
        );
    }
}
