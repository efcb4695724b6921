//! A rigid body of the [super::LinkJointGraph].

use crate::{
    BodyIndex, JointIndex, LinkCompositeIndex, LinkFlags, LoopConstraintIndex, MobodIndex, ModelInstanceIndex,
};

/// A user-defined rigid body, or a shadow split off one to break a loop.
///
/// The "as built" fields (mobilized body, inboard joint, composite, shadows) are only
/// meaningful while the owning graph has a valid forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub(crate) index: BodyIndex,
    pub(crate) name: String,
    pub(crate) model_instance: ModelInstanceIndex,
    pub(crate) flags: LinkFlags,

    /// Union of `joints_as_parent` and `joints_as_child`, in insertion order
    pub(crate) joints: Vec<JointIndex>,
    pub(crate) joints_as_parent: Vec<JointIndex>,
    pub(crate) joints_as_child: Vec<JointIndex>,

    pub(crate) mobod: Option<MobodIndex>,
    pub(crate) inboard_joint: Option<JointIndex>,
    pub(crate) composite: Option<LinkCompositeIndex>,
    pub(crate) primary_link: Option<BodyIndex>,
    pub(crate) shadow_links: Vec<BodyIndex>,
    pub(crate) loop_constraints: Vec<LoopConstraintIndex>,
}

impl Link {
    pub(crate) fn new(index: BodyIndex, name: &str, model_instance: ModelInstanceIndex, flags: LinkFlags) -> Self {
        Link {
            index,
            name: name.to_string(),
            model_instance,
            flags,
            joints: vec![],
            joints_as_parent: vec![],
            joints_as_child: vec![],
            mobod: None,
            inboard_joint: None,
            composite: None,
            primary_link: None,
            shadow_links: vec![],
            loop_constraints: vec![],
        }
    }

    pub fn index(&self) -> BodyIndex {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_instance(&self) -> ModelInstanceIndex {
        self.model_instance
    }

    pub fn flags(&self) -> LinkFlags {
        self.flags
    }

    pub fn is_world(&self) -> bool {
        self.index == crate::WORLD_INDEX
    }

    /// All joints connecting this link, whether as parent or child.
    pub fn joints(&self) -> &[JointIndex] {
        &self.joints
    }

    pub fn joints_as_parent(&self) -> &[JointIndex] {
        &self.joints_as_parent
    }

    pub fn joints_as_child(&self) -> &[JointIndex] {
        &self.joints_as_child
    }

    pub fn must_be_base_body(&self) -> bool {
        self.flags.contains(LinkFlags::MUST_BE_BASE_BODY)
    }

    /// Only the flag; see [super::LinkJointGraph::must_treat_as_massless] for the
    /// composite-aware answer.
    pub fn treat_as_massless(&self) -> bool {
        self.flags.contains(LinkFlags::TREAT_AS_MASSLESS)
    }

    /// Shadow links are ephemeral: they exist only while the forest that needed them is valid.
    pub fn is_shadow(&self) -> bool {
        self.flags.contains(LinkFlags::SHADOW)
    }

    /// The mobilized body this link follows. For a primary link that was split, this
    /// is the primary's mobilized body.
    pub fn mobod(&self) -> Option<MobodIndex> {
        self.mobod
    }

    /// The joint modeled by this link's mobilizer, or the weld that merged it into a
    /// composite. `None` for World and for base bodies of unbuilt forests.
    pub fn inboard_joint(&self) -> Option<JointIndex> {
        self.inboard_joint
    }

    pub fn composite(&self) -> Option<LinkCompositeIndex> {
        self.composite
    }

    /// For a shadow link, the link it was split from.
    pub fn primary_link(&self) -> Option<BodyIndex> {
        self.primary_link
    }

    pub fn shadow_links(&self) -> &[BodyIndex] {
        &self.shadow_links
    }

    pub fn loop_constraints(&self) -> &[LoopConstraintIndex] {
        &self.loop_constraints
    }

    pub(crate) fn add_joint_as_parent(&mut self, joint: JointIndex) {
        self.joints_as_parent.push(joint);
        self.joints.push(joint);
    }

    pub(crate) fn add_joint_as_child(&mut self, joint: JointIndex) {
        self.joints_as_child.push(joint);
        self.joints.push(joint);
    }

    pub(crate) fn remove_joint(&mut self, joint: JointIndex) {
        self.joints.retain(|&j| j != joint);
        self.joints_as_parent.retain(|&j| j != joint);
        self.joints_as_child.retain(|&j| j != joint);
    }

    /// Forgets everything learned while building a forest.
    pub(crate) fn clear_model(&mut self, num_user_joints: usize) {
        self.mobod = None;
        self.inboard_joint = None;
        self.composite = None;
        self.shadow_links.clear();
        self.loop_constraints.clear();
        self.joints.retain(|j| j.0 < num_user_joints);
        self.joints_as_parent.retain(|j| j.0 < num_user_joints);
        self.joints_as_child.retain(|j| j.0 < num_user_joints);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_MODEL_INSTANCE;

    #[test_log::test]
    fn test_joint_bookkeeping() {
        let mut link = Link::new(BodyIndex(3), "arm", DEFAULT_MODEL_INSTANCE, LinkFlags::TREAT_AS_MASSLESS);
        assert!(link.treat_as_massless());
        assert!(!link.is_world());

        link.add_joint_as_parent(JointIndex(0));
        link.add_joint_as_child(JointIndex(4));
        link.add_joint_as_parent(JointIndex(7));
        assert_eq!(link.joints(), &[JointIndex(0), JointIndex(4), JointIndex(7)]);

        link.remove_joint(JointIndex(0));
        assert_eq!(link.joints(), &[JointIndex(4), JointIndex(7)]);
        assert_eq!(link.joints_as_parent(), &[JointIndex(7)]);

        // Joints from index 5 on were ephemeral
        link.mobod = Some(MobodIndex(2));
        link.clear_model(5);
        assert_eq!(link.joints(), &[JointIndex(4)]);
        assert!(link.joints_as_parent().is_empty());
        assert_eq!(link.mobod(), None);
    }
}
