use crate::{BodyIndex, LoopConstraintIndex, ModelInstanceIndex};

/// A weld between a primary link and one of its shadows, added to the graph while
/// building the forest. The primary is always the weld's parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConstraint {
    pub(crate) index: LoopConstraintIndex,
    pub(crate) name: String,
    pub(crate) model_instance: ModelInstanceIndex,
    pub(crate) primary_link: BodyIndex,
    pub(crate) shadow_link: BodyIndex,
}

impl LoopConstraint {
    pub fn index(&self) -> LoopConstraintIndex {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_instance(&self) -> ModelInstanceIndex {
        self.model_instance
    }

    pub fn primary_link(&self) -> BodyIndex {
        self.primary_link
    }

    pub fn shadow_link(&self) -> BodyIndex {
        self.shadow_link
    }
}
