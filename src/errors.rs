//! Provides the error type used throughout this crate.
//!
//! Only caller mistakes are reported as errors. A forest that cannot be used
//! for dynamics is still a valid forest, see [crate::SpanningForest::dynamics_ok].

use crate::{BodyIndex, JointIndex, ModelInstanceIndex};
use thiserror::Error;

/// Usage errors raised by the mutating calls of [crate::LinkJointGraph]. The graph is
/// left untouched whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("World has not been defined yet; the first registered link defines it")]
    WorldNotDefined,
    #[error("World must be registered in the world model instance, got {0}")]
    WorldInWrongModelInstance(ModelInstanceIndex),
    #[error("Only World may belong to the world model instance (link '{0}')")]
    WorldModelInstanceReserved(String),
    #[error("Link name '{name}' is already used in model instance {model_instance}")]
    DuplicateLinkName {
        name: String,
        model_instance: ModelInstanceIndex,
    },
    #[error("Joint name '{name}' is already used in model instance {model_instance}")]
    DuplicateJointName {
        name: String,
        model_instance: ModelInstanceIndex,
    },
    #[error("Joint type '{0}' has not been registered")]
    UnknownJointType(String),
    #[error("Joint type '{0}' is already registered")]
    DuplicateJointType(String),
    #[error("Invalid traits for joint type '{name}': nq={nq}, nv={nv}, has_quaternion={has_quaternion}")]
    InvalidJointTraits {
        name: String,
        nq: usize,
        nv: usize,
        has_quaternion: bool,
    },
    #[error("Link index {0} is out of range")]
    InvalidLinkIndex(BodyIndex),
    #[error("Joint index {0} does not refer to a joint in this graph")]
    InvalidJointIndex(JointIndex),
    #[error("Joint '{0}' would connect link {1} to itself")]
    SelfJoint(String, BodyIndex),
    #[error("Joint '{name}' would duplicate joint {existing} between links {first} and {second}")]
    RedundantJoint {
        name: String,
        existing: JointIndex,
        first: BodyIndex,
        second: BodyIndex,
    },
    #[error("Static link '{link}' can only be connected to World by a weld, not by joint '{joint}' of type '{joint_type}'")]
    StaticLinkNotWelded {
        link: String,
        joint: String,
        joint_type: String,
    },
    #[error("Link flag SHADOW is reserved for links created while building the forest ('{0}')")]
    InternalFlag(String),
    #[error("Joint {0} was added while building the forest and cannot be edited")]
    EphemeralJoint(JointIndex),
}

/// Shorthand used by all fallible calls of this crate.
pub type Result<T> = std::result::Result<T, TopologyError>;
