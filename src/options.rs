//! Modeling options that steer how a [crate::SpanningForest] is built.

use crate::BodyIndex;
use std::cmp::Reverse;

bitflags::bitflags! {
    /// Forest building options, set globally or per model instance.
    ///
    /// Per-instance options replace the global ones, they are not blended.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ForestBuildingOptions: u32 {
        /// Every link of the instance is anchored to World with a weld.
        const STATIC = 0b0000_0001;
        /// Base bodies are welded to World instead of floating.
        const USE_FIXED_BASE = 0b0000_0010;
        /// Floating base joints use roll-pitch-yaw instead of a quaternion.
        const USE_RPY_FLOATING_JOINTS = 0b0000_0100;
        /// Links welded together follow a single mobilized body.
        const MERGE_LINK_COMPOSITES = 0b0000_1000;
    }
}

bitflags::bitflags! {
    /// Per-link annotations given at registration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct LinkFlags: u32 {
        /// The link is welded to World.
        const STATIC = 0b0000_0001;
        /// The link must be connected directly to World.
        const MUST_BE_BASE_BODY = 0b0000_0010;
        /// The link has no mass and must not end a branch.
        const TREAT_AS_MASSLESS = 0b0000_0100;
        /// Internal use only: the link was split off a primary to break a loop.
        const SHADOW = 0b0000_1000;
    }
}

bitflags::bitflags! {
    /// Per-joint annotations given at registration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct JointFlags: u32 {
        /// The joint gets its own mobilizer even where a weld could be merged away.
        const MUST_BE_MODELED = 0b0000_0001;
    }
}

/// Total order used to pick the base body of a subgraph that has no path to World.
///
/// Candidates compare by, in this order:
/// 1. links flagged [LinkFlags::MUST_BE_BASE_BODY] first,
/// 2. the policy key (nothing for [BaseBodyPolicy::RegistrationOrder], the number of
///    joints, larger first, for [BaseBodyPolicy::MostConnected]),
/// 3. lowest [BodyIndex].
///
/// The last key makes the order total so the choice is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BaseBodyPolicy {
    #[default]
    RegistrationOrder,
    MostConnected,
}

/// What [BaseBodyPolicy] needs to know about a candidate link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseBodyCandidate {
    pub link: BodyIndex,
    pub must_be_base_body: bool,
    pub num_joints: usize,
}

impl BaseBodyPolicy {
    /// Returns the best of the candidates, or `None` if there are none.
    pub fn choose(self, candidates: impl IntoIterator<Item = BaseBodyCandidate>) -> Option<BodyIndex> {
        candidates
            .into_iter()
            .min_by_key(|c| {
                let connectivity = match self {
                    BaseBodyPolicy::RegistrationOrder => 0,
                    BaseBodyPolicy::MostConnected => c.num_joints,
                };
                (Reverse(c.must_be_base_body), Reverse(connectivity), c.link)
            })
            .map(|c| c.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(link: usize, must_be_base_body: bool, num_joints: usize) -> BaseBodyCandidate {
        BaseBodyCandidate {
            link: BodyIndex(link),
            must_be_base_body,
            num_joints,
        }
    }

    #[test_log::test]
    fn test_registration_order() {
        let candidates = [candidate(4, false, 1), candidate(2, false, 1), candidate(3, false, 3)];
        assert_eq!(BaseBodyPolicy::RegistrationOrder.choose(candidates), Some(BodyIndex(2)));
        assert_eq!(BaseBodyPolicy::RegistrationOrder.choose([]), None);
    }

    #[test_log::test]
    fn test_most_connected_with_ties() {
        let candidates = [candidate(4, false, 3), candidate(2, false, 1), candidate(3, false, 3)];
        assert_eq!(BaseBodyPolicy::MostConnected.choose(candidates), Some(BodyIndex(3)));
    }

    #[test_log::test]
    fn test_must_be_base_body_wins() {
        let candidates = [candidate(2, false, 5), candidate(7, true, 0)];
        assert_eq!(BaseBodyPolicy::MostConnected.choose(candidates), Some(BodyIndex(7)));
        assert_eq!(BaseBodyPolicy::RegistrationOrder.choose(candidates), Some(BodyIndex(7)));
    }
}
