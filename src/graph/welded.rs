//! Partitioning of the user's links into groups that are welded together.
//!
//! These queries look only at user links and user joints, so they give the same
//! answer whether or not a forest has been built.

use super::{Joint, LinkJointGraph};
use crate::{errors::Result, BodyIndex, JointIndex, TopologyError, WORLD_INDEX};
use std::collections::{BTreeSet, VecDeque};

impl LinkJointGraph {
    /// Partitions all user links into groups connected only by welds. World's group is
    /// always first, even if nothing is welded to it. A link with no welds forms a
    /// group by itself.
    ///
    /// Groups are emitted in the order they are reached: a group's whole weld closure
    /// is collected before crossing any of its non-weld joints, and links unreachable
    /// from World are picked up in registration order.
    pub fn find_subgraphs_of_welded_bodies(&self) -> Vec<BTreeSet<BodyIndex>> {
        let num_links = self.num_user_links();
        let mut visited = vec![false; num_links];
        let mut subgraphs = vec![];
        let mut seeds = VecDeque::new();
        if num_links > 0 {
            seeds.push_back(WORLD_INDEX);
        }
        let mut next_unreached = 1;

        loop {
            let seed = match seeds.pop_front() {
                Some(seed) => seed,
                None => {
                    while next_unreached < num_links && visited[next_unreached] {
                        next_unreached += 1;
                    }
                    if next_unreached == num_links {
                        break;
                    }
                    BodyIndex(next_unreached)
                }
            };
            if visited[seed.0] {
                continue;
            }
            let group = self.collect_welded(seed, &mut visited);
            for &link in &group {
                for &j in &self.links[link.0].joints {
                    let Some(joint) = self.user_joint_slot(j).filter(|joint| !joint.is_weld()) else {
                        continue;
                    };
                    let neighbor = joint.other_link(link);
                    if !visited[neighbor.0] {
                        seeds.push_back(neighbor);
                    }
                }
            }
            subgraphs.push(group);
        }
        subgraphs
    }

    /// The group of links welded to `link`, always including `link` itself.
    pub fn find_bodies_welded_to(&self, link: BodyIndex) -> Result<BTreeSet<BodyIndex>> {
        if link.0 >= self.num_user_links() {
            return Err(TopologyError::InvalidLinkIndex(link));
        }
        let mut visited = vec![false; self.num_user_links()];
        Ok(self.collect_welded(link, &mut visited))
    }

    /// Depth-first walk from `start` that crosses only welds.
    fn collect_welded(&self, start: BodyIndex, visited: &mut [bool]) -> BTreeSet<BodyIndex> {
        let mut group = BTreeSet::new();
        let mut stack = vec![start];
        visited[start.0] = true;
        while let Some(link) = stack.pop() {
            group.insert(link);
            for &j in &self.links[link.0].joints {
                let Some(joint) = self.user_joint_slot(j).filter(|joint| joint.is_weld()) else {
                    continue;
                };
                let neighbor = joint.other_link(link);
                if !visited[neighbor.0] {
                    visited[neighbor.0] = true;
                    stack.push(neighbor);
                }
            }
        }
        group
    }

    fn user_joint_slot(&self, index: JointIndex) -> Option<&Joint> {
        if index.0 < self.num_user_joints() {
            self.joints[index.0].as_ref()
        } else {
            None
        }
    }
}
