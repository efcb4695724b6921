use super::SpanningForest;
use crate::{LinkJointGraph, MobodIndex};
use tracing::debug;
use tracing_attributes::instrument;

impl SpanningForest {
    /// Hands out position and velocity coordinates in depth-first order, so that each
    /// tree, and each subtree, owns a contiguous range.
    #[instrument(skip_all)]
    pub(super) fn assign_coordinates(&mut self, graph: &LinkJointGraph) {
        let (mut q, mut v) = (0, 0);
        for mobod in self.mobods.iter_mut() {
            mobod.q_start = q;
            mobod.v_start = v;
            if let Some(joint) = mobod.joint {
                let traits = graph.joint_type(graph.joint(joint).type_index());
                mobod.nq = traits.nq;
                mobod.nv = traits.nv;
                mobod.has_quaternion = traits.has_quaternion;
            }
            self.q_to_mobod.extend(std::iter::repeat(mobod.index).take(mobod.nq));
            self.v_to_mobod.extend(std::iter::repeat(mobod.index).take(mobod.nv));
            q += mobod.nq;
            v += mobod.nv;
        }

        for index in (0..self.mobods.len()).rev() {
            let (nq_outboard, nv_outboard) = self.mobods[index]
                .outboards
                .iter()
                .map(|outboard| &self.mobods[outboard.0])
                .fold((0, 0), |(nq, nv), outboard| {
                    (nq + outboard.nq + outboard.nq_outboard, nv + outboard.nv + outboard.nv_outboard)
                });
            let mobod = &mut self.mobods[index];
            mobod.nq_outboard = nq_outboard;
            mobod.nv_outboard = nv_outboard;
        }

        for tree in self.trees.iter_mut() {
            let base = &self.mobods[tree.base_mobod.0];
            tree.q_start = base.q_start;
            tree.v_start = base.v_start;
            tree.nq = base.nq + base.nq_outboard;
            tree.nv = base.nv + base.nv_outboard;
        }
        debug!(nq = q, nv = v, "assigned coordinates");
    }

    /// Mobilized body owning each position, `num_positions()` entries.
    pub fn q_to_mobod_map(&self) -> &[MobodIndex] {
        &self.q_to_mobod
    }

    pub fn v_to_mobod_map(&self) -> &[MobodIndex] {
        &self.v_to_mobod
    }
}
