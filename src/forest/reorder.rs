//! Renumbering the mobilized bodies depth-first.
//!
//! Construction order is breadth-first per tree, and loop closing appends shadows at
//! the very end, so the forest is renumbered once its structure is final.

use super::SpanningForest;
use crate::{
    arena::{invert_permutation, sort_by_indices, DepthFirstIterator},
    LinkJointGraph, MobodIndex, WORLD_MOBOD_INDEX,
};
use itertools::Itertools;
use tracing_attributes::instrument;

impl SpanningForest {
    /// Returns the depth-first order as a new-to-old map: `order[new] == old`.
    pub(super) fn create_depth_first_reordering(&self) -> Vec<usize> {
        let order = DepthFirstIterator::new(&self.mobods, WORLD_MOBOD_INDEX, self.forest_height)
            .map(|mobod| mobod.index.0)
            .collect_vec();
        debug_assert_eq!(order.len(), self.mobods.len(), "every mobod is reachable from World");
        order
    }

    /// Applies the new numbering everywhere, in the forest and in the graph's as-built
    /// annotations, then fills in what depends on depth-first order.
    #[instrument(skip_all)]
    pub(super) fn fixup_forest_to_use_new_numbering(&mut self, graph: &mut LinkJointGraph, new_to_old: Vec<usize>) {
        let old_to_new = invert_permutation(&new_to_old)
            .into_iter()
            .map(MobodIndex)
            .collect_vec();
        let renumber = |mobod: &mut MobodIndex| *mobod = old_to_new[mobod.0];

        for mobod in self.mobods.iter_mut() {
            renumber(&mut mobod.index);
            mobod.inboard.iter_mut().for_each(renumber);
            mobod.outboards.iter_mut().for_each(renumber);
        }
        sort_by_indices(&mut self.mobods, new_to_old);

        for group in self.welded_mobods.iter_mut() {
            group.iter_mut().for_each(renumber);
            group.sort();
        }
        for tree in self.trees.iter_mut() {
            renumber(&mut tree.base_mobod);
        }
        for constraint in self.loop_constraints.iter_mut() {
            renumber(&mut constraint.primary_mobod);
            renumber(&mut constraint.shadow_mobod);
        }
        graph.renumber_mobod_indexes(&old_to_new);

        // Subtrees are contiguous now, so sizes accumulate from the leaves inward.
        for index in (0..self.mobods.len()).rev() {
            let size = 1 + self.mobods[index]
                .outboards
                .iter()
                .map(|outboard| self.mobods[outboard.0].num_subtree_mobods)
                .sum::<usize>();
            self.mobods[index].num_subtree_mobods = size;
        }
        for tree in self.trees.iter_mut() {
            let size = self.mobods[tree.base_mobod.0].num_subtree_mobods;
            tree.last_mobod = MobodIndex(tree.base_mobod.0 + size - 1);
        }
    }
}
