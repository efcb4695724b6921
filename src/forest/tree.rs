use crate::{MobodIndex, TreeIndex};
use std::ops::Range;

/// Mobilized bodies connected to World through a single base body.
///
/// Once the forest is numbered depth-first, a tree's mobilized bodies and its
/// coordinates are contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub(crate) index: TreeIndex,
    pub(crate) base_mobod: MobodIndex,
    pub(crate) last_mobod: MobodIndex,
    /// Number of levels; one for a tree consisting of its base body only.
    pub(crate) height: usize,
    pub(crate) q_start: usize,
    pub(crate) nq: usize,
    pub(crate) v_start: usize,
    pub(crate) nv: usize,
}

impl Tree {
    pub(crate) fn new(index: TreeIndex, base_mobod: MobodIndex) -> Self {
        Tree {
            index,
            base_mobod,
            last_mobod: base_mobod,
            height: 1,
            q_start: 0,
            nq: 0,
            v_start: 0,
            nv: 0,
        }
    }

    pub fn index(&self) -> TreeIndex {
        self.index
    }

    pub fn base_mobod(&self) -> MobodIndex {
        self.base_mobod
    }

    pub fn last_mobod(&self) -> MobodIndex {
        self.last_mobod
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn num_mobods(&self) -> usize {
        self.last_mobod.0 - self.base_mobod.0 + 1
    }

    pub fn mobods(&self) -> impl Iterator<Item = MobodIndex> {
        (self.base_mobod.0..=self.last_mobod.0).map(MobodIndex)
    }

    pub fn contains(&self, mobod: MobodIndex) -> bool {
        self.base_mobod <= mobod && mobod <= self.last_mobod
    }

    pub fn q_range(&self) -> Range<usize> {
        self.q_start..self.q_start + self.nq
    }

    pub fn v_range(&self) -> Range<usize> {
        self.v_start..self.v_start + self.nv
    }

    pub fn nq(&self) -> usize {
        self.nq
    }

    pub fn nv(&self) -> usize {
        self.nv
    }
}
