/*! Depth-first traversal of an [arena allocated](https://en.wikipedia.org/wiki/Region-based_memory_management) tree */
use super::Nodelike;

/// Iterator for a depth-first iteration when the arena is not already sorted accordingly.
///
/// Children are visited in the order they appear in [Nodelike::children].
pub struct DepthFirstIterator<'a, N>
where
    N: Nodelike,
{
    nodes: &'a [N],
    stack: Vec<std::slice::Iter<'a, N::Index>>,
    root: Option<usize>,
}

impl<'a, N> DepthFirstIterator<'a, N>
where
    N: Nodelike,
{
    /// Starts at `root`. `max_depth` is only used to preallocate the stack.
    pub fn new(nodes: &'a [N], root: N::Index, max_depth: usize) -> Self {
        DepthFirstIterator {
            nodes,
            stack: Vec::with_capacity(max_depth),
            root: Some(root.into()),
        }
    }
}

impl<'a, N> Iterator for DepthFirstIterator<'a, N>
where
    N: Nodelike,
{
    type Item = &'a N;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.root.take() {
            let root = &self.nodes[root];
            self.stack.push(root.children().iter());
            return Some(root);
        }
        while let Some(last) = self.stack.last_mut() {
            if let Some(child_ref) = last.next() {
                let node = &self.nodes[(*child_ref).into()];
                self.stack.push(node.children().iter());
                return Some(node);
            }
            self.stack.pop();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[derive(Debug)]
    struct Node {
        index: usize,
        children: Vec<usize>,
        depth: usize,
    }

    impl Nodelike for Node {
        type Index = usize;

        fn index(&self) -> usize {
            self.index
        }

        fn children(&self) -> &[usize] {
            &self.children
        }

        fn depth(&self) -> usize {
            self.depth
        }
    }

    fn node(index: usize, children: &[usize], depth: usize) -> Node {
        Node {
            index,
            children: children.to_vec(),
            depth,
        }
    }

    #[test_log::test]
    fn test_depth_first_order() {
        // Stored in insertion order, not depth-first:
        //     0
        //    / \
        //  1    2
        // | \   |
        // 3  4  6
        // |
        // 5
        let nodes = vec![
            node(0, &[1, 2], 0),
            node(1, &[3, 4], 1),
            node(2, &[6], 1),
            node(3, &[5], 2),
            node(4, &[], 2),
            node(5, &[], 3),
            node(6, &[], 2),
        ];

        let result = DepthFirstIterator::new(&nodes, 0, 4).map(|n| n.index()).collect_vec();
        assert_eq!(result, &[0, 1, 3, 5, 4, 2, 6]);

        let result = DepthFirstIterator::new(&nodes, 1, 4).map(|n| n.index()).collect_vec();
        assert_eq!(result, &[1, 3, 5, 4]);

        let leaves = DepthFirstIterator::new(&nodes, 0, 4)
            .filter(|n| n.is_leaf())
            .map(|n| n.index())
            .collect_vec();
        assert_eq!(leaves, &[5, 4, 6]);
    }
}
