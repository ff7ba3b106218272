//! Depth-first traversal of the leaf entries.

use super::node::{Entry, Leaf, Node};

/// Iterator over the leaves of a CF-tree, left to right.
///
/// Created by [`CfTree::leaves`](super::CfTree::leaves). The tree cannot be
/// modified while the iterator is alive.
#[derive(Debug, Clone)]
pub struct Leaves<'a, F> {
    stack: Vec<&'a Entry<F>>,
}

impl<'a, F> Leaves<'a, F> {
    pub(crate) fn new(root: Option<&'a Node<F>>) -> Self {
        let stack = root
            .map(|node| node.children.iter().rev().collect())
            .unwrap_or_default();
        Self { stack }
    }
}

impl<'a, F> Iterator for Leaves<'a, F> {
    type Item = &'a Leaf<F>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(entry) = self.stack.pop() {
            match entry {
                Entry::Leaf(leaf) => return Some(leaf),
                Entry::Inner(node) => self.stack.extend(node.children.iter().rev()),
            }
        }
        None
    }
}

impl<F> core::iter::FusedIterator for Leaves<'_, F> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{ClusteringFeature, SphericalCf};

    fn leaf(x: f64) -> Entry<SphericalCf> {
        let mut cf = SphericalCf::new(1);
        cf.add_point(&[x]);
        Entry::Leaf(Leaf::new(cf, vec![x as usize]))
    }

    #[test]
    fn test_empty() {
        let mut it = Leaves::<SphericalCf>::new(None);
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_left_to_right() {
        let mut left = Node::new(SphericalCf::new(1), 2);
        left.add(leaf(0.0));
        left.add(leaf(1.0));
        let mut right = Node::new(SphericalCf::new(1), 2);
        right.add(leaf(2.0));
        let mut root = Node::new(SphericalCf::new(1), 2);
        root.add(Entry::Inner(left));
        root.add(Entry::Inner(right));

        let ids: Vec<usize> = Leaves::new(Some(&root)).map(|l| l.ids()[0]).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
