//! CF-tree nodes and their entries.

use core::fmt;

use crate::feature::ClusteringFeature;

/// A leaf entry: one clustering feature and the ids of the points it holds.
///
/// `ids` is empty when the tree does not track memberships.
#[derive(Debug, Clone)]
pub struct Leaf<F> {
    pub(crate) cf: F,
    pub(crate) ids: Vec<usize>,
}

impl<F: ClusteringFeature> Leaf<F> {
    /// Create a leaf from an existing feature and its member ids.
    pub fn new(cf: F, ids: Vec<usize>) -> Self {
        Self { cf, ids }
    }

    /// The summarized statistics.
    pub fn cf(&self) -> &F {
        &self.cf
    }

    /// Ids of the member points, in insertion order.
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Number of summarized points.
    pub fn weight(&self) -> usize {
        self.cf.weight()
    }

    /// Split into feature and member ids.
    pub fn into_parts(self) -> (F, Vec<usize>) {
        (self.cf, self.ids)
    }
}

/// A child slot of a [`Node`].
#[derive(Debug, Clone)]
pub enum Entry<F> {
    /// A clustering feature summarizing points directly.
    Leaf(Leaf<F>),
    /// A subtree.
    Inner(Node<F>),
}

impl<F: ClusteringFeature> Entry<F> {
    /// The entry's statistics (aggregate for inner nodes).
    pub fn cf(&self) -> &F {
        match self {
            Entry::Leaf(leaf) => &leaf.cf,
            Entry::Inner(node) => &node.cf,
        }
    }

    /// Check if this entry is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Entry::Leaf(_))
    }

    /// Get the leaf if this is a leaf entry.
    pub fn as_leaf(&self) -> Option<&Leaf<F>> {
        match self {
            Entry::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Get the node if this is an inner entry.
    pub fn as_node(&self) -> Option<&Node<F>> {
        match self {
            Entry::Inner(node) => Some(node),
            _ => None,
        }
    }
}

/// A node of the CF-tree.
///
/// Holds up to `capacity` children, filled left to right, and an aggregate
/// feature equal to the sum of its children's features.
#[derive(Debug, Clone)]
pub struct Node<F> {
    pub(crate) cf: F,
    pub(crate) children: Vec<Entry<F>>,
    capacity: usize,
}

impl<F: ClusteringFeature> Node<F> {
    /// Create an empty node around an (empty) aggregate feature.
    pub fn new(cf: F, capacity: usize) -> Self {
        Self {
            cf,
            children: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Aggregate statistics of the subtree.
    pub fn cf(&self) -> &F {
        &self.cf
    }

    /// Occupied child slots.
    pub fn children(&self) -> &[Entry<F>] {
        &self.children
    }

    /// Maximum number of children.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.children.len() >= self.capacity
    }

    /// Number of node levels down to the leaf entries (1 for a node of leaves).
    pub fn height(&self) -> usize {
        match self.children.first() {
            Some(Entry::Inner(child)) => 1 + child.height(),
            _ => 1,
        }
    }

    /// Append a child and fold its statistics into the aggregate.
    pub(crate) fn add(&mut self, entry: Entry<F>) {
        self.cf.merge(entry.cf());
        self.push(entry);
    }

    /// Append a child whose statistics the aggregate already contains.
    pub(crate) fn push(&mut self, entry: Entry<F>) {
        assert!(!self.is_full(), "cannot append to a full node");
        self.children.push(entry);
    }
}

impl<F: ClusteringFeature> fmt::Display for Node<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_entry<F: ClusteringFeature>(
            f: &mut fmt::Formatter<'_>,
            cf: &F,
            depth: usize,
        ) -> fmt::Result {
            write!(f, "{:indent$}{}", "", cf.weight(), indent = depth)?;
            for x in cf.mean() {
                write!(f, " {x}")?;
            }
            writeln!(f)
        }

        fn walk<F: ClusteringFeature>(
            f: &mut fmt::Formatter<'_>,
            node: &Node<F>,
            depth: usize,
        ) -> fmt::Result {
            write_entry(f, &node.cf, depth)?;
            for child in &node.children {
                match child {
                    Entry::Leaf(leaf) => write_entry(f, &leaf.cf, depth + 1)?,
                    Entry::Inner(inner) => walk(f, inner, depth + 1)?,
                }
            }
            Ok(())
        }

        walk(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::DiagonalCf;

    fn leaf(x: f64) -> Entry<DiagonalCf> {
        let mut cf = DiagonalCf::new(1);
        cf.add_point(&[x]);
        Entry::Leaf(Leaf::new(cf, vec![]))
    }

    #[test]
    fn test_add_updates_aggregate() {
        let mut node = Node::new(DiagonalCf::new(1), 2);
        node.add(leaf(1.0));
        node.add(leaf(3.0));
        assert!(node.is_full());
        assert_eq!(node.cf().weight(), 2);
        assert!((node.cf().centroid(0) - 2.0).abs() < 1e-12);
        assert_eq!(node.height(), 1);
    }

    #[test]
    #[should_panic(expected = "full node")]
    fn test_push_into_full_node_panics() {
        let mut node = Node::new(DiagonalCf::new(1), 1);
        node.add(leaf(1.0));
        node.add(leaf(2.0));
    }

    #[test]
    fn test_display_lists_entries() {
        let mut node = Node::new(DiagonalCf::new(1), 3);
        node.add(leaf(1.0));
        node.add(leaf(5.0));
        let s = format!("{node}");
        assert_eq!(s.lines().count(), 3);
        assert!(s.starts_with("2 3"));
    }
}
