//! Recording merges over tree leaves.

use tracing::warn;

use super::pointer::PointerHierarchy;
use crate::error::{Error, Result};
use crate::feature::ClusteringFeature;
use crate::tree::Leaf;

/// Collects the merges an agglomerative algorithm performs over `n` leaves.
///
/// Leaves are addressed by dense index `0..n`. `link(i, d, p)` records that
/// the cluster represented by `i` merged into the cluster represented by `p`
/// at distance `d`; `p` keeps representing the merged cluster. Each index can
/// be linked once, so a complete run performs `n − 1` links and leaves one
/// index unlinked as the root.
///
/// [`HierarchyBuilder::complete`] expands the leaf-level merges into a
/// hierarchy over the original point ids.
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    parent: Vec<usize>,
    parent_distance: Vec<f64>,
    merge_order: Vec<usize>,
    track_sizes: bool,
    merges: usize,
    last_distance: f64,
    non_monotone: usize,
}

impl HierarchyBuilder {
    /// Create a builder for `n` leaves.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            parent_distance: vec![f64::INFINITY; n],
            merge_order: vec![usize::MAX; n],
            track_sizes: false,
            merges: 0,
            last_distance: f64::NEG_INFINITY,
            non_monotone: 0,
        }
    }

    /// Also compute the size of the cluster formed by each merge.
    pub fn with_cluster_sizes(mut self) -> Self {
        self.track_sizes = true;
        self
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether the builder has no leaves.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Whether leaf `i` has already been merged into another cluster.
    pub fn is_linked(&self, i: usize) -> bool {
        self.parent_distance[i].is_finite()
    }

    /// Record that cluster `i` merged into cluster `parent` at `distance`.
    ///
    /// # Panics
    ///
    /// If `i` is already linked or links to itself, if `parent` is out of
    /// range, or if `distance` is not finite.
    pub fn link(&mut self, i: usize, distance: f64, parent: usize) {
        assert!(!self.is_linked(i), "leaf {i} is already linked");
        assert!(
            parent < self.len(),
            "parent {parent} out of range for {} leaves",
            self.len()
        );
        assert_ne!(i, parent, "leaf {i} cannot be linked to itself");
        assert!(distance.is_finite(), "merge distance must be finite");
        if distance < self.last_distance {
            self.non_monotone += 1;
        }
        self.last_distance = distance;
        self.parent[i] = parent;
        self.parent_distance[i] = distance;
        self.merge_order[i] = self.merges;
        self.merges += 1;
    }

    /// Parent of leaf `i` (itself if unlinked).
    pub fn parent(&self, i: usize) -> usize {
        self.parent[i]
    }

    /// Number of links recorded so far.
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// Number of links whose distance was below the previous link's.
    pub fn non_monotone(&self) -> usize {
        self.non_monotone
    }

    /// Expand the leaf-level merges into a hierarchy over `n_points` ids.
    ///
    /// The first member of every leaf represents it. The other members are
    /// linked to the representative at the leaf's RMS radius with merge
    /// order 0; leaf merges follow with their recorded order plus one.
    ///
    /// Returns an error if the number of leaves differs from the builder's,
    /// if a leaf has no member ids, or if an id is out of range. An
    /// incomplete or non-monotone set of merges only produces a warning.
    pub fn complete<F: ClusteringFeature>(
        self,
        leaves: &[Leaf<F>],
        n_points: usize,
    ) -> Result<PointerHierarchy> {
        if leaves.len() != self.len() {
            return Err(Error::DimensionMismatch {
                expected: self.len(),
                found: leaves.len(),
            });
        }

        let mut reps = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let Some(&rep) = leaf.ids().first() else {
                return Err(Error::InvalidParameter {
                    name: "leaves",
                    message: "every leaf needs member ids",
                });
            };
            if leaf.ids().iter().any(|&id| id >= n_points) {
                return Err(Error::InvalidParameter {
                    name: "n_points",
                    message: "member id out of range",
                });
            }
            reps.push(rep);
        }

        let mut hierarchy = PointerHierarchy::singletons(n_points, self.track_sizes);

        for (leaf, &rep) in leaves.iter().zip(&reps) {
            let radius = leaf.cf().total_variance().max(0.0).sqrt();
            for (k, &id) in leaf.ids().iter().enumerate().skip(1) {
                hierarchy.set(id, rep, radius, 0, k + 1);
            }
        }

        let n = self.len();
        let mut order: Vec<usize> = (0..n).filter(|&i| self.is_linked(i)).collect();
        order.sort_by_key(|&i| self.merge_order[i]);
        let mut sizes: Vec<usize> = leaves.iter().map(|leaf| leaf.ids().len()).collect();
        for i in order {
            let p = self.parent[i];
            sizes[p] += sizes[i];
            hierarchy.set(
                reps[i],
                reps[p],
                self.parent_distance[i],
                self.merge_order[i] + 1,
                sizes[p],
            );
        }

        let expected = n.saturating_sub(1);
        if self.merges != expected {
            warn!(
                links = self.merges,
                expected, "dendrogram is incomplete; returning a partial hierarchy"
            );
        }
        if self.non_monotone > 0 {
            warn!(
                count = self.non_monotone,
                "merge distances are not monotone"
            );
        }
        Ok(hierarchy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::SphericalCf;

    fn leaf(points: &[(usize, f64)]) -> Leaf<SphericalCf> {
        let mut cf = SphericalCf::new(1);
        for &(_, x) in points {
            cf.add_point(&[x]);
        }
        Leaf::new(cf, points.iter().map(|&(id, _)| id).collect())
    }

    #[test]
    fn test_link_and_is_linked() {
        let mut b = HierarchyBuilder::new(3);
        assert!(!b.is_linked(1));
        b.link(1, 0.5, 0);
        assert!(b.is_linked(1));
        assert_eq!(b.parent(1), 0);
        assert_eq!(b.parent(2), 2);
        assert_eq!(b.merges(), 1);
    }

    #[test]
    #[should_panic(expected = "already linked")]
    fn test_double_link_panics() {
        let mut b = HierarchyBuilder::new(3);
        b.link(1, 0.5, 0);
        b.link(1, 0.7, 2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_link_to_missing_parent_panics() {
        let mut b = HierarchyBuilder::new(2);
        b.link(0, 1.0, 99);
    }

    #[test]
    fn test_counts_non_monotone_links() {
        let mut b = HierarchyBuilder::new(4);
        b.link(1, 2.0, 0);
        b.link(3, 1.0, 2);
        b.link(2, 3.0, 0);
        assert_eq!(b.non_monotone(), 1);
    }

    #[test]
    fn test_complete_expands_members() {
        // leaf 0: ids 0, 2 ; leaf 1: id 1 ; leaf 2: ids 3, 4, 5
        let leaves = vec![
            leaf(&[(0, 0.0), (2, 2.0)]),
            leaf(&[(1, 10.0)]),
            leaf(&[(3, 20.0), (4, 20.0), (5, 20.0)]),
        ];
        let mut b = HierarchyBuilder::new(3).with_cluster_sizes();
        b.link(1, 9.0, 0);
        b.link(2, 15.0, 0);
        let h = b.complete(&leaves, 6).unwrap();

        assert!(h.is_complete());
        assert_eq!(h.roots(), vec![0]);
        assert_eq!(h.parent(2), 0);
        assert!((h.parent_distance(2) - 1.0).abs() < 1e-12);
        assert_eq!(h.merge_order(2), 0);
        assert_eq!(h.parent(4), 3);
        assert_eq!(h.parent_distance(4), 0.0);
        assert_eq!(h.parent(1), 0);
        assert_eq!(h.parent_distance(1), 9.0);
        assert_eq!(h.merge_order(1), 1);
        assert_eq!(h.parent(3), 0);
        assert_eq!(h.merge_order(3), 2);

        let sizes = h.cluster_sizes().unwrap();
        assert_eq!(sizes[1], 3);
        assert_eq!(sizes[3], 6);
        assert_eq!(sizes[5], 3);
    }

    #[test]
    fn test_incomplete_is_reported() {
        let leaves = vec![leaf(&[(0, 0.0)]), leaf(&[(1, 1.0)]), leaf(&[(2, 5.0)])];
        let mut b = HierarchyBuilder::new(3);
        b.link(1, 1.0, 0);
        let h = b.complete(&leaves, 3).unwrap();
        assert!(!h.is_complete());
        assert_eq!(h.roots(), vec![0, 2]);
        assert!(h.cluster_sizes().is_none());
    }

    #[test]
    fn test_complete_rejects_bad_input() {
        let leaves = vec![leaf(&[(0, 0.0)]), leaf(&[(7, 1.0)])];
        assert!(matches!(
            HierarchyBuilder::new(3).complete(&leaves, 8),
            Err(Error::DimensionMismatch { expected: 3, found: 2 })
        ));
        assert!(matches!(
            HierarchyBuilder::new(2).complete(&leaves, 4),
            Err(Error::InvalidParameter { name: "n_points", .. })
        ));
        let no_ids = vec![Leaf::new(SphericalCf::new(1), vec![])];
        assert!(HierarchyBuilder::new(1).complete(&no_ids, 1).is_err());
    }
}
