//! Pointer representation of a hierarchical clustering.
//!
//! Every point stores its parent, the distance at which it merged into the
//! parent and the step at which the merge happened:
//!
//! ```text
//! id      parent  distance  order
//! 0       0       +inf      -        <- root
//! 1       0       9.0       1
//! 2       0       1.0       0        <- merged inside a leaf
//! ```
//!
//! Cutting the hierarchy replays merges in order with a union-find.

use crate::error::{Error, Result};

/// A hierarchy over point ids, as produced by
/// [`HierarchyBuilder::complete`](super::HierarchyBuilder::complete).
#[derive(Debug, Clone, PartialEq)]
pub struct PointerHierarchy {
    parent: Vec<usize>,
    parent_distance: Vec<f64>,
    merge_order: Vec<usize>,
    cluster_size: Option<Vec<usize>>,
}

impl PointerHierarchy {
    /// Every point in its own cluster.
    pub(crate) fn singletons(n: usize, track_sizes: bool) -> Self {
        Self {
            parent: (0..n).collect(),
            parent_distance: vec![f64::INFINITY; n],
            merge_order: vec![usize::MAX; n],
            cluster_size: track_sizes.then(|| vec![1; n]),
        }
    }

    pub(crate) fn set(&mut self, id: usize, parent: usize, distance: f64, order: usize, size: usize) {
        self.parent[id] = parent;
        self.parent_distance[id] = distance;
        self.merge_order[id] = order;
        if let Some(sizes) = self.cluster_size.as_mut() {
            sizes[id] = size;
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Whether the hierarchy covers no points.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Parent of point `i` (itself for a root).
    pub fn parent(&self, i: usize) -> usize {
        self.parent[i]
    }

    /// Distance at which `i` merged into its parent (`+∞` for a root).
    pub fn parent_distance(&self, i: usize) -> f64 {
        self.parent_distance[i]
    }

    /// Merge step of `i` (`usize::MAX` for a root).
    pub fn merge_order(&self, i: usize) -> usize {
        self.merge_order[i]
    }

    /// All parent pointers.
    pub fn parents(&self) -> &[usize] {
        &self.parent
    }

    /// All parent distances.
    pub fn parent_distances(&self) -> &[f64] {
        &self.parent_distance
    }

    /// Size of the cluster formed when each point merged into its parent,
    /// if requested from the builder.
    pub fn cluster_sizes(&self) -> Option<&[usize]> {
        self.cluster_size.as_deref()
    }

    /// Points without a parent.
    pub fn roots(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.parent[i] == i).collect()
    }

    /// Whether all points are joined under a single root.
    pub fn is_complete(&self) -> bool {
        !self.is_empty() && self.roots().len() == 1
    }

    /// Linked points in merge order (ties broken by distance, then id).
    pub fn merge_sequence(&self) -> Vec<usize> {
        let mut seq: Vec<usize> = (0..self.len()).filter(|&i| self.parent[i] != i).collect();
        seq.sort_by(|&a, &b| {
            self.merge_order[a]
                .cmp(&self.merge_order[b])
                .then(self.parent_distance[a].total_cmp(&self.parent_distance[b]))
        });
        seq
    }

    /// Flat cluster labels after applying every merge at or below `threshold`.
    ///
    /// Labels are consecutive, numbered by first appearance.
    pub fn cut_at_distance(&self, threshold: f64) -> Vec<usize> {
        let mut sets = DisjointSets::new(self.len());
        for i in self.merge_sequence() {
            if self.parent_distance[i] <= threshold {
                sets.union(i, self.parent[i]);
            }
        }
        sets.labels()
    }

    /// Flat cluster labels for `k` clusters, applying the first `n − k` merges.
    pub fn cut_to_k(&self, k: usize) -> Result<Vec<usize>> {
        if k == 0 || k > self.len() {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be between 1 and the number of points",
            });
        }
        let mut sets = DisjointSets::new(self.len());
        for i in self.merge_sequence().into_iter().take(self.len() - k) {
            sets.union(i, self.parent[i]);
        }
        Ok(sets.labels())
    }
}

struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }

    fn labels(mut self) -> Vec<usize> {
        let n = self.parent.len();
        let mut label_of = vec![usize::MAX; n];
        let mut next = 0;
        (0..n)
            .map(|i| {
                let root = self.find(i);
                if label_of[root] == usize::MAX {
                    label_of[root] = next;
                    next += 1;
                }
                label_of[root]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 <- 1 (d 1, order 0), 2 <- 3 (d 2, order 1), 0 <- 2 (d 5, order 2)
    fn sample() -> PointerHierarchy {
        let mut h = PointerHierarchy::singletons(5, false);
        h.set(1, 0, 1.0, 0, 0);
        h.set(3, 2, 2.0, 1, 0);
        h.set(2, 0, 5.0, 2, 0);
        h
    }

    #[test]
    fn test_singletons() {
        let h = PointerHierarchy::singletons(3, true);
        assert_eq!(h.roots(), vec![0, 1, 2]);
        assert!(!h.is_complete());
        assert_eq!(h.cluster_sizes(), Some(&[1, 1, 1][..]));
        assert_eq!(h.cut_at_distance(f64::INFINITY), vec![0, 1, 2]);
    }

    #[test]
    fn test_merge_sequence() {
        assert_eq!(sample().merge_sequence(), vec![1, 3, 2]);
    }

    #[test]
    fn test_cut_at_distance() {
        let h = sample();
        assert_eq!(h.cut_at_distance(0.5), vec![0, 1, 2, 3, 4]);
        assert_eq!(h.cut_at_distance(2.0), vec![0, 0, 1, 1, 2]);
        assert_eq!(h.cut_at_distance(10.0), vec![0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_cut_to_k() {
        let h = sample();
        assert_eq!(h.cut_to_k(4).unwrap(), vec![0, 0, 1, 2, 3]);
        assert_eq!(h.cut_to_k(2).unwrap(), vec![0, 0, 0, 0, 1]);
        assert!(h.cut_to_k(0).is_err());
        assert!(h.cut_to_k(6).is_err());
    }
}
