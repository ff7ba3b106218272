//! The CF-tree: single-pass insertion, node splitting and condensation.

use std::sync::Arc;

use ndarray::Array2;
use tracing::{debug, info, warn};

use super::config::{CfTreeConfig, MaxLeaves, ThresholdHeuristic};
use super::iter::Leaves;
use super::node::{Entry, Leaf, Node};
use crate::error::{Error, Result};
use crate::feature::{CfModel, ClusteringFeature};
use crate::metric::CfDistance;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Counters collected while building a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Selection-metric evaluations.
    pub distance_evaluations: u64,
    /// Absorption-metric evaluations.
    pub absorption_evaluations: u64,
    /// Completed rebuilds.
    pub rebuilds: u64,
}

/// A BIRCH clustering-feature tree.
///
/// Points are inserted one at a time. Each either joins the nearest leaf,
/// when the absorption metric stays within `threshold²`, or opens a new leaf;
/// full nodes split and the tree grows at the root. When the number of
/// leaves exceeds the cap, [`CfTree::rebuild_if_needed`] raises the threshold
/// and re-inserts the leaves into a smaller tree.
///
/// ```rust
/// use cftree::{CfTree, CfTreeConfig, DiagonalModel, MaxLeaves};
///
/// let config = CfTreeConfig::new()
///     .with_branching_factor(4)
///     .with_max_leaves(MaxLeaves::Absolute(8));
/// let mut tree = CfTree::new(DiagonalModel, &config).unwrap();
/// for i in 0..100 {
///     tree.insert(&[i as f64, (i % 7) as f64]).unwrap();
///     tree.rebuild_if_needed().unwrap();
/// }
/// assert!(tree.leaf_count() <= 8);
/// let total: usize = tree.leaves().map(|leaf| leaf.weight()).sum();
/// assert_eq!(total, 100);
/// ```
#[derive(Debug, Clone)]
pub struct CfTree<M: CfModel> {
    model: M,
    dist: Arc<dyn CfDistance<M::Feature>>,
    abs: Arc<dyn CfDistance<M::Feature>>,
    threshold_sq: f64,
    capacity: usize,
    heuristic: ThresholdHeuristic,
    max_leaves: Option<usize>,
    store_ids: bool,
    pub(crate) root: Option<Node<M::Feature>>,
    leaves: usize,
    next_id: usize,
    stats: TreeStats,
}

/// Unit travelling down the tree: a raw point, or a whole leaf during rebuild.
enum Unit<'p, F> {
    Point { point: &'p [f64], id: usize },
    Feature(Leaf<F>),
}

impl<F: ClusteringFeature> Unit<'_, F> {
    fn dim(&self) -> usize {
        match self {
            Unit::Point { point, .. } => point.len(),
            Unit::Feature(leaf) => leaf.cf.dim(),
        }
    }

    fn merge_into(&self, cf: &mut F) {
        match self {
            Unit::Point { point, .. } => cf.add_point(point),
            Unit::Feature(leaf) => cf.merge(&leaf.cf),
        }
    }

    fn absorb_into(self, target: &mut Leaf<F>, store_ids: bool) {
        match self {
            Unit::Point { point, id } => {
                target.cf.add_point(point);
                if store_ids {
                    target.ids.push(id);
                }
            }
            Unit::Feature(leaf) => {
                target.cf.merge(&leaf.cf);
                target.ids.extend(leaf.ids);
            }
        }
    }
}

/// Borrowed view of the tree parameters used during one insertion.
struct Inserter<'a, M: CfModel> {
    model: &'a M,
    dist: &'a dyn CfDistance<M::Feature>,
    abs: &'a dyn CfDistance<M::Feature>,
    threshold_sq: f64,
    store_ids: bool,
    leaves: &'a mut usize,
    stats: &'a mut TreeStats,
}

impl<M: CfModel> Inserter<'_, M> {
    fn selection(&mut self, unit: &Unit<'_, M::Feature>, cf: &M::Feature) -> f64 {
        self.stats.distance_evaluations += 1;
        match unit {
            Unit::Point { point, .. } => self.dist.point_distance(point, cf),
            Unit::Feature(leaf) => self.dist.cf_distance(cf, &leaf.cf),
        }
    }

    fn absorption(&mut self, unit: &Unit<'_, M::Feature>, cf: &M::Feature) -> f64 {
        self.stats.absorption_evaluations += 1;
        match unit {
            Unit::Point { point, .. } => self.abs.point_distance(point, cf),
            Unit::Feature(leaf) => self.abs.cf_distance(cf, &leaf.cf),
        }
    }

    /// Index of the nearest child; the lowest index wins ties.
    fn nearest_child(&mut self, node: &Node<M::Feature>, unit: &Unit<'_, M::Feature>) -> usize {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, child) in node.children.iter().enumerate() {
            let d = self.selection(unit, child.cf());
            if i == 0 || d < best_d {
                best = i;
                best_d = d;
            }
        }
        best
    }

    fn new_leaf(&mut self, unit: Unit<'_, M::Feature>) -> Leaf<M::Feature> {
        *self.leaves += 1;
        match unit {
            Unit::Point { point, id } => {
                let mut cf = self.model.make_leaf(point.len());
                cf.add_point(point);
                let ids = if self.store_ids { vec![id] } else { Vec::new() };
                Leaf { cf, ids }
            }
            Unit::Feature(leaf) => leaf,
        }
    }

    /// Insert below `node`. Returns the new sibling if `node` was split.
    fn insert_into(
        &mut self,
        node: &mut Node<M::Feature>,
        unit: Unit<'_, M::Feature>,
    ) -> Option<Node<M::Feature>> {
        debug_assert!(!node.is_empty(), "unexpected empty node");
        // The aggregate includes the unit from here on; a split below
        // recomputes it from the children.
        unit.merge_into(&mut node.cf);
        let best = self.nearest_child(node, &unit);
        match &mut node.children[best] {
            Entry::Leaf(leaf) => {
                if self.absorption(&unit, &leaf.cf) <= self.threshold_sq {
                    unit.absorb_into(leaf, self.store_ids);
                    return None;
                }
            }
            Entry::Inner(child) => {
                let sibling = self.insert_into(child, unit)?;
                return self.add_or_split(node, Entry::Inner(sibling));
            }
        }
        let leaf = self.new_leaf(unit);
        self.add_or_split(node, Entry::Leaf(leaf))
    }

    fn add_or_split(
        &mut self,
        node: &mut Node<M::Feature>,
        entry: Entry<M::Feature>,
    ) -> Option<Node<M::Feature>> {
        if node.is_full() {
            Some(self.split(node, entry))
        } else {
            node.push(entry);
            None
        }
    }

    /// Split a full node plus one overflow entry into two nodes.
    ///
    /// The farthest pair of entries seeds the two halves; `node` keeps the
    /// first seed's half and the second half is returned.
    ///
    /// # Panics
    ///
    /// If `node` is not full.
    fn split(
        &mut self,
        node: &mut Node<M::Feature>,
        overflow: Entry<M::Feature>,
    ) -> Node<M::Feature> {
        let capacity = node.capacity();
        assert_eq!(
            node.len(),
            capacity,
            "split called on a node that is not full"
        );
        let mut entries = std::mem::take(&mut node.children);
        entries.push(overflow);
        let size = entries.len();

        let mut dists = Array2::<f64>::zeros((size, size));
        let (mut m1, mut m2) = (0, 1);
        let mut maxd = f64::NEG_INFINITY;
        for i in 0..size {
            for j in (i + 1)..size {
                self.stats.distance_evaluations += 1;
                let d = self.dist.cf_distance(entries[i].cf(), entries[j].cf());
                dists[[i, j]] = d;
                dists[[j, i]] = d;
                if d > maxd {
                    maxd = d;
                    m1 = i;
                    m2 = j;
                }
            }
        }

        node.cf.reset();
        node.children = Vec::with_capacity(capacity);
        let mut sibling = self.model.make_node(node.cf.dim(), capacity);
        for (i, entry) in entries.into_iter().enumerate() {
            let (d1, d2) = (dists[[m1, i]], dists[[m2, i]]);
            let first = i == m1
                || (i != m2 && (d1 < d2 || (d1 == d2 && node.len() <= sibling.len())));
            if first {
                node.add(entry);
            } else {
                sibling.add(entry);
            }
        }
        sibling
    }
}

impl<M: CfModel> CfTree<M> {
    /// Create an empty tree using the model's default metrics.
    ///
    /// A relative leaf cap cannot be resolved without knowing the input
    /// size; set it with [`CfTree::set_leaf_cap`] or use [`CfTree::build`].
    pub fn new(model: M, config: &CfTreeConfig) -> Result<Self> {
        config.validate()?;
        let dist: Arc<dyn CfDistance<M::Feature>> = Arc::new(model.distance());
        let abs: Arc<dyn CfDistance<M::Feature>> = Arc::new(model.absorption());
        let max_leaves = match config.max_leaves {
            MaxLeaves::Absolute(n) => Some(n),
            MaxLeaves::Relative(fraction) => {
                warn!(
                    fraction,
                    "relative leaf cap is unresolved; call set_leaf_cap or the tree never condenses"
                );
                None
            }
        };
        Ok(Self {
            model,
            dist,
            abs,
            threshold_sq: config.threshold * config.threshold,
            capacity: config.branching_factor,
            heuristic: config.heuristic,
            max_leaves,
            store_ids: config.store_ids,
            root: None,
            leaves: 0,
            next_id: 0,
            stats: TreeStats::default(),
        })
    }

    /// Replace the selection metric.
    pub fn with_distance(mut self, dist: Arc<dyn CfDistance<M::Feature>>) -> Self {
        self.dist = dist;
        self
    }

    /// Replace the absorption metric.
    pub fn with_absorption(mut self, abs: Arc<dyn CfDistance<M::Feature>>) -> Self {
        self.abs = abs;
        self
    }

    /// Set the leaf count above which [`CfTree::rebuild_if_needed`] condenses.
    pub fn set_leaf_cap(&mut self, max_leaves: usize) {
        self.max_leaves = Some(max_leaves);
    }

    /// Build a tree from a batch of points, condensing whenever the leaf cap
    /// is exceeded. Point `i` gets id `i`.
    pub fn build(model: M, config: &CfTreeConfig, points: &[Vec<f64>]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut tree = Self::new(model, config)?;
        tree.set_leaf_cap(config.max_leaves.resolve(points.len()));
        for point in points {
            tree.insert(point)?;
            tree.rebuild_if_needed()?;
        }
        info!(
            points = points.len(),
            leaves = tree.leaves,
            rebuilds = tree.stats.rebuilds,
            distance_evaluations = tree.stats.distance_evaluations,
            absorption_evaluations = tree.stats.absorption_evaluations,
            threshold = tree.threshold_sq.sqrt(),
            "built CF-tree"
        );
        Ok(tree)
    }

    /// Insert a point, assigning it the next sequential id.
    pub fn insert(&mut self, point: &[f64]) -> Result<()> {
        self.insert_with_id(self.next_id, point)
    }

    /// Insert a point under an explicit id.
    pub fn insert_with_id(&mut self, id: usize, point: &[f64]) -> Result<()> {
        if point.is_empty() {
            return Err(Error::EmptyInput);
        }
        if let Some(expected) = self.dim() {
            if point.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    found: point.len(),
                });
            }
        }
        self.next_id = self.next_id.max(id + 1);
        self.insert_unit(Unit::Point { point, id });
        Ok(())
    }

    fn insert_unit(&mut self, unit: Unit<'_, M::Feature>) {
        let dim = unit.dim();
        let Self {
            model,
            dist,
            abs,
            threshold_sq,
            capacity,
            store_ids,
            root,
            leaves,
            stats,
            ..
        } = self;
        let mut inserter = Inserter {
            model,
            dist: &**dist,
            abs: &**abs,
            threshold_sq: *threshold_sq,
            store_ids: *store_ids,
            leaves,
            stats,
        };
        let Some(mut current) = root.take() else {
            let leaf = inserter.new_leaf(unit);
            let mut node = model.make_node(dim, *capacity);
            node.add(Entry::Leaf(leaf));
            *root = Some(node);
            return;
        };
        if let Some(sibling) = inserter.insert_into(&mut current, unit) {
            let mut grown = model.make_node(dim, *capacity);
            grown.add(Entry::Inner(current));
            grown.add(Entry::Inner(sibling));
            current = grown;
        }
        *root = Some(current);
    }

    /// Condense the tree if the leaf cap is exceeded.
    ///
    /// Returns whether a rebuild happened.
    pub fn rebuild_if_needed(&mut self) -> Result<bool> {
        match self.max_leaves {
            Some(max) if self.leaves > max => {
                debug!(leaves = self.leaves, max, "compacting CF-tree");
                self.rebuild()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Raise the threshold and re-insert all leaves into a fresh tree.
    ///
    /// Each leaf contributes the absorption value to its nearest sibling
    /// leaf; the configured heuristic turns these into a new squared
    /// threshold, which never decreases. Leaves are then re-inserted in
    /// reverse collection order, merging their member ids on absorption.
    pub fn rebuild(&mut self) -> Result<()> {
        let Some(root) = self.root.take() else {
            return Ok(());
        };
        let before = self.leaves;
        let mut leaves = Vec::with_capacity(before);
        let mut estimates = Vec::with_capacity(before);
        collect_leaves(
            root,
            self.dist.as_ref(),
            self.abs.as_ref(),
            &mut self.stats,
            &mut leaves,
            &mut estimates,
        );

        if let Some(t) = self.heuristic.estimate(&estimates) {
            if t > self.threshold_sq {
                self.threshold_sq = t;
            }
        }
        debug!(threshold_sq = self.threshold_sq, "new squared threshold");

        self.leaves = 0;
        for leaf in leaves.into_iter().rev() {
            self.insert_unit(Unit::Feature(leaf));
        }
        self.stats.rebuilds += 1;

        if self.leaves > before {
            return Err(Error::CondenseFailed {
                before,
                after: self.leaves,
            });
        }
        Ok(())
    }

    /// Find the leaf a point would be assigned to, without modifying the tree.
    pub fn find_leaf(&self, point: &[f64]) -> Option<&Leaf<M::Feature>> {
        let mut node = self.root.as_ref()?;
        loop {
            let mut best = node.children.first()?;
            let mut best_d = self.dist.point_distance(point, best.cf());
            for child in &node.children[1..] {
                let d = self.dist.point_distance(point, child.cf());
                if d < best_d {
                    best = child;
                    best_d = d;
                }
            }
            match best {
                Entry::Leaf(leaf) => return Some(leaf),
                Entry::Inner(child) => node = child,
            }
        }
    }

    /// Lazy depth-first iterator over the leaf entries.
    pub fn leaves(&self) -> Leaves<'_, M::Feature> {
        Leaves::new(self.root.as_ref())
    }

    /// Consume the tree into its leaves, in depth-first order.
    pub fn into_leaves(self) -> Vec<Leaf<M::Feature>> {
        fn drain<F>(node: Node<F>, out: &mut Vec<Leaf<F>>) {
            for child in node.children {
                match child {
                    Entry::Leaf(leaf) => out.push(leaf),
                    Entry::Inner(inner) => drain(inner, out),
                }
            }
        }
        let mut out = Vec::with_capacity(self.leaves);
        if let Some(root) = self.root {
            drain(root, &mut out);
        }
        out
    }

    /// Number of leaf entries.
    pub fn leaf_count(&self) -> usize {
        self.leaves
    }

    /// Root node, if any point was inserted.
    pub fn root(&self) -> Option<&Node<M::Feature>> {
        self.root.as_ref()
    }

    /// Whether the tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of node levels (0 for an empty tree).
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, Node::height)
    }

    /// Dimensionality of the inserted points.
    pub fn dim(&self) -> Option<usize> {
        self.root.as_ref().map(|root| root.cf.dim())
    }

    /// Total number of inserted points.
    pub fn total_weight(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.cf.weight())
    }

    /// Current squared absorption threshold.
    pub fn threshold_sq(&self) -> f64 {
        self.threshold_sq
    }

    /// Maximum number of children per node.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Leaf cap, if resolved.
    pub fn leaf_cap(&self) -> Option<usize> {
        self.max_leaves
    }

    /// Whether leaves track member ids.
    pub fn stores_ids(&self) -> bool {
        self.store_ids
    }

    /// Build counters.
    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    /// The model used for new features.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Selection metric.
    pub fn distance(&self) -> &dyn CfDistance<M::Feature> {
        self.dist.as_ref()
    }

    /// Absorption metric.
    pub fn absorption(&self) -> &dyn CfDistance<M::Feature> {
        self.abs.as_ref()
    }
}

/// Move all leaves out of `node` (depth-first), recording for each the
/// absorption value to its nearest sibling leaf (`+∞` if it has none).
fn collect_leaves<F: ClusteringFeature>(
    node: Node<F>,
    dist: &dyn CfDistance<F>,
    abs: &dyn CfDistance<F>,
    stats: &mut TreeStats,
    leaves: &mut Vec<Leaf<F>>,
    estimates: &mut Vec<f64>,
) {
    let local = sibling_estimates(&node.children, dist, abs, stats);
    for (child, t) in node.children.into_iter().zip(local) {
        match child {
            Entry::Leaf(leaf) => {
                leaves.push(leaf);
                estimates.push(t);
            }
            Entry::Inner(inner) => collect_leaves(inner, dist, abs, stats, leaves, estimates),
        }
    }
}

fn sibling_estimates<F: ClusteringFeature>(
    children: &[Entry<F>],
    dist: &dyn CfDistance<F>,
    abs: &dyn CfDistance<F>,
    stats: &mut TreeStats,
) -> Vec<f64> {
    let mut out = vec![f64::INFINITY; children.len()];
    for (i, a) in children.iter().enumerate() {
        let Entry::Leaf(a) = a else { continue };
        let mut best: Option<(&Leaf<F>, f64)> = None;
        for (j, b) in children.iter().enumerate() {
            let Entry::Leaf(b) = b else { continue };
            if i == j {
                continue;
            }
            stats.distance_evaluations += 1;
            let d = dist.cf_distance(&a.cf, &b.cf);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((b, d));
            }
        }
        if let Some((b, _)) = best {
            stats.absorption_evaluations += 1;
            out[i] = abs.cf_distance(&a.cf, &b.cf);
        }
    }
    out
}

/// Build one tree per partition in parallel.
///
/// Trees share nothing; each gets ids local to its partition.
#[cfg(feature = "parallel")]
pub fn build_partitioned<M: CfModel>(
    model: &M,
    config: &CfTreeConfig,
    partitions: &[Vec<Vec<f64>>],
) -> Result<Vec<CfTree<M>>> {
    partitions
        .par_iter()
        .map(|points| CfTree::build(model.clone(), config, points))
        .collect()
}
