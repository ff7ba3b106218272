//! Clustering-feature traits.

use core::fmt;

use ndarray::Array2;

use crate::metric::Metric;
use crate::tree::Node;

/// Mergeable sufficient statistics for a set of points.
///
/// Implementations keep the weight, the mean and centred second moments.
/// Merging two features must be exact: the merged weight is the sum of
/// weights, and every derived query equals the same query computed over the
/// union of the underlying points (up to floating-point rounding).
pub trait ClusteringFeature: Clone + fmt::Debug + Send + Sync {
    /// Dimensionality of the summarized points.
    fn dim(&self) -> usize;

    /// Number of aggregated points.
    fn weight(&self) -> usize;

    /// Mean of the aggregated points (all zeros while empty).
    fn mean(&self) -> &[f64];

    /// Mean along dimension `i`.
    fn centroid(&self, i: usize) -> f64 {
        self.mean()[i]
    }

    /// Total sum of squared deviations from the mean.
    fn ssd(&self) -> f64;

    /// Population variance along dimension `i`.
    fn variance(&self, i: usize) -> f64;

    /// Mean squared deviation from the centroid, summed over dimensions.
    fn total_variance(&self) -> f64 {
        match self.weight() {
            0 => 0.0,
            n => self.ssd() / n as f64,
        }
    }

    /// Population covariance matrix (`dim × dim`).
    fn covariance(&self) -> Array2<f64>;

    /// Add a single point.
    fn add_point(&mut self, point: &[f64]);

    /// Add all points summarized by `other`.
    fn merge(&mut self, other: &Self);

    /// Reset to the empty state, keeping the dimensionality.
    fn reset(&mut self);

    /// Whether no point has been added yet.
    fn is_empty(&self) -> bool {
        self.weight() == 0
    }
}

/// Factory for clustering features and tree nodes.
///
/// A model fixes the statistic representation used throughout one tree,
/// and names the metrics that suit it.
pub trait CfModel: Clone + fmt::Debug + Send + Sync {
    /// Feature type produced by this model.
    type Feature: ClusteringFeature;

    /// Create an empty leaf feature.
    fn make_leaf(&self, dim: usize) -> Self::Feature;

    /// Create an empty inner node.
    fn make_node(&self, dim: usize, capacity: usize) -> Node<Self::Feature> {
        Node::new(self.make_leaf(dim), capacity)
    }

    /// Default metric for nearest-child selection.
    fn distance(&self) -> Metric {
        Metric::VarianceIncrease
    }

    /// Default metric for the absorption test.
    fn absorption(&self) -> Metric {
        Metric::Radius
    }
}

/// Squared Euclidean distance between two equally long slices.
#[inline]
pub(crate) fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
