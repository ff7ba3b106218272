//! # cftree
//!
//! BIRCH-style clustering-feature trees: summarize a stream of points in one
//! pass and bounded memory, then cluster the summaries.
//!
//! ```text
//! Component          │ Role
//! ───────────────────┼──────────────────────────────────────────────
//! feature            │ additive sufficient statistics (n, μ, moments)
//! metric             │ selection and absorption distances
//! tree               │ insertion, node splits, threshold rebuilds
//! hierarchy          │ merges over leaves → hierarchy over point ids
//! ```
//!
//! ```rust
//! use cftree::{CfTree, CfTreeConfig, DiagonalModel, MaxLeaves};
//!
//! let points: Vec<Vec<f64>> = (0..200)
//!     .map(|i| vec![(i % 4) as f64 * 10.0 + (i as f64 * 0.37).sin(), (i / 50) as f64])
//!     .collect();
//! let config = CfTreeConfig::new()
//!     .with_branching_factor(8)
//!     .with_max_leaves(MaxLeaves::Absolute(16));
//! let tree = CfTree::build(DiagonalModel, &config, &points).unwrap();
//!
//! assert!(tree.leaf_count() <= 16);
//! assert_eq!(tree.total_weight(), 200);
//! ```
//!
//! Logging goes through `tracing`; install a subscriber to see rebuild and
//! build statistics.

/// Error types used across `cftree`.
pub mod error;
pub mod feature;
pub mod hierarchy;
pub mod metric;
pub mod tree;

pub use error::{Error, Result};
pub use feature::{
    CfModel, ClusteringFeature, DiagonalCf, DiagonalModel, FullCf, FullCovarianceModel,
    SphericalCf, SphericalModel,
};
pub use hierarchy::{leaf_distance_matrix, HierarchyBuilder, PointerHierarchy};
pub use metric::{CfDistance, Metric};
#[cfg(feature = "parallel")]
pub use tree::build_partitioned;
pub use tree::{
    CfTree, CfTreeConfig, Entry, Leaf, Leaves, MaxLeaves, Node, Severity, ThresholdHeuristic,
    TreeStats, ValidationIssue, ValidationReport,
};
