//! Configuration for building a CF-tree.

use crate::error::{Error, Result};

/// Heuristic used to re-estimate the threshold when the tree is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdHeuristic {
    /// Squared mean of the per-leaf nearest-sibling radii.
    #[default]
    Mean,
    /// Median of the per-leaf nearest-sibling estimates.
    Median,
}

impl ThresholdHeuristic {
    /// Estimate a squared threshold from per-leaf estimates.
    ///
    /// Infinite entries mark leaves without a sibling. Returns `None` when
    /// no finite estimate is available.
    pub fn estimate(self, estimates: &[f64]) -> Option<f64> {
        match self {
            ThresholdHeuristic::Mean => {
                let (sum, count) = estimates
                    .iter()
                    .filter(|t| t.is_finite())
                    .fold((0.0, 0usize), |(s, c), t| (s + t.max(0.0).sqrt(), c + 1));
                if count == 0 {
                    return None;
                }
                let t = sum / count as f64;
                Some(t * t)
            }
            ThresholdHeuristic::Median => {
                if estimates.is_empty() {
                    return None;
                }
                let mut sorted = estimates.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mut median = sorted.len() / 2;
                while sorted[median] == f64::INFINITY && median > 0 {
                    median -= 1;
                }
                Some(sorted[median]).filter(|t| t.is_finite())
            }
        }
    }
}

/// Cap on the number of leaves before the tree is condensed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxLeaves {
    /// Fixed number of leaves.
    Absolute(usize),
    /// Fraction of the number of input points.
    Relative(f64),
}

impl MaxLeaves {
    /// Interpret a raw value: at most 1 is a fraction, otherwise a count.
    pub fn from_f64(value: f64) -> Self {
        if value <= 1.0 {
            MaxLeaves::Relative(value)
        } else {
            MaxLeaves::Absolute(value as usize)
        }
    }

    /// Resolve against the number of input points.
    pub fn resolve(self, n_points: usize) -> usize {
        match self {
            MaxLeaves::Absolute(n) => n,
            MaxLeaves::Relative(f) => ((f * n_points as f64) as usize).max(1),
        }
    }
}

impl Default for MaxLeaves {
    fn default() -> Self {
        MaxLeaves::Relative(0.05)
    }
}

/// Configuration for building a CF-tree.
#[derive(Debug, Clone)]
pub struct CfTreeConfig {
    /// Initial absorption threshold (not squared).
    pub threshold: f64,
    /// Maximum number of children per node.
    pub branching_factor: usize,
    /// Leaf count that triggers a rebuild.
    pub max_leaves: MaxLeaves,
    /// Threshold re-estimation heuristic.
    pub heuristic: ThresholdHeuristic,
    /// Track the ids of the points in every leaf.
    pub store_ids: bool,
}

impl Default for CfTreeConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            branching_factor: 64,
            max_leaves: MaxLeaves::default(),
            heuristic: ThresholdHeuristic::default(),
            store_ids: true,
        }
    }
}

impl CfTreeConfig {
    /// Create a new tree configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the branching factor.
    pub fn with_branching_factor(mut self, branching_factor: usize) -> Self {
        self.branching_factor = branching_factor;
        self
    }

    /// Set the leaf cap.
    pub fn with_max_leaves(mut self, max_leaves: MaxLeaves) -> Self {
        self.max_leaves = max_leaves;
        self
    }

    /// Set the threshold heuristic.
    pub fn with_heuristic(mut self, heuristic: ThresholdHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Enable or disable membership tracking.
    pub fn with_store_ids(mut self, store_ids: bool) -> Self {
        self.store_ids = store_ids;
        self
    }

    /// Check parameter constraints.
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "threshold",
                message: "must be non-negative",
            });
        }
        if self.branching_factor < 2 {
            return Err(Error::InvalidParameter {
                name: "branching_factor",
                message: "must be at least 2",
            });
        }
        match self.max_leaves {
            MaxLeaves::Absolute(0) => Err(Error::InvalidParameter {
                name: "max_leaves",
                message: "must be positive",
            }),
            MaxLeaves::Relative(f) if !(f > 0.0) => Err(Error::InvalidParameter {
                name: "max_leaves",
                message: "must be positive",
            }),
            _ => Ok(()),
        }
    }
}
