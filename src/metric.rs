//! Distances between points and clustering features.
//!
//! The tree consults two metrics:
//!
//! - a **selection** metric, to pick the nearest child during descent and to
//!   seed node splits;
//! - an **absorption** metric, compared against the squared threshold to
//!   decide whether a point may join an existing leaf.
//!
//! All values are *squared*, so they compare directly to `threshold²`.
//!
//! | Metric | Value for features a, b |
//! |--------|-------------------------|
//! | `CentroidEuclidean` | ‖μa − μb‖² |
//! | `CentroidManhattan` | (Σ \|μa − μb\|)² |
//! | `AverageIntercluster` | Sa/na + Sb/nb + ‖μa − μb‖² |
//! | `VarianceIncrease` | na·nb/(na+nb) · ‖μa − μb‖² |
//! | `Radius` | S(a ∪ b) / (na + nb) |
//! | `Diameter` | 2 · S(a ∪ b) / (na + nb − 1) |
//!
//! A point is treated as a feature of weight one and zero spread.

use core::fmt;

use crate::feature::{squared_euclidean, ClusteringFeature};

/// Pluggable distance between points and clustering features.
///
/// Values must be non-negative and symmetric in the feature arguments.
pub trait CfDistance<F: ClusteringFeature>: fmt::Debug + Send + Sync {
    /// Squared distance between a point and a feature.
    fn point_distance(&self, point: &[f64], cf: &F) -> f64;

    /// Squared distance between two features.
    fn cf_distance(&self, a: &F, b: &F) -> f64;

    /// Initial value of a feature with itself, for linkage schemes that
    /// seed clusters with a non-zero height.
    fn self_distance(&self, _cf: &F) -> f64 {
        0.0
    }
}

/// Built-in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Metric {
    /// Squared Euclidean distance of the centroids.
    CentroidEuclidean,
    /// Squared Manhattan distance of the centroids.
    CentroidManhattan,
    /// Average squared distance between members of the two sets.
    AverageIntercluster,
    /// Increase in total squared deviation when merging (Ward).
    #[default]
    VarianceIncrease,
    /// Squared radius of the merged set.
    Radius,
    /// Squared diameter of the merged set.
    Diameter,
}

/// Sum of squared deviations of the union of two weighted sets.
#[inline]
fn merged_ssd(n1: f64, s1: f64, n2: f64, s2: f64, sq: f64) -> f64 {
    let n = n1 + n2;
    if n == 0.0 {
        return 0.0;
    }
    s1 + s2 + n1 * n2 / n * sq
}

#[inline]
fn manhattan(a: &[f64], b: &[f64]) -> f64 {
    let d: f64 = a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum();
    d * d
}

#[inline]
fn spread(ssd: f64, n: f64) -> f64 {
    if n > 0.0 {
        ssd / n
    } else {
        0.0
    }
}

impl<F: ClusteringFeature> CfDistance<F> for Metric {
    fn point_distance(&self, point: &[f64], cf: &F) -> f64 {
        let n = cf.weight() as f64;
        let s = cf.ssd();
        match self {
            Metric::CentroidEuclidean => squared_euclidean(point, cf.mean()),
            Metric::CentroidManhattan => manhattan(point, cf.mean()),
            Metric::AverageIntercluster => spread(s, n) + squared_euclidean(point, cf.mean()),
            Metric::VarianceIncrease => n / (n + 1.0) * squared_euclidean(point, cf.mean()),
            Metric::Radius => {
                merged_ssd(n, s, 1.0, 0.0, squared_euclidean(point, cf.mean())) / (n + 1.0)
            }
            Metric::Diameter => {
                if n < 1.0 {
                    return 0.0;
                }
                2.0 * merged_ssd(n, s, 1.0, 0.0, squared_euclidean(point, cf.mean())) / n
            }
        }
    }

    fn cf_distance(&self, a: &F, b: &F) -> f64 {
        let (na, nb) = (a.weight() as f64, b.weight() as f64);
        match self {
            Metric::CentroidEuclidean => squared_euclidean(a.mean(), b.mean()),
            Metric::CentroidManhattan => manhattan(a.mean(), b.mean()),
            Metric::AverageIntercluster => {
                spread(a.ssd(), na) + spread(b.ssd(), nb) + squared_euclidean(a.mean(), b.mean())
            }
            Metric::VarianceIncrease => {
                if na + nb == 0.0 {
                    return 0.0;
                }
                na * nb / (na + nb) * squared_euclidean(a.mean(), b.mean())
            }
            Metric::Radius => spread(
                merged_ssd(na, a.ssd(), nb, b.ssd(), squared_euclidean(a.mean(), b.mean())),
                na + nb,
            ),
            Metric::Diameter => {
                if na + nb <= 1.0 {
                    return 0.0;
                }
                let s = merged_ssd(na, a.ssd(), nb, b.ssd(), squared_euclidean(a.mean(), b.mean()));
                2.0 * s / (na + nb - 1.0)
            }
        }
    }

    fn self_distance(&self, cf: &F) -> f64 {
        let n = cf.weight() as f64;
        match self {
            Metric::AverageIntercluster => 2.0 * spread(cf.ssd(), n),
            Metric::Radius => spread(cf.ssd(), n),
            Metric::Diameter if n > 1.0 => 2.0 * cf.ssd() / (n - 1.0),
            _ => 0.0,
        }
    }
}
