//! Clustering features: additive sufficient statistics for point sets.
//!
//! A clustering feature (CF) summarizes a set of points by its weight `n`,
//! its mean `μ` and its centred second moments. Two features merge exactly:
//!
//! ```text
//! n  = n₁ + n₂
//! μ  = μ₁ + (μ₂ − μ₁) · n₂ / n
//! S  = S₁ + S₂ + (n₁ · n₂ / n) · (μ₂ − μ₁)²
//! ```
//!
//! so a tree of features can absorb a stream of points in one pass and still
//! answer centroid, variance and covariance queries for every subtree.
//!
//! ## Models
//!
//! | Model | Second moment | Memory per feature |
//! |-------|---------------|--------------------|
//! | [`SphericalModel`] | one scalar | `d + 2` |
//! | [`DiagonalModel`] | per dimension | `2d + 1` |
//! | [`FullCovarianceModel`] | `d × d` scatter | `d² + d + 1` |
//!
//! All three track centred moments (Welford updates) instead of the classic
//! BIRCH `(n, LS, SS)` triple, which suffers catastrophic cancellation when
//! the data is far from the origin.

mod diagonal;
mod full;
mod spherical;
mod traits;

pub use diagonal::{DiagonalCf, DiagonalModel};
pub use full::{FullCf, FullCovarianceModel};
pub use spherical::{SphericalCf, SphericalModel};
pub use traits::{CfModel, ClusteringFeature};

pub(crate) use traits::squared_euclidean;
