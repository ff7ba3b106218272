//! Dense leaf-to-leaf distances for agglomerative clustering.

use crate::error::{Error, Result};
use crate::feature::ClusteringFeature;
use crate::metric::CfDistance;
use crate::tree::Leaf;

/// Largest number of leaves accepted by [`leaf_distance_matrix`].
pub const MAX_MATRIX_ITEMS: usize = 65_535;

/// Index of pair `(i, j)`, `i < j`, in a condensed upper-triangle matrix.
#[inline]
pub fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n);
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

/// Condensed upper-triangle matrix (row-major, `n·(n−1)/2` entries) of
/// leaf distances.
///
/// Metric values are squared; the matrix holds their square roots so that
/// linkage heights are on the scale of the data.
pub fn leaf_distance_matrix<F: ClusteringFeature>(
    leaves: &[Leaf<F>],
    metric: &dyn CfDistance<F>,
) -> Result<Vec<f64>> {
    let n = leaves.len();
    if n == 0 {
        return Err(Error::EmptyInput);
    }
    if n > MAX_MATRIX_ITEMS {
        return Err(Error::TooManyItems {
            n_items: n,
            max: MAX_MATRIX_ITEMS,
        });
    }
    let mut condensed = Vec::with_capacity(n * (n - 1) / 2);
    for (i, a) in leaves.iter().enumerate() {
        for b in &leaves[i + 1..] {
            condensed.push(metric.cf_distance(a.cf(), b.cf()).max(0.0).sqrt());
        }
    }
    Ok(condensed)
}
