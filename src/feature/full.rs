//! Clustering feature with a full covariance matrix.

use ndarray::{Array1, Array2, ArrayView1};

use super::traits::{CfModel, ClusteringFeature};

/// Feature storing weight, mean and the full scatter matrix.
///
/// Memory grows with `dim²`; use it when correlated dimensions matter to
/// downstream consumers (e.g. Gaussian mixture seeding).
#[derive(Debug, Clone, PartialEq)]
pub struct FullCf {
    n: usize,
    mean: Vec<f64>,
    scatter: Array2<f64>,
}

impl FullCf {
    /// Create an empty feature.
    pub fn new(dim: usize) -> Self {
        Self {
            n: 0,
            mean: vec![0.0; dim],
            scatter: Array2::zeros((dim, dim)),
        }
    }

    /// Sum of outer products of deviations from the mean.
    pub fn scatter(&self) -> &Array2<f64> {
        &self.scatter
    }

    fn add_outer(&mut self, delta: ArrayView1<'_, f64>, factor: f64) {
        let d = delta.len();
        for i in 0..d {
            let di = delta[i] * factor;
            for j in 0..d {
                self.scatter[[i, j]] += di * delta[j];
            }
        }
    }
}

impl ClusteringFeature for FullCf {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn weight(&self) -> usize {
        self.n
    }

    fn mean(&self) -> &[f64] {
        &self.mean
    }

    fn ssd(&self) -> f64 {
        self.scatter.diag().sum()
    }

    fn variance(&self, i: usize) -> f64 {
        match self.n {
            0 => 0.0,
            n => self.scatter[[i, i]] / n as f64,
        }
    }

    fn covariance(&self) -> Array2<f64> {
        match self.n {
            0 => Array2::zeros(self.scatter.raw_dim()),
            n => &self.scatter / n as f64,
        }
    }

    fn add_point(&mut self, point: &[f64]) {
        debug_assert_eq!(point.len(), self.dim(), "dimensionality mismatch");
        self.n += 1;
        let n = self.n as f64;
        let delta: Array1<f64> = point
            .iter()
            .zip(&self.mean)
            .map(|(x, m)| x - m)
            .collect();
        for (m, d) in self.mean.iter_mut().zip(delta.iter()) {
            *m += d / n;
        }
        // delta * (x - mean_new)ᵀ == (n - 1) / n * delta * deltaᵀ, kept symmetric.
        self.add_outer(delta.view(), (n - 1.0) / n);
    }

    fn merge(&mut self, other: &Self) {
        debug_assert_eq!(other.dim(), self.dim(), "dimensionality mismatch");
        if other.n == 0 {
            return;
        }
        if self.n == 0 {
            self.clone_from(other);
            return;
        }
        let (n1, n2) = (self.n as f64, other.n as f64);
        let n = n1 + n2;
        let delta: Array1<f64> = other
            .mean
            .iter()
            .zip(&self.mean)
            .map(|(o, m)| o - m)
            .collect();
        for (m, d) in self.mean.iter_mut().zip(delta.iter()) {
            *m += d * n2 / n;
        }
        self.scatter += &other.scatter;
        self.add_outer(delta.view(), n1 * n2 / n);
        self.n += other.n;
    }

    fn reset(&mut self) {
        self.n = 0;
        self.mean.fill(0.0);
        self.scatter.fill(0.0);
    }
}

/// Model producing [`FullCf`] features.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullCovarianceModel;

impl CfModel for FullCovarianceModel {
    type Feature = FullCf;

    fn make_leaf(&self, dim: usize) -> FullCf {
        FullCf::new(dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlated_covariance() {
        let mut cf = FullCf::new(2);
        for p in [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]] {
            cf.add_point(&p);
        }
        let cov = cf.covariance();
        // x and y are identical: all entries equal the variance 2/3
        for v in cov.iter() {
            assert!((v - 2.0 / 3.0).abs() < 1e-12);
        }
        assert!((cf.ssd() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_merge_matches_sequential() {
        let points = [[1.0, 5.0], [2.0, -1.0], [7.0, 3.0], [0.5, 0.5], [3.0, 3.0]];
        let mut all = FullCf::new(2);
        let mut a = FullCf::new(2);
        let mut b = FullCf::new(2);
        for (i, p) in points.iter().enumerate() {
            all.add_point(p);
            if i % 2 == 0 {
                a.add_point(p);
            } else {
                b.add_point(p);
            }
        }
        a.merge(&b);
        assert_eq!(a.weight(), 5);
        for (x, y) in a.scatter().iter().zip(all.scatter().iter()) {
            assert!((x - y).abs() < 1e-9);
        }
        assert!((a.scatter()[[0, 1]] - a.scatter()[[1, 0]]).abs() < 1e-12);
    }
}
