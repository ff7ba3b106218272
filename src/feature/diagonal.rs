//! Clustering feature with per-dimension variances.

use ndarray::Array2;

use super::traits::{CfModel, ClusteringFeature};

/// Feature storing weight, mean and per-dimension sums of squared deviations.
///
/// Updates follow Welford's scheme, so the statistics stay accurate even
/// for data far from the origin, where the classic `(n, LS, SS)` triple
/// loses precision to cancellation.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalCf {
    n: usize,
    mean: Vec<f64>,
    ssd: Vec<f64>,
}

impl DiagonalCf {
    /// Create an empty feature.
    pub fn new(dim: usize) -> Self {
        Self {
            n: 0,
            mean: vec![0.0; dim],
            ssd: vec![0.0; dim],
        }
    }

    /// Per-dimension sums of squared deviations.
    pub fn ssd_per_dim(&self) -> &[f64] {
        &self.ssd
    }
}

impl ClusteringFeature for DiagonalCf {
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
        self.ssd.iter().sum()
    }

    fn variance(&self, i: usize) -> f64 {
        match self.n {
            0 => 0.0,
            n => self.ssd[i] / n as f64,
        }
    }

    fn covariance(&self) -> Array2<f64> {
        let d = self.dim();
        let mut cov = Array2::zeros((d, d));
        for i in 0..d {
            cov[[i, i]] = self.variance(i);
        }
        cov
    }

    fn add_point(&mut self, point: &[f64]) {
        debug_assert_eq!(point.len(), self.dim(), "dimensionality mismatch");
        self.n += 1;
        let f = 1.0 / self.n as f64;
        for ((m, s), &x) in self.mean.iter_mut().zip(self.ssd.iter_mut()).zip(point) {
            let delta = x - *m;
            *m += delta * f;
            *s += delta * (x - *m);
        }
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
        let (f, g) = (n2 / n, n1 * n2 / n);
        for i in 0..self.dim() {
            let delta = other.mean[i] - self.mean[i];
            self.mean[i] += delta * f;
            self.ssd[i] += other.ssd[i] + delta * delta * g;
        }
        self.n += other.n;
    }

    fn reset(&mut self) {
        self.n = 0;
        self.mean.fill(0.0);
        self.ssd.fill(0.0);
    }
}

/// Model producing [`DiagonalCf`] features.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagonalModel;

impl CfModel for DiagonalModel {
    type Feature = DiagonalCf;

    fn make_leaf(&self, dim: usize) -> DiagonalCf {
        DiagonalCf::new(dim)
    }
}
