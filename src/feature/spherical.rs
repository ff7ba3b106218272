//! Clustering feature with a single isotropic variance.

use ndarray::Array2;

use super::traits::{CfModel, ClusteringFeature};

/// Feature storing weight, mean and one total sum of squared deviations.
///
/// The cheapest representation: variance is shared by all dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalCf {
    n: usize,
    mean: Vec<f64>,
    ssd: f64,
}

impl SphericalCf {
    /// Create an empty feature.
    pub fn new(dim: usize) -> Self {
        Self {
            n: 0,
            mean: vec![0.0; dim],
            ssd: 0.0,
        }
    }
}

impl ClusteringFeature for SphericalCf {
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
        self.ssd
    }

    fn variance(&self, _i: usize) -> f64 {
        match (self.n, self.dim()) {
            (0, _) | (_, 0) => 0.0,
            (n, d) => self.ssd / (n * d) as f64,
        }
    }

    fn covariance(&self) -> Array2<f64> {
        let d = self.dim();
        Array2::<f64>::eye(d) * self.variance(0)
    }

    fn add_point(&mut self, point: &[f64]) {
        debug_assert_eq!(point.len(), self.dim(), "dimensionality mismatch");
        self.n += 1;
        let f = 1.0 / self.n as f64;
        for (m, &x) in self.mean.iter_mut().zip(point) {
            let delta = x - *m;
            *m += delta * f;
            self.ssd += delta * (x - *m);
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
        let mut sq = 0.0;
        for (m, &o) in self.mean.iter_mut().zip(&other.mean) {
            let delta = o - *m;
            *m += delta * f;
            sq += delta * delta;
        }
        self.ssd += other.ssd + sq * g;
        self.n += other.n;
    }

    fn reset(&mut self) {
        self.n = 0;
        self.mean.fill(0.0);
        self.ssd = 0.0;
    }
}

/// Model producing [`SphericalCf`] features.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalModel;

impl CfModel for SphericalModel {
    type Feature = SphericalCf;

    fn make_leaf(&self, dim: usize) -> SphericalCf {
        SphericalCf::new(dim)
    }
}
