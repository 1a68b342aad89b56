//! Full-covariance multivariate Gaussian fitted to a point set.
//!
//! # The Density
//!
//! ```text
//! f(x) = c × exp(−½ (x − μ)ᵗ Σ⁻¹ (x − μ)),   c = 1 / √((2π)^d × det Σ)
//! ```
//!
//! μ is the arithmetic mean of the points and Σ the covariance with divisor
//! N (the biased estimator, not N − 1).
//!
//! # Failure Modes
//!
//! Nothing here validates its input. A single repeated point, or points on a
//! lower-dimensional subspace, give a singular Σ: det Σ ≈ 0, the coefficient
//! blows up and evaluation returns NaN or ∞. An empty set gives NaN means.
//! Callers check [`f64::is_finite`] on the result.

use crate::points::{BoundingBox, Point, PointSet};
use faer::prelude::*;
use faer::Mat;
use ndarray::{Array1, Array2, ArrayView1};
use std::f64::consts::PI;

/// A Gaussian over the points it owns.
///
/// Statistics are recomputed from the points on every call; [`fit`](Self::fit)
/// takes an immutable snapshot for repeated evaluation.
#[derive(Debug, Clone, Default)]
pub struct GaussianModel {
    data: PointSet,
}

impl GaussianModel {
    /// Create a model over `data`.
    pub fn new(data: PointSet) -> Self {
        Self { data }
    }

    /// The underlying points.
    pub fn data(&self) -> &PointSet {
        &self.data
    }

    /// Replace the underlying points. Existing snapshots are unaffected.
    pub fn set_data(&mut self, data: PointSet) {
        self.data = data;
    }

    /// Append a point to the underlying set.
    pub fn add(&mut self, point: Point) -> crate::Result<()> {
        self.data.add(point)
    }

    /// Dimension of the underlying points.
    pub fn dimension(&self) -> usize {
        self.data.dimension()
    }

    /// Arithmetic mean of all points.
    pub fn mean(&self) -> Array1<f64> {
        let d = self.dimension();
        let mut mean = Array1::zeros(d);
        for point in self.data.iter() {
            mean += &ArrayView1::from(point);
        }
        mean / self.data.count() as f64
    }

    /// Covariance with divisor N: Σ = (1/N) Σᵢ (xᵢ − μ)(xᵢ − μ)ᵗ.
    pub fn covariance(&self) -> Array2<f64> {
        let mean = self.mean();
        self.covariance_around(&mean)
    }

    fn covariance_around(&self, mean: &Array1<f64>) -> Array2<f64> {
        let d = mean.len();
        let mut cov = Array2::zeros((d, d));
        for point in self.data.iter() {
            let diff = &ArrayView1::from(point) - mean;
            for i in 0..d {
                for j in 0..d {
                    cov[[i, j]] += diff[i] * diff[j];
                }
            }
        }
        cov / self.data.count() as f64
    }

    /// Snapshot mean, covariance inverse and normalizing coefficient.
    pub fn fit(&self) -> FittedGaussian {
        let mean = self.mean();
        let covariance = self.covariance_around(&mean);
        let (cov_inverse, determinant) = inverse_and_determinant(&covariance);

        let d = mean.len() as i32;
        let coefficient = 1.0 / ((2.0 * PI).powi(d) * determinant).sqrt();

        FittedGaussian {
            mean,
            covariance,
            cov_inverse,
            determinant,
            coefficient,
        }
    }

    /// Density closure over a snapshot taken now.
    ///
    /// Later changes to the points do not affect the returned function.
    pub fn density_function(&self) -> impl Fn(&[f64]) -> f64 + Send + Sync + 'static {
        let fitted = self.fit();
        move |x: &[f64]| fitted.evaluate(x)
    }

    /// Per-dimension min/max of the points.
    pub fn bounding_box(&self) -> BoundingBox {
        self.data.bounding_box()
    }
}

impl From<PointSet> for GaussianModel {
    fn from(data: PointSet) -> Self {
        Self::new(data)
    }
}

/// Immutable fitted statistics of a [`GaussianModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct FittedGaussian {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    cov_inverse: Array2<f64>,
    determinant: f64,
    coefficient: f64,
}

impl FittedGaussian {
    /// Density at `x`.
    ///
    /// Returns NaN when `x` does not have the fitted dimension, and NaN or
    /// ∞ when the fit was degenerate.
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        if x.len() != self.mean.len() {
            return f64::NAN;
        }
        let diff = &ArrayView1::from(x) - &self.mean;
        let mahalanobis_sq = diff.dot(&self.cov_inverse.dot(&diff));
        self.coefficient * (-0.5 * mahalanobis_sq).exp()
    }

    /// Fitted dimension.
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Mean vector μ.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Covariance Σ.
    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Inverse covariance Σ⁻¹.
    pub fn cov_inverse(&self) -> &Array2<f64> {
        &self.cov_inverse
    }

    /// det Σ.
    pub fn determinant(&self) -> f64 {
        self.determinant
    }

    /// Normalizing coefficient 1 / √((2π)^d det Σ).
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Whether the coefficient and inverse are all finite.
    pub fn is_finite(&self) -> bool {
        self.coefficient.is_finite() && self.cov_inverse.iter().all(|v| v.is_finite())
    }
}

/// Σ⁻¹ and det Σ via LU with full pivoting. A singular Σ is not rejected;
/// its inverse comes back non-finite.
fn inverse_and_determinant(cov: &Array2<f64>) -> (Array2<f64>, f64) {
    let d = cov.nrows();
    if d == 0 {
        return (Array2::zeros((0, 0)), 1.0);
    }

    let mat = Mat::<f64>::from_fn(d, d, |i, j| cov[[i, j]]);
    let determinant = mat.determinant();
    let identity = Mat::<f64>::identity(d, d);
    let inverse = mat.full_piv_lu().solve(&identity);

    (
        Array2::from_shape_fn((d, d), |(i, j)| inverse[(i, j)]),
        determinant,
    )
}
