//! K-means clustering.
//!
//! Partitions data into k clusters by relocating centroids until they stop
//! moving (Lloyd, 1957).
//!
//! # Lloyd's Algorithm
//!
//! 1. Draw k distinct samples uniformly at random as the initial centroids
//! 2. **Assign**: each point → nearest centroid (Euclidean; ties go to the
//!    lowest centroid index)
//! 3. **Update**: each centroid → mean of its assigned points
//! 4. Repeat until every centroid moves by at most `tol`, or the iteration
//!    count exceeds `max_iter`
//!
//! Hitting `max_iter` is not an error: the last assignment is returned.
//!
//! # Empty Clusters
//!
//! If an assignment leaves any centroid without points, all centroids are
//! discarded and k fresh samples are drawn. The iteration counter keeps
//! running. At most `max_reinit` redraws are made; past that the run fails
//! with [`Error::EmptyPartition`]. With distinct points the first
//! assignment after a draw is never empty (each centroid owns the sample it
//! was drawn from), so this only bites on data with many duplicates.
//!
//! # Restarts
//!
//! Lloyd finds a local optimum only. Each partition repeats the whole run
//! `n_init` times (10 by default) from fresh draws and keeps the one with
//! the lowest inertia (within-cluster sum of squared distances).
//!
//! # Randomness
//!
//! Every draw comes from the `rng` passed to [`Kmeans::partition`]. Nothing
//! here seeds or creates an RNG of its own.

use crate::error::{Error, Result};
use crate::points::PointSet;
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::prelude::*;
use rand::seq::index;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// K-means run settings. The cluster count is given per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Kmeans {
    /// Iteration cap.
    max_iter: usize,
    /// Convergence tolerance on per-centroid movement.
    tol: f64,
    /// Independent runs; the lowest-inertia one wins.
    n_init: usize,
    /// Centroid redraws allowed per run after an empty cluster.
    max_reinit: usize,
}

impl Default for Kmeans {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a single partition run.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Cluster label for every sample, in sample order.
    pub labels: Vec<usize>,
    /// Final centroids, one row per cluster.
    pub centroids: Array2<f64>,
    /// Assignment passes performed.
    pub iterations: usize,
    /// False when the run stopped at the iteration cap.
    pub converged: bool,
    /// Centroid redraws caused by empty clusters.
    pub reinits: usize,
    /// Within-cluster sum of squared distances to the centroids.
    pub inertia: f64,
}

impl Partition {
    /// Number of clusters.
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Copy the source points into one set per cluster, each in ascending
    /// source index order.
    pub fn materialize(&self, source: &PointSet) -> Result<Vec<PointSet>> {
        let mut clusters = vec![PointSet::new(); self.k()];
        for (point, &label) in source.iter().zip(&self.labels) {
            clusters[label].add(point.to_vec())?;
        }
        Ok(clusters)
    }
}

impl Kmeans {
    /// Default settings: 10000 iterations, tolerance 1e-4, 10 runs, 100
    /// redraws per run.
    pub fn new() -> Self {
        Self {
            max_iter: 10_000,
            tol: 1e-4,
            n_init: 10,
            max_reinit: 100,
        }
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the number of independent runs (at least 1).
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Set how many centroid redraws a run may make after empty clusters.
    pub fn with_max_reinit(mut self, max_reinit: usize) -> Self {
        self.max_reinit = max_reinit;
        self
    }

    /// Number of independent runs.
    pub fn n_init(&self) -> usize {
        self.n_init
    }

    /// Partition the rows of `data` into `k` clusters.
    ///
    /// `k` must be in `1..=data.nrows()`; callers clamp beforehand.
    pub fn partition<R: Rng + ?Sized>(
        &self,
        data: &Array2<f64>,
        k: usize,
        rng: &mut R,
    ) -> Result<Partition> {
        let n = data.nrows();
        if k == 0 || k > n {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: n,
            });
        }

        let mut best: Option<Partition> = None;
        let mut last_err = None;
        for run in 0..self.n_init.max(1) {
            match self.run_once(data.view(), k, rng) {
                Ok(p) => {
                    tracing::trace!(
                        run,
                        k,
                        inertia = p.inertia,
                        iterations = p.iterations,
                        "k-means run finished"
                    );
                    if best.as_ref().map_or(true, |b| p.inertia < b.inertia) {
                        best = Some(p);
                    }
                }
                Err(e) => last_err = Some(e),
            }
        }

        match (best, last_err) {
            (Some(p), _) => Ok(p),
            (None, Some(e)) => Err(e),
            (None, None) => Err(Error::EmptyPartition { attempts: 0 }),
        }
    }

    fn run_once<R: Rng + ?Sized>(
        &self,
        data: ArrayView2<'_, f64>,
        k: usize,
        rng: &mut R,
    ) -> Result<Partition> {
        let n = data.nrows();
        let d = data.ncols();

        let mut centroids = Self::draw_centroids(data, k, rng);
        let mut labels = vec![0usize; n];
        let mut counts = vec![0usize; k];
        let mut iterations = 0;
        let mut reinits = 0;
        let mut converged = false;

        loop {
            if iterations > self.max_iter {
                break;
            }
            iterations += 1;

            Self::assign(data, &centroids, &mut labels);

            counts.iter_mut().for_each(|c| *c = 0);
            for &label in &labels {
                counts[label] += 1;
            }

            if counts.contains(&0) {
                if reinits >= self.max_reinit {
                    return Err(Error::EmptyPartition {
                        attempts: reinits + 1,
                    });
                }
                reinits += 1;
                tracing::warn!(k, iteration = iterations, "empty cluster, redrawing centroids");
                centroids = Self::draw_centroids(data, k, rng);
                continue;
            }

            // Update step
            let mut new_centroids = Array2::zeros((k, d));
            for (i, &label) in labels.iter().enumerate() {
                for j in 0..d {
                    new_centroids[[label, j]] += data[[i, j]];
                }
            }
            for (c, &count) in counts.iter().enumerate() {
                for j in 0..d {
                    new_centroids[[c, j]] /= count as f64;
                }
            }

            let settled = (0..k).all(|c| {
                Self::squared_distance(&centroids.row(c), &new_centroids.row(c)).sqrt() <= self.tol
            });
            centroids = new_centroids;

            if settled {
                converged = true;
                break;
            }
        }

        // Cap reached right after a redraw.
        if counts.contains(&0) {
            return Err(Error::EmptyPartition {
                attempts: reinits + 1,
            });
        }

        let inertia = labels
            .iter()
            .enumerate()
            .map(|(i, &label)| Self::squared_distance(&data.row(i), &centroids.row(label)))
            .sum();

        Ok(Partition {
            labels,
            centroids,
            iterations,
            converged,
            reinits,
            inertia,
        })
    }

    /// k distinct rows drawn uniformly without replacement.
    fn draw_centroids<R: Rng + ?Sized>(
        data: ArrayView2<'_, f64>,
        k: usize,
        rng: &mut R,
    ) -> Array2<f64> {
        let mut centroids = Array2::zeros((k, data.ncols()));
        for (c, idx) in index::sample(rng, data.nrows(), k).iter().enumerate() {
            centroids.row_mut(c).assign(&data.row(idx));
        }
        centroids
    }

    /// Nearest centroid per row; strict `<` keeps the first minimum.
    fn assign(data: ArrayView2<'_, f64>, centroids: &Array2<f64>, labels: &mut [usize]) {
        let nearest = |i: usize| {
            let point = data.row(i);
            let mut best_cluster = 0;
            let mut best_dist = f64::INFINITY;
            for c in 0..centroids.nrows() {
                let dist = Self::squared_distance(&point, &centroids.row(c)).sqrt();
                if dist < best_dist {
                    best_dist = dist;
                    best_cluster = c;
                }
            }
            best_cluster
        };

        #[cfg(feature = "parallel")]
        {
            labels
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, label)| *label = nearest(i));
        }

        #[cfg(not(feature = "parallel"))]
        for (i, label) in labels.iter_mut().enumerate() {
            *label = nearest(i);
        }
    }

    /// Compute squared Euclidean distance.
    fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
    }
}
