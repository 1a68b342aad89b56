//! Internal clustering quality metrics.
//!
//! These score a partition without ground-truth labels.
//!
//! | Metric | Range | Best |
//! |--------|-------|------|
//! | [`silhouettes`] | [-1, 1] per point | 1 |
//! | [`silhouette_average`] | [-1, 1] | 1 |
//! | [`inertia`] | [0, ∞) | 0 |
//!
//! # Silhouette
//!
//! For a point in cluster c:
//!
//! ```text
//! a = dissimilarity(point, c)
//! b = min over c' ≠ c of dissimilarity(point, c')
//!
//! s = 1 − a/b   if a < b
//!     b/a − 1   if a > b
//!     0         otherwise
//! ```
//!
//! [`dissimilarity`] is the mean distance to every member of a cluster,
//! the point itself included when it is a member. The usual textbook form
//! leaves the point out; this one does not, so a singleton cluster scores
//! a = 0 and s = 1.
//!
//! When there is only one cluster, b is undefined and s = 0.
//!
//! # References
//!
//! - Rousseeuw (1987). "Silhouettes: a graphical aid to the interpretation
//!   and validation of cluster analysis"

use crate::points::PointSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Euclidean distance between two equal-length slices.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Mean Euclidean distance from `point` to every member of `cluster`.
///
/// Includes the point itself if it is a member. An empty cluster gives NaN.
pub fn dissimilarity(point: &[f64], cluster: &PointSet) -> f64 {
    let total: f64 = cluster.iter().map(|member| euclidean(point, member)).sum();
    total / cluster.count() as f64
}

/// Silhouette value from own-cluster dissimilarity `a` and nearest
/// other-cluster dissimilarity `b`.
pub fn silhouette_value(a: f64, b: f64) -> f64 {
    if a < b {
        1.0 - a / b
    } else if a > b {
        b / a - 1.0
    } else {
        0.0
    }
}

/// Silhouette of every point, grouped by cluster in cluster and point order.
pub fn silhouettes(clusters: &[PointSet]) -> Vec<Vec<f64>> {
    #[cfg(feature = "parallel")]
    {
        (0..clusters.len())
            .into_par_iter()
            .map(|c| cluster_silhouettes(clusters, c))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..clusters.len())
            .map(|c| cluster_silhouettes(clusters, c))
            .collect()
    }
}

fn cluster_silhouettes(clusters: &[PointSet], c: usize) -> Vec<f64> {
    clusters[c]
        .iter()
        .map(|point| {
            let a = dissimilarity(point, &clusters[c]);
            let b = clusters
                .iter()
                .enumerate()
                .filter(|&(other, _)| other != c)
                .map(|(_, cluster)| dissimilarity(point, cluster))
                .fold(None, |best: Option<f64>, d| match best {
                    Some(b) if b <= d => Some(b),
                    _ => Some(d),
                });
            match b {
                Some(b) => silhouette_value(a, b),
                None => 0.0,
            }
        })
        .collect()
}

/// Mean over all silhouette values. NaN when there are none.
pub fn silhouette_average(silhouettes: &[Vec<f64>]) -> f64 {
    let (sum, count) = silhouettes
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), &s| (sum + s, count + 1));
    sum / count as f64
}

/// Within-cluster sum of squared distances to each cluster's mean.
pub fn inertia(clusters: &[PointSet]) -> f64 {
    clusters
        .iter()
        .filter(|c| !c.is_empty())
        .map(|cluster| {
            let d = cluster.dimension();
            let n = cluster.count() as f64;
            let mut mean = vec![0.0; d];
            for point in cluster.iter() {
                for (m, x) in mean.iter_mut().zip(point) {
                    *m += x;
                }
            }
            for m in &mut mean {
                *m /= n;
            }
            cluster
                .iter()
                .map(|point| euclidean(point, &mean).powi(2))
                .sum::<f64>()
        })
        .sum()
}
