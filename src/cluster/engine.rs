//! Stateful cluster engine with silhouette-based choice of k.
//!
//! The engine borrows a source [`PointSet`], runs [`Kmeans`] on it and keeps
//! the resulting clusters as independent point sets. The source is never
//! modified.
//!
//! ```text
//! Unconfigured --set_source--> Ready --calculate--> Converged | Failed
//!                                ^                         |
//!                                +------- calculate -------+
//! ```
//!
//! # Choosing k
//!
//! [`ClusterEngine::calculate_range`] partitions once per candidate k and
//! scores that same partition by its average silhouette. The highest score
//! wins; equal scores keep the smaller k. The winning clustering is kept
//! as-is rather than recomputed, so the committed clusters are exactly the
//! ones that were scored.
//!
//! All randomness comes from the `rng` argument. Passing a seeded
//! `StdRng` makes every call reproducible.

use super::kmeans::{Kmeans, Partition};
use crate::error::{Error, Result};
use crate::metrics;
use crate::points::PointSet;
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lifecycle of a [`ClusterEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No source set.
    Unconfigured,
    /// Source set, nothing computed yet.
    Ready,
    /// Last calculation produced clusters.
    Converged {
        /// Number of clusters produced.
        k: usize,
        /// Assignment passes of the kept run.
        iterations: usize,
        /// False when the kept run stopped at the iteration cap.
        converged: bool,
    },
    /// Last calculation failed.
    Failed,
}

/// Candidate range and pruning for a k search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// Smallest candidate k.
    pub min_k: usize,
    /// Largest candidate k (inclusive).
    pub max_k: usize,
    /// Drop clusters with fewer than `N / (2.5 k)` members after selection.
    pub prune_outliers: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_k: 1,
            max_k: 5,
            prune_outliers: false,
        }
    }
}

/// Score of one candidate k.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Requested k.
    pub k: usize,
    /// Clusters actually produced (k clamped to the sample count).
    pub clusters: usize,
    /// Average silhouette of the candidate's partition.
    pub score: f64,
}

/// Result of a k search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Winning k.
    pub best_k: usize,
    /// Its average silhouette.
    pub best_score: f64,
    /// Every candidate in evaluation order.
    pub candidates: Vec<CandidateScore>,
    /// Samples dropped by outlier pruning.
    pub removed_outliers: usize,
}

struct Candidate {
    k: usize,
    partition: Partition,
    clusters: Vec<PointSet>,
    score: f64,
}

/// K-means engine over a borrowed source point set.
#[derive(Debug, Clone)]
pub struct ClusterEngine<'a> {
    kmeans: Kmeans,
    selection: SelectionConfig,
    source: Option<&'a PointSet>,
    clusters: Vec<PointSet>,
    state: EngineState,
}

impl Default for ClusterEngine<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ClusterEngine<'a> {
    /// Create an engine with default k-means settings and no source.
    pub fn new() -> Self {
        Self {
            kmeans: Kmeans::default(),
            selection: SelectionConfig::default(),
            source: None,
            clusters: Vec::new(),
            state: EngineState::Unconfigured,
        }
    }

    /// Use these k-means settings.
    pub fn with_kmeans(mut self, kmeans: Kmeans) -> Self {
        self.kmeans = kmeans;
        self
    }

    /// Use this k range for [`select`](Self::select), and its pruning flag
    /// for every k search.
    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Current selection settings.
    pub fn selection(&self) -> SelectionConfig {
        self.selection
    }

    /// Set the points to cluster. Clears previous clusters.
    pub fn set_source(&mut self, source: &'a PointSet) {
        self.source = Some(source);
        self.clusters.clear();
        self.state = EngineState::Ready;
    }

    /// The source, if set.
    pub fn source(&self) -> Option<&'a PointSet> {
        self.source
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Clusters from the last successful calculation.
    pub fn clusters(&self) -> &[PointSet] {
        &self.clusters
    }

    /// Take the clusters, leaving the engine with none.
    pub fn into_clusters(self) -> Vec<PointSet> {
        self.clusters
    }

    /// Partition the source into `k` clusters (clamped to the sample count).
    pub fn calculate<R: Rng + ?Sized>(&mut self, k: usize, rng: &mut R) -> Result<()> {
        let result = self.checked_source().and_then(|source| {
            let data = source.to_array();
            self.run(source, &data, k, rng)
        });

        match result {
            Ok((partition, clusters)) => {
                self.commit(&partition, clusters);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// [`calculate_range`](Self::calculate_range) over the configured
    /// `min_k..=max_k`.
    pub fn select<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Selection> {
        let SelectionConfig { min_k, max_k, .. } = self.selection;
        self.calculate_range(min_k, max_k, rng)
    }

    /// Try every k in `min_k..=max_k` and keep the one with the highest
    /// average silhouette.
    pub fn calculate_range<R: Rng + ?Sized>(
        &mut self,
        min_k: usize,
        max_k: usize,
        rng: &mut R,
    ) -> Result<Selection> {
        if min_k == 0 {
            return Err(self.fail(Error::InvalidParameter {
                name: "min_k",
                message: "must be > 0",
            }));
        }
        if min_k > max_k {
            return Err(self.fail(Error::InvalidParameter {
                name: "max_k",
                message: "must be >= min_k",
            }));
        }

        let source = match self.checked_source() {
            Ok(s) => s,
            Err(e) => return Err(self.fail(e)),
        };
        let data = source.to_array();

        let mut best: Option<Candidate> = None;
        let mut candidates = Vec::with_capacity(max_k - min_k + 1);
        for k in min_k..=max_k {
            let candidate = match self.evaluate_candidate(source, &data, k, rng) {
                Ok(c) => c,
                Err(e) => return Err(self.fail(e)),
            };
            tracing::debug!(k, score = candidate.score, "scored candidate");
            candidates.push(CandidateScore {
                k,
                clusters: candidate.clusters.len(),
                score: candidate.score,
            });

            let better = match &best {
                None => true,
                Some(b) => b.score.is_nan() || candidate.score > b.score,
            };
            if better {
                best = Some(candidate);
            }
        }

        let Some(winner) = best else {
            return Err(self.fail(Error::EmptyInput));
        };

        let mut clusters = winner.clusters;
        let mut removed_outliers = 0;
        if self.selection.prune_outliers {
            let min_samples = (source.count() as f64 / (2.5 * winner.k as f64)) as usize;
            let before: usize = clusters.iter().map(PointSet::count).sum();
            clusters.retain(|c| c.count() >= min_samples);
            removed_outliers = before - clusters.iter().map(PointSet::count).sum::<usize>();
            if removed_outliers > 0 {
                tracing::warn!(removed_outliers, min_samples, "pruned small clusters");
            }
            if clusters.is_empty() {
                return Err(self.fail(Error::NoClusters));
            }
        }

        tracing::info!(
            best_k = winner.k,
            score = winner.score,
            clusters = clusters.len(),
            "selected cluster count"
        );
        self.commit(&winner.partition, clusters);

        Ok(Selection {
            best_k: winner.k,
            best_score: winner.score,
            candidates,
            removed_outliers,
        })
    }

    /// Mean distance from `point` to every member of cluster `cluster`,
    /// the point itself included if it is a member.
    pub fn dissimilarity(&self, point: &[f64], cluster: usize) -> Result<f64> {
        let members = self.clusters.get(cluster).ok_or(Error::IndexOutOfRange {
            index: cluster,
            len: self.clusters.len(),
        })?;
        Ok(metrics::dissimilarity(point, members))
    }

    /// Silhouette of every point of the current clusters, grouped by cluster.
    pub fn silhouettes(&self) -> Vec<Vec<f64>> {
        metrics::silhouettes(&self.clusters)
    }

    /// Re-run [`calculate`](Self::calculate) with `k`, then average the
    /// silhouettes of the new clusters.
    ///
    /// Each call draws fresh centroids from `rng`, so two calls are scoring
    /// two different partitions.
    pub fn silhouette_average<R: Rng + ?Sized>(&mut self, k: usize, rng: &mut R) -> Result<f64> {
        self.calculate(k, rng)?;
        Ok(metrics::silhouette_average(&self.silhouettes()))
    }

    fn checked_source(&self) -> Result<&'a PointSet> {
        let source = self.source.ok_or(Error::NoSource)?;
        if source.is_empty() {
            return Err(Error::EmptyInput);
        }
        if source.dimension() == 0 {
            return Err(Error::ZeroDimension);
        }
        Ok(source)
    }

    fn run<R: Rng + ?Sized>(
        &self,
        source: &PointSet,
        data: &Array2<f64>,
        k: usize,
        rng: &mut R,
    ) -> Result<(Partition, Vec<PointSet>)> {
        if k == 0 {
            return Err(Error::InvalidClusterCount {
                requested: 0,
                n_items: source.count(),
            });
        }
        let k = k.min(source.count());

        let partition = self.kmeans.partition(data, k, rng)?;
        tracing::debug!(
            k,
            iterations = partition.iterations,
            converged = partition.converged,
            reinits = partition.reinits,
            "k-means finished"
        );
        let clusters = partition.materialize(source)?;
        Ok((partition, clusters))
    }

    fn evaluate_candidate<R: Rng + ?Sized>(
        &self,
        source: &PointSet,
        data: &Array2<f64>,
        k: usize,
        rng: &mut R,
    ) -> Result<Candidate> {
        let (partition, clusters) = self.run(source, data, k, rng)?;
        let score = metrics::silhouette_average(&metrics::silhouettes(&clusters));
        Ok(Candidate {
            k,
            partition,
            clusters,
            score,
        })
    }

    fn commit(&mut self, partition: &Partition, clusters: Vec<PointSet>) {
        self.state = EngineState::Converged {
            k: clusters.len(),
            iterations: partition.iterations,
            converged: partition.converged,
        };
        self.clusters = clusters;
    }

    fn fail(&mut self, err: Error) -> Error {
        tracing::debug!(error = %err, "cluster calculation failed");
        self.state = EngineState::Failed;
        self.clusters.clear();
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_blobs() -> PointSet {
        PointSet::from_rows(vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![10.0, 10.0],
            vec![10.0, 11.0],
            vec![11.0, 10.0],
        ])
        .unwrap()
    }

    /// 3x3 grids of spacing 0.5 around each center.
    fn grid_blobs(centers: &[(f64, f64)]) -> PointSet {
        let mut set = PointSet::new();
        for &(cx, cy) in centers {
            for i in 0..3 {
                for j in 0..3 {
                    set.add(vec![cx + 0.5 * i as f64, cy + 0.5 * j as f64])
                        .unwrap();
                }
            }
        }
        set
    }

    #[test]
    fn test_unconfigured_fails() {
        let mut engine = ClusterEngine::new();
        assert_eq!(engine.state(), EngineState::Unconfigured);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(engine.calculate(2, &mut rng), Err(Error::NoSource)));
        assert_eq!(engine.state(), EngineState::Failed);
    }

    #[test]
    fn test_empty_and_zero_dimension_sources_fail() {
        let mut rng = StdRng::seed_from_u64(0);

        let empty = PointSet::new();
        let mut engine = ClusterEngine::new();
        engine.set_source(&empty);
        assert_eq!(engine.state(), EngineState::Ready);
        assert!(matches!(engine.calculate(1, &mut rng), Err(Error::EmptyInput)));

        let flat = PointSet::from_rows(vec![vec![], vec![]]).unwrap();
        engine.set_source(&flat);
        assert!(matches!(
            engine.calculate(1, &mut rng),
            Err(Error::ZeroDimension)
        ));
        assert_eq!(engine.state(), EngineState::Failed);
    }

    #[test]
    fn test_zero_k_fails() {
        let data = two_blobs();
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            engine.calculate(0, &mut rng),
            Err(Error::InvalidClusterCount { requested: 0, .. })
        ));
    }

    #[test]
    fn test_two_blobs_are_separated() {
        let data = two_blobs();
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);
        let mut rng = StdRng::seed_from_u64(42);
        engine.calculate(2, &mut rng).unwrap();

        let clusters = engine.clusters();
        assert_eq!(clusters.len(), 2);
        for cluster in clusters {
            assert_eq!(cluster.count(), 3);
            let near_origin = cluster.iter().all(|p| p[0] < 5.0 && p[1] < 5.0);
            let near_ten = cluster.iter().all(|p| p[0] > 5.0 && p[1] > 5.0);
            assert!(near_origin || near_ten);
        }
        assert!(matches!(
            engine.state(),
            EngineState::Converged { k: 2, converged: true, .. }
        ));
        // Source untouched.
        assert_eq!(data.count(), 6);
    }

    #[test]
    fn test_k_clamped_to_sample_count() {
        let data = PointSet::from_rows(vec![vec![0.0], vec![5.0], vec![9.0]]).unwrap();
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);
        engine.calculate(10, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(engine.clusters().len(), 3);
        assert!(engine.clusters().iter().all(|c| c.count() == 1));
    }

    #[test]
    fn test_engine_is_reenterable() {
        let data = grid_blobs(&[(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)]);
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);
        let mut rng = StdRng::seed_from_u64(9);
        engine.calculate(2, &mut rng).unwrap();
        assert_eq!(engine.clusters().len(), 2);
        engine.calculate(4, &mut rng).unwrap();
        assert_eq!(engine.clusters().len(), 4);
    }

    #[test]
    fn test_dissimilarity_and_silhouettes() {
        let data = two_blobs();
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);
        engine.calculate(2, &mut StdRng::seed_from_u64(42)).unwrap();

        let first = engine.clusters()[0].at(0).unwrap().to_vec();
        let own = engine.dissimilarity(&first, 0).unwrap();
        let other = engine.dissimilarity(&first, 1).unwrap();
        assert!(own < other);
        assert!(matches!(
            engine.dissimilarity(&first, 2),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        ));

        let s = engine.silhouettes();
        assert_eq!(s.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3]);
        assert!(s.iter().flatten().all(|v| *v > 0.9));
    }

    #[test]
    fn test_silhouette_average_reruns() {
        let data = two_blobs();
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);
        let avg = engine
            .silhouette_average(2, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert!(avg > 0.9);
        assert_eq!(engine.clusters().len(), 2);
    }

    #[test]
    fn test_range_selects_three_blobs() {
        let data = grid_blobs(&[(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)]);
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);

        let selection = engine
            .calculate_range(2, 5, &mut StdRng::seed_from_u64(2024))
            .unwrap();

        assert_eq!(selection.best_k, 3);
        assert_eq!(selection.candidates.len(), 4);
        assert_eq!(engine.clusters().len(), 3);
        assert!(engine.clusters().iter().all(|c| c.count() == 9));
        let best = selection
            .candidates
            .iter()
            .find(|c| c.k == 3)
            .map(|c| c.score)
            .unwrap();
        assert_eq!(best, selection.best_score);
    }

    #[test]
    fn test_default_engine_selects_three_blobs_for_any_seed() {
        let data = grid_blobs(&[(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)]);
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);

        let wrong: Vec<(u64, usize)> = (0..200)
            .filter_map(|seed| {
                let selection = engine
                    .calculate_range(2, 5, &mut StdRng::seed_from_u64(seed))
                    .unwrap();
                (selection.best_k != 3).then_some((seed, selection.best_k))
            })
            .collect();
        assert!(wrong.is_empty(), "seeds picking k != 3: {wrong:?}");
    }

    #[test]
    fn test_select_uses_configured_range() {
        let data = grid_blobs(&[(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)]);
        let mut engine = ClusterEngine::new().with_selection(SelectionConfig {
            min_k: 2,
            max_k: 5,
            prune_outliers: false,
        });
        engine.set_source(&data);

        let selection = engine.select(&mut StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(selection.best_k, 3);
        assert_eq!(
            selection.candidates.iter().map(|c| c.k).collect::<Vec<_>>(),
            vec![2, 3, 4, 5]
        );
    }

    #[test]
    fn test_range_ties_keep_smaller_k() {
        // Every candidate clamps to one cluster per point; scores tie at 1.
        let data = PointSet::from_rows(vec![vec![0.0], vec![100.0]]).unwrap();
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);
        let selection = engine
            .calculate_range(2, 4, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(selection.best_k, 2);
    }

    #[test]
    fn test_range_rejects_bad_bounds() {
        let data = two_blobs();
        let mut engine = ClusterEngine::new();
        engine.set_source(&data);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            engine.calculate_range(0, 3, &mut rng),
            Err(Error::InvalidParameter { name: "min_k", .. })
        ));
        assert!(matches!(
            engine.calculate_range(4, 3, &mut rng),
            Err(Error::InvalidParameter { name: "max_k", .. })
        ));
    }

    #[test]
    fn test_outlier_pruning() {
        let mut data = PointSet::new();
        for i in 0..4 {
            for j in 0..5 {
                data.add(vec![0.25 * i as f64, 0.25 * j as f64]).unwrap();
            }
        }
        data.add(vec![50.0, 50.0]).unwrap();

        let mut plain = ClusterEngine::new();
        plain.set_source(&data);
        let sel = plain
            .calculate_range(2, 2, &mut StdRng::seed_from_u64(8))
            .unwrap();
        assert_eq!(sel.removed_outliers, 0);
        assert_eq!(plain.clusters().len(), 2);

        let mut pruning = ClusterEngine::new().with_selection(SelectionConfig {
            min_k: 2,
            max_k: 2,
            prune_outliers: true,
        });
        pruning.set_source(&data);
        let sel = pruning.select(&mut StdRng::seed_from_u64(8)).unwrap();
        // Threshold floor(21 / 5) = 4 drops the singleton.
        assert_eq!(sel.removed_outliers, 1);
        assert_eq!(pruning.clusters().len(), 1);
        assert_eq!(pruning.clusters()[0].count(), 20);
    }

    proptest! {
        #[test]
        fn cluster_sizes_sum_to_n(
            points in proptest::collection::hash_set((0i32..200, 0i32..200), 1..40),
            k in 1usize..12,
            seed in any::<u64>(),
        ) {
            let data = PointSet::from_rows(
                points.iter().map(|&(x, y)| vec![x as f64, y as f64]),
            ).unwrap();
            let mut engine = ClusterEngine::new();
            engine.set_source(&data);
            engine.calculate(k, &mut StdRng::seed_from_u64(seed)).unwrap();

            let total: usize = engine.clusters().iter().map(PointSet::count).sum();
            prop_assert_eq!(total, data.count());
            prop_assert_eq!(engine.clusters().len(), k.min(data.count()));
            prop_assert!(engine.clusters().iter().all(|c| !c.is_empty()));
        }
    }
}
