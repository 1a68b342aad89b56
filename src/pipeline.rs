//! Points in, mixture out: cluster, fit one Gaussian per cluster, combine.

use crate::cluster::{ClusterEngine, Kmeans, Selection, SelectionConfig};
use crate::error::{Error, Result};
use crate::gaussian::GaussianModel;
use crate::mixture::MixtureModel;
use crate::points::PointSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Settings for [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// K-means run settings.
    pub kmeans: Kmeans,
    /// Range of k to search and whether to prune small clusters.
    pub selection: SelectionConfig,
    /// Weight given to every cluster's Gaussian.
    pub component_weight: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            kmeans: Kmeans::default(),
            selection: SelectionConfig::default(),
            component_weight: 1.0,
        }
    }
}

impl AnalysisConfig {
    /// Parse from JSON. Missing fields take their defaults; unknown fields
    /// are rejected.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| Error::Json { line: 1, source })
    }
}

/// Output of [`analyze`].
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Clusters kept after selection (and pruning, if enabled).
    pub clusters: Vec<PointSet>,
    /// Silhouettes of the kept clusters.
    pub silhouettes: Vec<Vec<f64>>,
    /// How k was chosen.
    pub selection: Selection,
    /// One Gaussian per kept cluster.
    pub mixture: MixtureModel,
}

/// Search k, fit a Gaussian to each resulting cluster and mix them.
pub fn analyze<R: Rng + ?Sized>(
    points: &PointSet,
    config: &AnalysisConfig,
    rng: &mut R,
) -> Result<Analysis> {
    tracing::info!(
        samples = points.count(),
        dimension = points.dimension(),
        min_k = config.selection.min_k,
        max_k = config.selection.max_k,
        "starting cluster analysis"
    );

    let mut engine = ClusterEngine::new()
        .with_kmeans(config.kmeans.clone())
        .with_selection(config.selection);
    engine.set_source(points);

    let selection = engine.select(rng)?;
    let silhouettes = engine.silhouettes();
    let clusters = engine.into_clusters();

    let mut mixture = MixtureModel::new();
    for (i, cluster) in clusters.iter().enumerate() {
        tracing::debug!(cluster = i, samples = cluster.count(), "fitting gaussian");
        let model = GaussianModel::new(cluster.clone());
        let fitted = model.fit();
        if !fitted.is_finite() {
            tracing::warn!(cluster = i, "degenerate covariance, density will be non-finite");
        }
        mixture.add_gaussian(model, config.component_weight);
    }

    Ok(Analysis {
        clusters,
        silhouettes,
        selection,
        mixture,
    })
}
