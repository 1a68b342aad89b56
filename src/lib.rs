//! # gaussmix
//!
//! Density models over multi-dimensional samples, built automatically from
//! clusters.
//!
//! 1. [`cluster`]: k-means, with k chosen by average silhouette
//! 2. [`gaussian`]: one full-covariance Gaussian per cluster
//! 3. [`mixture`]: weighted sum of the Gaussians, plus a joint bounding box
//!
//! ```rust
//! use gaussmix::cluster::ClusterEngine;
//! use gaussmix::{GaussianModel, MixtureModel, PointSet};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut points = PointSet::new();
//! for (x, y) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.2)] {
//!     points.add(vec![x, y]).unwrap();
//!     points.add(vec![x + 10.0, y + 10.0]).unwrap();
//! }
//!
//! let mut engine = ClusterEngine::new();
//! engine.set_source(&points);
//! let selection = engine
//!     .calculate_range(2, 3, &mut StdRng::seed_from_u64(7))
//!     .unwrap();
//! assert_eq!(selection.best_k, 2);
//!
//! let mut mixture = MixtureModel::new();
//! for cluster in engine.clusters() {
//!     mixture.add_gaussian(GaussianModel::new(cluster.clone()), 1.0);
//! }
//! let density = mixture.density();
//! assert!(density.evaluate(&[0.5, 0.5]) > density.evaluate(&[5.0, 5.0]));
//! ```
//!
//! Densities are not normalized across the mixture and may exceed 1. A
//! degenerate cluster (for example one repeated point) yields NaN or ∞
//! rather than an error; check [`f64::is_finite`].

pub mod cluster;
/// Error types used across `gaussmix`.
pub mod error;
pub mod gaussian;
pub mod io;
pub mod metrics;
pub mod mixture;
pub mod pipeline;
pub mod points;
pub mod surface;

pub use cluster::{ClusterEngine, Kmeans, Selection, SelectionConfig};
pub use error::{Error, Result};
pub use gaussian::{FittedGaussian, GaussianModel};
pub use metrics::{dissimilarity, silhouette_average, silhouettes};
pub use mixture::{MixtureDensity, MixtureModel};
pub use pipeline::{analyze, Analysis, AnalysisConfig};
pub use points::{BoundingBox, BoxPadding, Point, PointSet};
pub use surface::{sample_surface, write_surface, SurfaceGrid, SurfaceSample, SurfaceSamples};
