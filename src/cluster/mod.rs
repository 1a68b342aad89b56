//! K-means clustering with silhouette-based selection of k.
//!
//! ## Pieces
//!
//! - [`Kmeans`]: stateless Lloyd iteration over a matrix of points. Returns
//!   a [`Partition`] (labels, centroids, run statistics).
//! - [`ClusterEngine`]: borrows a source [`PointSet`](crate::PointSet),
//!   materializes clusters as owned point sets, and searches a range of k
//!   for the best average silhouette.
//!
//! ## Why silhouettes
//!
//! K-means needs k up front. The silhouette of a point compares how close it
//! sits to its own cluster against the nearest other cluster; averaged over
//! all points it rewards compact, well-separated partitions and penalizes
//! both merging distinct groups (small k) and splitting one group (large k).
//!
//! ## Usage
//!
//! ```rust
//! use gaussmix::cluster::ClusterEngine;
//! use gaussmix::PointSet;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let data = PointSet::from_rows(vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ])
//! .unwrap();
//!
//! let mut engine = ClusterEngine::new();
//! engine.set_source(&data);
//! engine.calculate(2, &mut StdRng::seed_from_u64(42)).unwrap();
//!
//! assert_eq!(engine.clusters().len(), 2);
//! assert_eq!(engine.clusters()[0].count(), 2);
//! ```

mod engine;
mod kmeans;

pub use engine::{CandidateScore, ClusterEngine, EngineState, Selection, SelectionConfig};
pub use kmeans::{Kmeans, Partition};
