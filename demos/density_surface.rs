use gaussmix::{analyze, AnalysisConfig, Kmeans, PointSet, SelectionConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Three Gaussian blobs in 2D, then let the search recover them.
    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.4)?;

    let centers = [(0.0, 0.0), (6.0, 1.0), (2.0, 7.0)];
    let mut points = PointSet::new();
    for &(cx, cy) in &centers {
        for _ in 0..60 {
            let x: f64 = cx + rng.sample(noise);
            let y: f64 = cy + rng.sample(noise);
            points.add(vec![x, y])?;
        }
    }

    let config = AnalysisConfig {
        kmeans: Kmeans::default(),
        selection: SelectionConfig {
            min_k: 2,
            max_k: 6,
            prune_outliers: false,
        },
        component_weight: 1.0,
    };
    let analysis = analyze(&points, &config, &mut rng)?;

    for c in &analysis.selection.candidates {
        println!("k={} silhouette={:.3}", c.k, c.score);
    }
    println!("best k = {}", analysis.selection.best_k);

    let density = analysis.mixture.density();
    for &(cx, cy) in &centers {
        println!("density at ({cx}, {cy}) = {:.4}", density.evaluate(&[cx, cy]));
    }
    let bbox = analysis.mixture.bounding_box();
    println!("bounding box: {:?} -> {:?}", bbox.min, bbox.max);

    Ok(())
}
