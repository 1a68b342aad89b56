//! Weighted mixtures of fitted Gaussians.
//!
//! ```text
//! f(x) = Σᵢ wᵢ × fᵢ(x)
//! ```
//!
//! The sum is not divided by Σ wᵢ, so the result does not integrate to 1
//! unless the weights already sum to 1. Weights are not validated.
//!
//! Each component's density is captured when it is added. Changing a
//! component's points afterwards has no effect until
//! [`MixtureModel::recalculate_density_functions`] is called.
//!
//! [`MixtureDensity::evaluate_stochastic`] is a different density, not a
//! faster version of the same one: it draws a single component with
//! probability proportional to its weight and returns only that
//! component's value.

use crate::gaussian::{FittedGaussian, GaussianModel};
use crate::points::{BoundingBox, BoxPadding};
use rand::Rng;

#[derive(Debug, Clone)]
struct Component {
    model: GaussianModel,
    weight: f64,
    density: FittedGaussian,
}

/// Ordered collection of weighted Gaussian models.
#[derive(Debug, Clone, Default)]
pub struct MixtureModel {
    components: Vec<Component>,
}

impl MixtureModel {
    /// Create an empty mixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component and capture its current density.
    pub fn add_gaussian(&mut self, model: GaussianModel, weight: f64) {
        let density = model.fit();
        self.components.push(Component {
            model,
            weight,
            density,
        });
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the mixture has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component models in insertion order.
    pub fn models(&self) -> impl Iterator<Item = &GaussianModel> + '_ {
        self.components.iter().map(|c| &c.model)
    }

    /// Component weights in insertion order.
    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.components.iter().map(|c| c.weight)
    }

    /// Mutable access to a component model. Call
    /// [`recalculate_density_functions`](Self::recalculate_density_functions)
    /// afterwards for the change to show up in densities.
    pub fn model_mut(&mut self, index: usize) -> Option<&mut GaussianModel> {
        self.components.get_mut(index).map(|c| &mut c.model)
    }

    /// Refit every component from its current points.
    pub fn recalculate_density_functions(&mut self) {
        for component in &mut self.components {
            component.density = component.model.fit();
        }
    }

    /// Snapshot of the weighted densities.
    pub fn density(&self) -> MixtureDensity {
        MixtureDensity {
            components: self
                .components
                .iter()
                .map(|c| (c.weight, c.density.clone()))
                .collect(),
        }
    }

    /// Weighted-sum density as a closure over a snapshot.
    pub fn density_function(&self) -> impl Fn(&[f64]) -> f64 + Send + Sync + 'static {
        let density = self.density();
        move |x: &[f64]| density.evaluate(x)
    }

    /// Union of the component boxes.
    pub fn bounding_box(&self) -> BoundingBox {
        self.components
            .iter()
            .fold(BoundingBox::empty(), |acc, c| acc.union(&c.model.bounding_box()))
    }

    /// Union of the component boxes, widened by `padding`.
    pub fn bounding_box_padded(&self, padding: BoxPadding) -> BoundingBox {
        self.bounding_box().padded(padding)
    }
}

/// Immutable weighted densities taken from a [`MixtureModel`].
#[derive(Debug, Clone, Default)]
pub struct MixtureDensity {
    components: Vec<(f64, FittedGaussian)>,
}

impl MixtureDensity {
    /// Σᵢ wᵢ × fᵢ(x). Zero when there are no components.
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.components
            .iter()
            .map(|(weight, density)| weight * density.evaluate(x))
            .sum()
    }

    /// Density of one component drawn with probability proportional to its
    /// weight. Zero when there are no components.
    pub fn evaluate_stochastic<R: Rng + ?Sized>(&self, x: &[f64], rng: &mut R) -> f64 {
        let total: f64 = self.components.iter().map(|(w, _)| w).sum();
        let Some((_, last)) = self.components.last() else {
            return 0.0;
        };

        let mut remaining = rng.random::<f64>() * total;
        for (weight, density) in &self.components {
            if remaining < *weight {
                return density.evaluate(x);
            }
            remaining -= weight;
        }
        // Rounding left a sliver past the last weight.
        last.evaluate(x)
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether there are no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
