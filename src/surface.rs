//! Sampling a density over a 2-D slice of a bounding box.
//!
//! Two axes are swept on a regular grid; every other coordinate is held at
//! the value in a template point. The sweep starts at the box minimum and
//! stops before reaching the maximum, so the upper edge is not sampled.

use crate::error::{Error, Result};
use crate::points::BoundingBox;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Grid layout for [`sample_surface`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceGrid {
    /// Dimension swept by the outer loop.
    pub x_axis: usize,
    /// Dimension swept by the inner loop.
    pub y_axis: usize,
    /// Step along each swept axis.
    pub step: (f64, f64),
    /// Coordinates for the dimensions that are not swept. Its length is
    /// the dimension of the evaluated points.
    pub template: Vec<f64>,
}

impl Default for SurfaceGrid {
    fn default() -> Self {
        Self {
            x_axis: 0,
            y_axis: 1,
            step: (0.01, 0.01),
            template: vec![0.0, 0.0],
        }
    }
}

impl SurfaceGrid {
    /// Sweep dimensions 0 and 1 of `dimension`-length points.
    pub fn planar(dimension: usize, step: f64) -> Self {
        Self {
            x_axis: 0,
            y_axis: 1,
            step: (step, step),
            template: vec![0.0; dimension],
        }
    }

    /// Hold the non-swept dimensions at `template`.
    pub fn with_template(mut self, template: Vec<f64>) -> Self {
        self.template = template;
        self
    }

    fn validate(&self, bbox: &BoundingBox) -> Result<()> {
        if !(self.step.0 > 0.0 && self.step.1 > 0.0) {
            return Err(Error::InvalidParameter {
                name: "step",
                message: "must be positive",
            });
        }
        let needed = self.x_axis.max(self.y_axis) + 1;
        if self.template.len() < needed {
            return Err(Error::DimensionMismatch {
                expected: needed,
                found: self.template.len(),
            });
        }
        if bbox.dimension() < needed {
            return Err(Error::DimensionMismatch {
                expected: needed,
                found: bbox.dimension(),
            });
        }
        Ok(())
    }
}

/// One evaluated grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSample {
    /// Coordinate on the x axis.
    pub x: f64,
    /// Coordinate on the y axis.
    pub y: f64,
    /// Density at the point.
    pub value: f64,
}

/// Lazily evaluated grid, x outer and y inner. Created by [`sample_surface`].
#[derive(Debug, Clone)]
pub struct SurfaceSamples<F> {
    density: F,
    point: Vec<f64>,
    axes: (usize, usize),
    origin: (f64, f64),
    step: (f64, f64),
    ny: usize,
    next: usize,
    len: usize,
}

impl<F> Iterator for SurfaceSamples<F>
where
    F: Fn(&[f64]) -> f64,
{
    type Item = SurfaceSample;

    fn next(&mut self) -> Option<SurfaceSample> {
        if self.next >= self.len {
            return None;
        }
        let (i, j) = (self.next / self.ny, self.next % self.ny);
        self.next += 1;

        let x = self.origin.0 + i as f64 * self.step.0;
        let y = self.origin.1 + j as f64 * self.step.1;
        self.point[self.axes.0] = x;
        self.point[self.axes.1] = y;
        Some(SurfaceSample {
            x,
            y,
            value: (self.density)(&self.point),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl<F> ExactSizeIterator for SurfaceSamples<F> where F: Fn(&[f64]) -> f64 {}

/// Evaluate `density` over the grid spanned by `bbox` on the grid's axes.
///
/// Nothing is evaluated until the returned iterator is driven, so a fine
/// grid over a wide box costs time but no memory. A grid whose point count
/// does not fit in `usize` is rejected.
pub fn sample_surface<F>(density: F, bbox: &BoundingBox, grid: &SurfaceGrid) -> Result<SurfaceSamples<F>>
where
    F: Fn(&[f64]) -> f64,
{
    grid.validate(bbox)?;

    let (x_min, x_max) = (bbox.min[grid.x_axis], bbox.max[grid.x_axis]);
    let (y_min, y_max) = (bbox.min[grid.y_axis], bbox.max[grid.y_axis]);
    let nx = steps_below(x_min, x_max, grid.step.0)?;
    let ny = steps_below(y_min, y_max, grid.step.1)?;
    let len = nx.checked_mul(ny).ok_or(Error::InvalidParameter {
        name: "step",
        message: "grid has more points than fit in usize",
    })?;
    tracing::debug!(nx, ny, "sampling density surface");

    Ok(SurfaceSamples {
        density,
        point: grid.template.clone(),
        axes: (grid.x_axis, grid.y_axis),
        origin: (x_min, y_min),
        step: grid.step,
        ny,
        next: 0,
        len,
    })
}

/// Steps beyond this lose integer precision in `i as f64 * step`.
const MAX_STEPS: f64 = (1u64 << 53) as f64;

/// Count of `min + i * step` values strictly below `max`.
fn steps_below(min: f64, max: f64, step: f64) -> Result<usize> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Ok(0);
    }
    let steps = ((max - min) / step).ceil();
    if steps >= MAX_STEPS || steps > usize::MAX as f64 {
        return Err(Error::InvalidParameter {
            name: "step",
            message: "too small for the bounding box",
        });
    }
    let mut n = steps as usize;
    while n > 0 && min + (n - 1) as f64 * step >= max {
        n -= 1;
    }
    Ok(n)
}

/// Write one `x, y, value` line per sample as it arrives. Returns the
/// number of lines written.
pub fn write_surface<W, I>(mut writer: W, samples: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = SurfaceSample>,
{
    let mut written = 0;
    for s in samples {
        writeln!(writer, "{}, {}, {}", s.x, s.y, s.value)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingBox {
        BoundingBox {
            min: vec![0.0, 0.0, -5.0],
            max: vec![1.0, 0.5, 5.0],
        }
    }

    fn sampled<F: Fn(&[f64]) -> f64>(density: F, bbox: &BoundingBox, grid: &SurfaceGrid) -> Vec<SurfaceSample> {
        sample_surface(density, bbox, grid).unwrap().collect()
    }

    #[test]
    fn test_grid_excludes_upper_edge() {
        let grid = SurfaceGrid::planar(3, 0.25);
        let samples = sampled(|_| 1.0, &unit_box(), &grid);
        // x in {0, .25, .5, .75}, y in {0, .25}
        assert_eq!(samples.len(), 8);
        assert!(samples.iter().all(|s| s.x < 1.0 && s.y < 0.5));
        assert_eq!(samples[0].x, 0.0);
        assert_eq!(samples[1].y, 0.25);
    }

    #[test]
    fn test_template_holds_other_dims() {
        let grid = SurfaceGrid::planar(3, 0.5).with_template(vec![0.0, 0.0, -100.0]);
        let samples = sampled(|p| p[2], &unit_box(), &grid);
        assert!(samples.iter().all(|s| s.value == -100.0));
    }

    #[test]
    fn test_swapped_axes() {
        let grid = SurfaceGrid {
            x_axis: 2,
            y_axis: 0,
            step: (5.0, 0.5),
            template: vec![0.0; 3],
        };
        let samples = sampled(|p| p[0] + p[2], &unit_box(), &grid);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].x, -5.0);
        assert_eq!(samples[3].value, 0.0 + 0.5);
    }

    #[test]
    fn test_invalid_step() {
        let grid = SurfaceGrid::planar(3, 0.0);
        assert!(matches!(
            sample_surface(|_| 0.0, &unit_box(), &grid),
            Err(Error::InvalidParameter { name: "step", .. })
        ));
    }

    #[test]
    fn test_short_template() {
        let grid = SurfaceGrid::planar(1, 0.5);
        assert!(matches!(
            sample_surface(|_| 0.0, &unit_box(), &grid),
            Err(Error::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_degenerate_box_is_empty() {
        let bbox = BoundingBox {
            min: vec![1.0, 1.0],
            max: vec![1.0, 2.0],
        };
        let samples = sample_surface(|_| 0.0, &bbox, &SurfaceGrid::planar(2, 0.5)).unwrap();
        assert_eq!(samples.len(), 0);
    }

    #[test]
    fn test_write_surface_format() {
        let samples = vec![
            SurfaceSample {
                x: 0.0,
                y: 0.5,
                value: 1.25,
            },
            SurfaceSample {
                x: 1.0,
                y: 0.5,
                value: 0.0,
            },
        ];
        let mut out = Vec::new();
        assert_eq!(write_surface(&mut out, samples).unwrap(), 2);
        assert_eq!(String::from_utf8(out).unwrap(), "0, 0.5, 1.25\n1, 0.5, 0\n");
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let bbox = BoundingBox {
            min: vec![0.0, 0.0],
            max: vec![1e9, 1e9],
        };
        assert!(matches!(
            sample_surface(|_| 0.0, &bbox, &SurfaceGrid::planar(2, 0.01)),
            Err(Error::InvalidParameter { name: "step", .. })
        ));

        let bbox = BoundingBox {
            min: vec![0.0, 0.0],
            max: vec![1.0, 1.0],
        };
        assert!(matches!(
            sample_surface(|_| 0.0, &bbox, &SurfaceGrid::planar(2, 1e-300)),
            Err(Error::InvalidParameter { name: "step", .. })
        ));
    }

    #[test]
    fn test_large_grid_is_lazy() {
        let bbox = BoundingBox {
            min: vec![0.0, 0.0],
            max: vec![1e5, 1e5],
        };
        let samples = sample_surface(|p| p[0] + p[1], &bbox, &SurfaceGrid::planar(2, 0.01)).unwrap();
        assert!(samples.len() as u64 > 99_000_000_000_000);

        let first: Vec<SurfaceSample> = samples.take(3).collect();
        assert_eq!(first.len(), 3);
        assert_eq!((first[0].x, first[0].y), (0.0, 0.0));
        assert_eq!(first[2].x, 0.0);
        assert!((first[2].y - 0.02).abs() < 1e-12);
        assert!((first[2].value - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_streams_into_writer() {
        let bbox = BoundingBox {
            min: vec![0.0, 0.0],
            max: vec![1.0, 1.0],
        };
        let samples = sample_surface(|_| 2.0, &bbox, &SurfaceGrid::planar(2, 0.5)).unwrap();
        let mut out = Vec::new();
        assert_eq!(write_surface(&mut out, samples).unwrap(), 4);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|l| l.ends_with(", 2")));
    }
}
