//! Point containers and axis-aligned bounding boxes.
//!
//! A [`PointSet`] is an ordered, append-only list of equal-length vectors.
//! The dimension of the set is the length of its first point; every later
//! point must match it.

use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A single sample. Its length is the working dimension.
pub type Point = Vec<f64>;

/// Ordered collection of fixed-dimension points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct PointSet {
    points: Vec<Point>,
}

impl PointSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create an empty set with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Build a set from rows, checking that all rows share one length.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut set = Self::new();
        for row in rows {
            set.add(row)?;
        }
        Ok(set)
    }

    /// Append a point.
    ///
    /// Fails with [`Error::DimensionMismatch`] when the set is non-empty and
    /// `point` has a different length than the points already stored.
    pub fn add(&mut self, point: Point) -> Result<()> {
        if let Some(first) = self.points.first() {
            if first.len() != point.len() {
                return Err(Error::DimensionMismatch {
                    expected: first.len(),
                    found: point.len(),
                });
            }
        }
        self.points.push(point);
        Ok(())
    }

    /// Number of points.
    pub fn count(&self) -> usize {
        self.points.len()
    }

    /// Whether the set holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Length of the first point, or 0 for an empty set.
    pub fn dimension(&self) -> usize {
        self.points.first().map_or(0, Vec::len)
    }

    /// Point at `index`, failing outside `[0, count)`.
    pub fn at(&self, index: usize) -> Result<&[f64]> {
        self.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.points.len(),
        })
    }

    /// Point at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&[f64]> {
        self.points.get(index).map(Vec::as_slice)
    }

    /// Iterate points in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.points.iter().map(Vec::as_slice)
    }

    /// Copy the points into an `n x d` matrix.
    pub fn to_array(&self) -> Array2<f64> {
        let n = self.count();
        let d = self.dimension();
        let mut arr = Array2::zeros((n, d));
        for (i, point) in self.points.iter().enumerate() {
            for (j, &x) in point.iter().enumerate() {
                arr[[i, j]] = x;
            }
        }
        arr
    }

    /// Per-dimension min/max over all points. Empty set gives an empty box.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut iter = self.points.iter();
        let Some(first) = iter.next() else {
            return BoundingBox::empty();
        };

        let mut min = first.clone();
        let mut max = first.clone();
        for point in iter {
            for (j, &x) in point.iter().enumerate() {
                if x < min[j] {
                    min[j] = x;
                }
                if x > max[j] {
                    max[j] = x;
                }
            }
        }
        BoundingBox { min, max }
    }
}

impl TryFrom<Vec<Point>> for PointSet {
    type Error = Error;

    fn try_from(rows: Vec<Point>) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<PointSet> for Vec<Point> {
    fn from(set: PointSet) -> Self {
        set.points
    }
}

/// Axis-aligned box given by per-dimension minima and maxima.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Lower corner.
    pub min: Vec<f64>,
    /// Upper corner.
    pub max: Vec<f64>,
}

impl BoundingBox {
    /// A box with no dimensions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.min.len()
    }

    /// Whether the box has no dimensions.
    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }

    /// Elementwise union: min of mins, max of maxes.
    ///
    /// An empty box is the identity. Boxes of different dimension are
    /// merged over the shared leading dimensions and keep the extra
    /// dimensions of the larger one.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let (mut out, smaller) = if self.dimension() >= other.dimension() {
            (self.clone(), other)
        } else {
            (other.clone(), self)
        };
        for j in 0..smaller.dimension() {
            out.min[j] = out.min[j].min(smaller.min[j]);
            out.max[j] = out.max[j].max(smaller.max[j]);
        }
        out
    }

    /// Whether `other` lies inside this box in every dimension.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        if other.is_empty() {
            return true;
        }
        if other.dimension() > self.dimension() {
            return false;
        }
        (0..other.dimension()).all(|j| self.min[j] <= other.min[j] && other.max[j] <= self.max[j])
    }

    /// Widen the leading dimensions named by `padding` by its margin on both sides.
    pub fn padded(&self, padding: BoxPadding) -> BoundingBox {
        let mut out = self.clone();
        let dims = padding.dimensions.min(out.dimension());
        for j in 0..dims {
            out.min[j] -= padding.margin;
            out.max[j] += padding.margin;
        }
        out
    }
}

/// Symmetric margin applied to the first `dimensions` axes of a box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxPadding {
    /// Number of leading dimensions to widen.
    pub dimensions: usize,
    /// Margin subtracted from the minimum and added to the maximum.
    pub margin: f64,
}

impl BoxPadding {
    /// Pad the first `dimensions` axes by `margin`.
    pub fn leading(dimensions: usize, margin: f64) -> Self {
        Self { dimensions, margin }
    }
}
