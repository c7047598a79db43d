//! Axis-aligned bounding boxes.

use crate::math::{Point3, Vec3};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl BoundingBox {
    /// Smallest box containing all `points`, or `None` if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            bbox.min = bbox.min.inf(p);
            bbox.max = bbox.max.sup(p);
        }
        Some(bbox)
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// True if the boxes overlap by more than `eps` on every axis.
    ///
    /// Boxes that merely touch do not overlap.
    pub fn overlaps(&self, other: &BoundingBox, eps: f64) -> bool {
        (0..3).all(|i| self.min[i] + eps < other.max[i] && other.min[i] + eps < self.max[i])
    }

    /// Smallest box containing both.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// True if both corners match within `eps`.
    pub fn approx_eq(&self, other: &BoundingBox, eps: f64) -> bool {
        (self.min - other.min).amax() <= eps && (self.max - other.max).amax() <= eps
    }
}
