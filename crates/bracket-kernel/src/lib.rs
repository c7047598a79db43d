#![warn(missing_docs)]

//! Mesh CSG kernel for the bracket generator.
//!
//! Provides the [`Solid`] type, a closed polygon mesh combined with BSP
//! booleans, and the [`Engine`] handle that creates primitives and checks
//! that results are watertight.
//!
//! # Example
//!
//! ```
//! use bracket_kernel::{Engine, EngineConfig};
//!
//! let engine = Engine::init(EngineConfig::default()).unwrap();
//! let block = engine.cube(20.0, 10.0, 5.0).unwrap();
//! let hole = engine.cylinder(2.0, 7.0).unwrap().translate(10.0, 5.0, -1.0);
//! let part = block.difference(&hole);
//! let mesh = engine.verify(&part).unwrap();
//! assert!(mesh.volume() < 1000.0);
//! ```

pub mod bbox;
mod bsp;
pub mod engine;
pub mod math;
pub mod mesh;
pub mod section;

pub use bbox::BoundingBox;
pub use engine::{Engine, EngineConfig};
pub use math::{Point2, Point3, Transform, Vec2, Vec3};
pub use mesh::TriangleMesh;
pub use section::CrossSection;

use thiserror::Error;
use tracing::trace;

use bsp::{Node, Polygon, PLANE_EPSILON};

/// Errors from the CSG kernel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// The engine configuration is unusable.
    #[error("engine initialization failed: {0}")]
    EngineInit(String),
    /// A 2D contour has too few points or no area.
    #[error("degenerate cross-section: {0}")]
    DegenerateSection(String),
    /// A primitive was requested with a non-positive dimension.
    #[error("invalid primitive: {0}")]
    InvalidPrimitive(String),
    /// The mesh has edges not shared by exactly two triangles.
    #[error("non-manifold result: {boundary_edges} open edges")]
    NonManifold {
        /// Number of unpaired edges.
        boundary_edges: usize,
    },
    /// The solid has no volume.
    #[error("empty geometry")]
    EmptyGeometry,
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

/// A 3D solid: a closed set of convex, outward-facing polygons.
///
/// Solids are values. Every operation returns a new solid and leaves its
/// inputs untouched.
#[derive(Debug, Clone, Default)]
pub struct Solid {
    polygons: Vec<Polygon>,
}

impl Solid {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create an empty solid.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    /// Union of all `solids`, left to right.
    pub fn union_all(solids: impl IntoIterator<Item = Solid>) -> Solid {
        solids
            .into_iter()
            .fold(Solid::empty(), |acc, s| acc.union(&s))
    }

    // =========================================================================
    // CSG boolean operations
    // =========================================================================

    /// Boolean union (self ∪ other).
    pub fn union(&self, other: &Solid) -> Solid {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() || self.is_disjoint(other) {
            let mut polygons = self.polygons.clone();
            if !other.is_empty() {
                polygons.extend(other.polygons.iter().cloned());
            }
            return Solid { polygons };
        }
        let mut a = Node::new(self.polygons.clone());
        let mut b = Node::new(other.polygons.clone());
        a.clip_to(&b);
        b.clip_to(&a);
        b.invert();
        b.clip_to(&a);
        b.invert();
        a.build(b.all_polygons());
        self.finish("union", other, a.all_polygons())
    }

    /// Boolean difference (self − other).
    pub fn difference(&self, other: &Solid) -> Solid {
        if self.is_empty() || other.is_empty() || self.is_disjoint(other) {
            return self.clone();
        }
        let mut a = Node::new(self.polygons.clone());
        let mut b = Node::new(other.polygons.clone());
        a.invert();
        a.clip_to(&b);
        b.clip_to(&a);
        b.invert();
        b.clip_to(&a);
        b.invert();
        a.build(b.all_polygons());
        a.invert();
        self.finish("difference", other, a.all_polygons())
    }

    fn finish(&self, op: &str, other: &Solid, polygons: Vec<Polygon>) -> Solid {
        trace!(
            op,
            lhs = self.polygons.len(),
            rhs = other.polygons.len(),
            out = polygons.len(),
            "boolean"
        );
        Solid { polygons }
    }

    /// True if the bounding boxes are separated by more than the plane
    /// tolerance. Touching solids are not disjoint.
    fn is_disjoint(&self, other: &Solid) -> bool {
        match (self.bounding_box(), other.bounding_box()) {
            (Some(a), Some(b)) => !a.overlaps(&b, -PLANE_EPSILON),
            _ => true,
        }
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    /// Apply an affine transform. Mirroring transforms keep faces outward.
    pub fn transform(&self, t: &Transform) -> Solid {
        let flip = t.determinant() < 0.0;
        let polygons = self
            .polygons
            .iter()
            .filter_map(|p| {
                let mut vertices: Vec<Point3> = p.vertices.iter().map(|v| t.apply_point(v)).collect();
                if flip {
                    vertices.reverse();
                }
                Polygon::new(vertices)
            })
            .collect();
        Solid { polygons }
    }

    /// Translate by `(x, y, z)`.
    pub fn translate(&self, x: f64, y: f64, z: f64) -> Solid {
        self.transform(&Transform::translation(x, y, z))
    }

    /// Rotate by Euler angles in degrees: about X first, then Y, then Z.
    pub fn rotate(&self, x_deg: f64, y_deg: f64, z_deg: f64) -> Solid {
        self.transform(&Transform::euler_degrees(x_deg, y_deg, z_deg))
    }

    /// Reflect across the plane through the origin with the given normal.
    /// A zero normal leaves the solid unchanged.
    pub fn mirror(&self, normal: Vec3) -> Solid {
        match normal.try_normalize(1e-12) {
            Some(n) => self.transform(&Transform::mirror(&n)),
            None => self.clone(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// True if the solid has no faces.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Number of boundary polygons.
    pub fn num_polygons(&self) -> usize {
        self.polygons.len()
    }

    /// Bounding box, or `None` for an empty solid.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.polygons.iter().flat_map(|p| p.vertices.iter()))
    }

    /// Enclosed volume.
    pub fn volume(&self) -> f64 {
        self.polygons
            .iter()
            .map(|p| {
                let v0 = p.vertices[0].coords;
                p.vertices
                    .windows(2)
                    .skip(1)
                    .map(|w| v0.dot(&w[0].coords.cross(&w[1].coords)))
                    .sum::<f64>()
            })
            .sum::<f64>()
            / 6.0
    }

    /// Triangulate, welding vertices closer than `tolerance`.
    pub fn to_mesh(&self, tolerance: f64) -> TriangleMesh {
        TriangleMesh::from_polygons(&self.polygons, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine() -> Engine {
        Engine::init(EngineConfig {
            circular_segments: 16,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_difference_through_hole() {
        let e = engine();
        let block = e.cube(10.0, 10.0, 10.0).unwrap();
        let bar = e.cube(4.0, 4.0, 20.0).unwrap().translate(3.0, 3.0, -5.0);
        let result = block.difference(&bar);
        let mesh = e.verify(&result).unwrap();
        assert_relative_eq!(mesh.volume(), 1000.0 - 160.0, epsilon = 1e-6);
        assert_relative_eq!(result.volume(), 1000.0 - 160.0, epsilon = 1e-6);
    }

    #[test]
    fn test_union_of_overlapping_cubes() {
        let e = engine();
        let a = e.cube(10.0, 10.0, 10.0).unwrap();
        let b = a.translate(5.0, 5.0, 5.0);
        let mesh = e.verify(&a.union(&b)).unwrap();
        assert_relative_eq!(mesh.volume(), 2000.0 - 125.0, epsilon = 1e-6);
    }

    #[test]
    fn test_union_of_touching_cubes_fuses() {
        let e = engine();
        let a = e.cube(10.0, 10.0, 10.0).unwrap();
        // Shares the x = 10 face partially
        let b = e.cube(5.0, 4.0, 10.0).unwrap().translate(10.0, 6.0, 0.0);
        let fused = a.union(&b);
        let mesh = e.verify(&fused).unwrap();
        assert_relative_eq!(mesh.volume(), 1200.0, epsilon = 1e-6);
    }

    #[test]
    fn test_disjoint_union_keeps_both() {
        let e = engine();
        let a = e.cube(1.0, 1.0, 1.0).unwrap();
        let b = a.translate(5.0, 0.0, 0.0);
        let both = a.union(&b);
        assert_eq!(both.num_polygons(), 12);
        assert!(e.verify(&both).is_ok());
        assert_eq!(a.difference(&b).num_polygons(), 6);
    }

    #[test]
    fn test_mirror_keeps_orientation() {
        let e = engine();
        let a = e.cube(2.0, 3.0, 4.0).unwrap().translate(1.0, 0.0, 0.0);
        let m = a.mirror(Vec3::x());
        let b = m.bounding_box().unwrap();
        assert_relative_eq!(b.min.x, -3.0);
        assert_relative_eq!(b.max.x, -1.0);
        assert_relative_eq!(m.volume(), 24.0, epsilon = 1e-9);
        assert!(e.verify(&m).is_ok());
    }

    #[test]
    fn test_rotate_z_axis_onto_y() {
        let e = engine();
        let cyl = e.cylinder(1.0, 5.0).unwrap().rotate(-90.0, 0.0, 0.0);
        let b = cyl.bounding_box().unwrap();
        assert_relative_eq!(b.min.y, 0.0);
        assert_relative_eq!(b.max.y, 5.0);
        assert_relative_eq!(b.max.z - b.min.z, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let e = engine();
        let a = e.cube(3.0, 3.0, 3.0).unwrap();
        let b = a.translate(1.0, 1.0, 1.0);
        let before = a.num_polygons();
        let _ = a.difference(&b);
        assert_eq!(a.num_polygons(), before);
        assert_relative_eq!(a.volume(), 27.0, epsilon = 1e-9);
    }

    #[test]
    fn test_union_all() {
        let e = engine();
        let cubes = (0..3).map(|i| {
            e.cube(2.0, 2.0, 2.0)
                .unwrap()
                .translate(f64::from(i) * 1.5, 0.0, 0.0)
        });
        let mesh = e.verify(&Solid::union_all(cubes)).unwrap();
        assert_relative_eq!(mesh.volume(), 4.0 * 2.0 * 5.0, epsilon = 1e-6);
    }
}
