//! The engine handle: primitive construction and mesh verification.

use tracing::debug;

use crate::bsp::Polygon;
use crate::math::Point3;
use crate::mesh::TriangleMesh;
use crate::section::CrossSection;
use crate::{KernelError, Result, Solid};

/// Largest accepted weld tolerance (mm).
const MAX_WELD_TOLERANCE: f64 = 0.01;

/// Engine settings fixed at [`Engine::init`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of segments used to approximate a full circle.
    pub circular_segments: u32,
    /// Distance under which mesh vertices are merged (mm).
    pub weld_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            circular_segments: 64,
            weld_tolerance: 1e-5,
        }
    }
}

/// An initialized CSG engine.
///
/// Every primitive is created through an engine, so circle resolution and
/// tolerances travel with the handle instead of living in global state.
/// The handle is cheap to clone and can be shared across threads.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Validate `config` and create an engine.
    ///
    /// # Errors
    ///
    /// [`KernelError::EngineInit`] if the segment count is below 3 or the
    /// weld tolerance is not a small positive number.
    pub fn init(config: EngineConfig) -> Result<Self> {
        if config.circular_segments < 3 {
            return Err(KernelError::EngineInit(format!(
                "circular_segments must be at least 3, got {}",
                config.circular_segments
            )));
        }
        let tol = config.weld_tolerance;
        if !(tol.is_finite() && tol > 0.0 && tol <= MAX_WELD_TOLERANCE) {
            return Err(KernelError::EngineInit(format!(
                "weld_tolerance must be in (0, {MAX_WELD_TOLERANCE}], got {tol}"
            )));
        }
        debug!(
            segments = config.circular_segments,
            tolerance = tol,
            "engine initialized"
        );
        Ok(Self { config })
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    /// Box with its corner at the origin and dimensions `(sx, sy, sz)`.
    pub fn cube(&self, sx: f64, sy: f64, sz: f64) -> Result<Solid> {
        if !(is_positive(sx) && is_positive(sy)) {
            return Err(KernelError::InvalidPrimitive(format!(
                "cube {sx} x {sy} x {sz}"
            )));
        }
        self.extrude(&CrossSection::rectangle(sx, sy)?, sz)
    }

    /// Cylinder along +Z from `z = 0` to `z = height`.
    pub fn cylinder(&self, radius: f64, height: f64) -> Result<Solid> {
        if !is_positive(radius) {
            return Err(KernelError::InvalidPrimitive(format!(
                "cylinder radius {radius}"
            )));
        }
        self.extrude(&self.circle(radius)?, height)
    }

    /// Circle centered at the origin at the engine's resolution.
    pub fn circle(&self, radius: f64) -> Result<CrossSection> {
        CrossSection::circle(radius, self.config.circular_segments)
    }

    /// Extrude `section` along +Z from `z = 0` to `z = height`.
    pub fn extrude(&self, section: &CrossSection, height: f64) -> Result<Solid> {
        if !is_positive(height) {
            return Err(KernelError::InvalidPrimitive(format!(
                "extrusion height {height}"
            )));
        }
        let pts = section.points();
        let at = |i: usize, z: f64| Point3::new(pts[i].x, pts[i].y, z);

        let mut caps: Vec<Vec<Point3>> = if section.is_convex() {
            vec![(0..pts.len()).map(|i| at(i, height)).collect()]
        } else {
            section
                .triangulate()
                .into_iter()
                .map(|tri| tri.iter().map(|p| Point3::new(p.x, p.y, height)).collect())
                .collect()
        };
        // Bottom caps face -Z: same outline at z = 0, reversed.
        let bottoms: Vec<Vec<Point3>> = caps
            .iter()
            .map(|cap| {
                cap.iter()
                    .rev()
                    .map(|p| Point3::new(p.x, p.y, 0.0))
                    .collect()
            })
            .collect();
        caps.extend(bottoms);

        let n = pts.len();
        let sides = (0..n).map(|i| {
            let j = (i + 1) % n;
            vec![at(i, 0.0), at(j, 0.0), at(j, height), at(i, height)]
        });

        let polygons = caps
            .into_iter()
            .chain(sides)
            .filter_map(Polygon::new)
            .collect();
        Ok(Solid::from_polygons(polygons))
    }

    // =========================================================================
    // Meshing
    // =========================================================================

    /// Triangulate `solid` with this engine's weld tolerance.
    pub fn mesh(&self, solid: &Solid) -> TriangleMesh {
        solid.to_mesh(self.config.weld_tolerance)
    }

    /// Triangulate `solid` and check that the result is a closed, outward
    /// oriented surface.
    ///
    /// # Errors
    ///
    /// [`KernelError::EmptyGeometry`] for an empty or inside-out result and
    /// [`KernelError::NonManifold`] if any edge is not shared by exactly two
    /// triangles.
    pub fn verify(&self, solid: &Solid) -> Result<TriangleMesh> {
        let mesh = self.mesh(solid);
        if mesh.is_empty() {
            return Err(KernelError::EmptyGeometry);
        }
        let boundary_edges = mesh.boundary_edges();
        if boundary_edges > 0 {
            return Err(KernelError::NonManifold { boundary_edges });
        }
        if mesh.volume() <= 0.0 {
            return Err(KernelError::EmptyGeometry);
        }
        debug!(
            triangles = mesh.num_triangles(),
            vertices = mesh.num_vertices(),
            "mesh verified"
        );
        Ok(mesh)
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point2;

    fn engine() -> Engine {
        Engine::init(EngineConfig {
            circular_segments: 24,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_init_rejects_bad_config() {
        let few = EngineConfig {
            circular_segments: 2,
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::init(few), Err(KernelError::EngineInit(_))));
        let loose = EngineConfig {
            weld_tolerance: 1.0,
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::init(loose), Err(KernelError::EngineInit(_))));
        let nan = EngineConfig {
            weld_tolerance: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(Engine::init(nan).is_err());
    }

    #[test]
    fn test_cube_is_closed() {
        let e = engine();
        let cube = e.cube(10.0, 20.0, 30.0).unwrap();
        let mesh = e.verify(&cube).unwrap();
        assert_eq!(mesh.num_triangles(), 12);
        assert!((mesh.volume() - 6000.0).abs() < 1e-9);
        let b = cube.bounding_box().unwrap();
        assert_eq!(b.min, Point3::origin());
        assert_eq!(b.max, Point3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_cube_rejects_non_positive_size() {
        let e = engine();
        assert!(matches!(
            e.cube(0.0, 1.0, 1.0),
            Err(KernelError::InvalidPrimitive(_))
        ));
        assert!(e.cube(1.0, 1.0, -2.0).is_err());
        assert!(e.cylinder(-1.0, 5.0).is_err());
    }

    #[test]
    fn test_cylinder_volume() {
        let e = engine();
        let cyl = e.cylinder(2.0, 5.0).unwrap();
        let mesh = e.verify(&cyl).unwrap();
        // Inscribed 24-gon area
        let n = 24.0;
        let expected = 0.5 * n * 4.0 * (2.0 * std::f64::consts::PI / n).sin() * 5.0;
        assert!((mesh.volume() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_extrude_concave_section() {
        let e = engine();
        let l_shape = CrossSection::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ])
        .unwrap();
        let prism = e.extrude(&l_shape, 4.0).unwrap();
        let mesh = e.verify(&prism).unwrap();
        assert!((mesh.volume() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_verify_rejects_empty() {
        let e = engine();
        assert!(matches!(
            e.verify(&Solid::empty()),
            Err(KernelError::EmptyGeometry)
        ));
    }
}
