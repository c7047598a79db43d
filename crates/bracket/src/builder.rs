//! The bracket builder: parameters in, one watertight solid out.
//!
//! Construction frame: the channel runs along Z from `z = 0` to `z = depth`,
//! opens toward +Y and has its outer wall at `x = 0`. Ears sit flush with
//! the top of the walls and the whole result is centered on X and Z at the
//! end.

use bracket_kernel::{CrossSection, Engine, KernelError, Point2, Solid, TriangleMesh, Vec3};
use thiserror::Error;
use tracing::{debug, info};

use crate::params::{BracketParams, ParamError, ValidParams};
use crate::shapes::rounded_cube;

/// Distance cutters extend past the faces they open, so no cutter face is
/// coplanar with a face it removes.
const CUT_CLEARANCE: f64 = 0.5;

/// Errors from building a bracket.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The parameters failed validation.
    #[error(transparent)]
    Params(#[from] ParamError),
    /// The kernel rejected an operation or the result is not watertight.
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// Intermediate solids of a build, in the final (centered) frame.
#[derive(Debug, Clone)]
pub struct BracketParts {
    /// U-shaped channel.
    pub shell: Solid,
    /// Ear on the -X side, holes cut.
    pub left_ear: Solid,
    /// Ear on the +X side, the mirror image of the left one.
    pub right_ear: Solid,
    /// Union of the hole cutters of the left ear, `None` if holes were
    /// omitted.
    pub hole_cutter: Option<Solid>,
}

impl BracketParts {
    fn translate(&self, x: f64, z: f64) -> Self {
        Self {
            shell: self.shell.translate(x, 0.0, z),
            left_ear: self.left_ear.translate(x, 0.0, z),
            right_ear: self.right_ear.translate(x, 0.0, z),
            hole_cutter: self.hole_cutter.as_ref().map(|c| c.translate(x, 0.0, z)),
        }
    }

    fn union(&self) -> Solid {
        self.shell.union(&self.left_ear).union(&self.right_ear)
    }
}

/// Validate `params` and build the bracket.
///
/// The result is verified watertight and centered on X and Z.
pub fn build(engine: &Engine, params: &BracketParams) -> Result<Solid, BuildError> {
    build_validated(engine, &params.validate()?)
}

/// Build from parameters that already passed validation.
pub fn build_validated(engine: &Engine, valid: &ValidParams) -> Result<Solid, BuildError> {
    build_mesh(engine, valid).map(|(solid, _)| solid)
}

/// Build from validated parameters and return the solid together with its
/// verified triangle mesh, ready for export.
pub fn build_mesh(
    engine: &Engine,
    valid: &ValidParams,
) -> Result<(Solid, TriangleMesh), BuildError> {
    let solid = assemble(engine, valid)?.union();
    let bbox = solid.bounding_box().ok_or(KernelError::EmptyGeometry)?;
    let center = bbox.center();
    let solid = solid.translate(-center.x, 0.0, -center.z);
    let mesh = engine.verify(&solid)?;
    info!(
        triangles = mesh.num_triangles(),
        volume = mesh.volume(),
        "bracket built"
    );
    Ok((solid, mesh))
}

/// Build the intermediate parts without the final union, centered the same
/// way [`build`] centers the bracket.
pub fn build_parts(engine: &Engine, params: &BracketParams) -> Result<BracketParts, BuildError> {
    let parts = assemble(engine, &params.validate()?)?;
    let bbox = [&parts.shell, &parts.left_ear, &parts.right_ear]
        .iter()
        .filter_map(|s| s.bounding_box())
        .reduce(|a, b| a.merge(&b))
        .ok_or(KernelError::EmptyGeometry)?;
    let center = bbox.center();
    Ok(parts.translate(-center.x, -center.z))
}

fn assemble(engine: &Engine, valid: &ValidParams) -> Result<BracketParts, BuildError> {
    let p = valid.params();
    let dims = valid.dimensions();

    let shell = shell(engine, p)?;
    let ear_body = ear_body(engine, valid)?;
    let cutter = hole_cutter(engine, valid)?;
    let ear = match &cutter {
        Some(c) => ear_body.difference(c),
        None => ear_body,
    };

    let left_offset = (-p.ear_width, dims.height_with_thickness);
    let left_ear = ear.translate(left_offset.0, left_offset.1, 0.0);
    let right_ear = left_ear
        .mirror(Vec3::x())
        .translate(dims.width_with_thickness, 0.0, 0.0);
    let hole_cutter = cutter.map(|c| c.translate(left_offset.0, left_offset.1, 0.0));

    debug!(
        shell = shell.num_polygons(),
        ear = left_ear.num_polygons(),
        "parts assembled"
    );
    Ok(BracketParts {
        shell,
        left_ear,
        right_ear,
        hole_cutter,
    })
}

/// U channel: outer box minus the inner cavity, open toward +Y.
fn shell(engine: &Engine, p: &BracketParams) -> Result<Solid, KernelError> {
    let t = p.bracket_thickness;
    let outer = engine.cube(p.width + 2.0 * t, p.height + 2.0 * t, p.depth)?;
    // The cavity starts behind z = 0; with a bottom it stops one wall short
    // of the far end.
    let z_end = if p.has_bottom {
        p.depth - t
    } else {
        p.depth + CUT_CLEARANCE
    };
    let cavity = engine
        .cube(
            p.width,
            p.height + t + CUT_CLEARANCE,
            z_end + CUT_CLEARANCE,
        )?
        .translate(t, t, -CUT_CLEARANCE);
    Ok(outer.difference(&cavity))
}

/// Ear plate plus ribs, in ear-local coordinates: the plate spans
/// `[0, earWidth] × [0, t] × [0, depth]` and ribs hang below it against
/// `x = earWidth`.
fn ear_body(engine: &Engine, valid: &ValidParams) -> Result<Solid, KernelError> {
    let p = valid.params();
    let dims = valid.dimensions();
    let plate = engine.cube(p.ear_width, dims.thickness, p.depth)?;
    if dims.rib_positions.is_empty() {
        return Ok(plate);
    }

    let rw = dims.rib_width;
    let rh = dims.rib_height;
    // Right angle at the corner where the ear meets the channel wall.
    let profile = CrossSection::new(vec![
        Point2::new(p.ear_width - rw, 0.0),
        Point2::new(p.ear_width, 0.0),
        Point2::new(p.ear_width, -rh),
    ])?;
    let rib = engine.extrude(&profile, p.ribbing_thickness)?;
    let ribs = dims.rib_positions.iter().map(|&z| rib.translate(0.0, 0.0, z));
    Ok(Solid::union_all(std::iter::once(plate).chain(ribs)))
}

/// Hole cutters in ear-local coordinates, or `None` if the ear is too small
/// for a hole.
///
/// Each cutter runs along Y through the plate and the ribs below it. A key
/// slot, half a diameter wide and one diameter long, extends from the hole
/// center toward +Z.
fn hole_cutter(engine: &Engine, valid: &ValidParams) -> Result<Option<Solid>, KernelError> {
    let p = valid.params();
    let dims = valid.dimensions();
    if dims.hole_diameter <= 0.0 || dims.hole_positions.is_empty() {
        return Ok(None);
    }
    let r = dims.hole_diameter / 2.0;
    let y0 = -dims.rib_height - CUT_CLEARANCE;
    let length = dims.thickness + dims.rib_height + 2.0 * CUT_CLEARANCE;
    let x = p.ear_width / 2.0;

    let bore = engine.cylinder(r, length)?.rotate(-90.0, 0.0, 0.0);
    let slot = if p.key_hole {
        Some(rounded_cube(engine, [r, length, 2.0 * r], r / 2.0)?)
    } else {
        None
    };

    let cutters = dims.hole_positions.iter().map(|&z| {
        let hole = bore.translate(x, y0, z);
        match &slot {
            Some(slot) => hole.union(&slot.translate(x - r / 2.0, y0, z)),
            None => hole,
        }
    });
    Ok(Some(Solid::union_all(cutters)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bracket_kernel::EngineConfig;

    fn engine() -> Engine {
        Engine::init(EngineConfig {
            circular_segments: 16,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    fn small() -> BracketParams {
        BracketParams {
            width: 40.0,
            depth: 25.0,
            height: 16.0,
            ..BracketParams::default()
        }
    }

    #[test]
    fn test_build_is_centered_and_watertight() {
        let e = engine();
        let solid = build(&e, &small()).unwrap();
        let b = solid.bounding_box().unwrap();
        assert_relative_eq!(b.min.x, -b.max.x, epsilon = 1e-9);
        assert_relative_eq!(b.min.z, -b.max.z, epsilon = 1e-9);
        assert_relative_eq!(b.max.x - b.min.x, small().total_width(), epsilon = 1e-9);
        assert_relative_eq!(b.max.z - b.min.z, 25.0, epsilon = 1e-9);
        // Y stays anchored at the channel floor
        assert_relative_eq!(b.min.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.max.y, 16.0 + 6.0, epsilon = 1e-9);
        assert!(e.verify(&solid).is_ok());
    }

    #[test]
    fn test_build_mesh_matches_solid() {
        let e = engine();
        let valid = small().validate().unwrap();
        let (solid, mesh) = build_mesh(&e, &valid).unwrap();
        assert_eq!(mesh, e.mesh(&solid));
        assert_eq!(mesh.boundary_edges(), 0);
        let b = mesh.bounding_box().unwrap();
        assert_relative_eq!(b.min.x, -b.max.x, epsilon = 1e-9);
        assert_relative_eq!(b.min.z, -b.max.z, epsilon = 1e-9);
        assert_relative_eq!(mesh.volume(), solid.volume(), epsilon = 1e-6);
    }

    #[test]
    fn test_shell_without_bottom_is_open_both_ends() {
        let e = engine();
        let p = BracketParams {
            ribbing_count: 0,
            ..small()
        };
        let s = shell(&e, &p).unwrap();
        let t = p.bracket_thickness;
        let outer = (p.width + 2.0 * t) * (p.height + 2.0 * t) * p.depth;
        let cavity = p.width * (p.height + t) * p.depth;
        assert_relative_eq!(s.volume(), outer - cavity, epsilon = 1e-6);
    }

    #[test]
    fn test_shell_with_bottom_has_end_wall() {
        let e = engine();
        let p = BracketParams {
            has_bottom: true,
            ..small()
        };
        let s = shell(&e, &p).unwrap();
        let t = p.bracket_thickness;
        let outer = (p.width + 2.0 * t) * (p.height + 2.0 * t) * p.depth;
        let cavity = p.width * (p.height + t) * (p.depth - t);
        assert_relative_eq!(s.volume(), outer - cavity, epsilon = 1e-6);
    }

    #[test]
    fn test_ribs_add_triangular_volume() {
        let e = engine();
        let valid = small().validate().unwrap();
        let dims = valid.dimensions();
        let body = ear_body(&e, &valid).unwrap();
        let plate = 10.0 * 3.0 * 25.0;
        let rib = 0.5 * dims.rib_width * dims.rib_height * 2.0;
        assert_relative_eq!(body.volume(), plate + 3.0 * rib, epsilon = 1e-6);
        assert!(e.verify(&body).is_ok());
    }

    #[test]
    fn test_key_slot_enlarges_cutter() {
        let e = engine();
        let plain = hole_cutter(&e, &small().validate().unwrap())
            .unwrap()
            .unwrap();
        let keyed = BracketParams {
            key_hole: true,
            ..small()
        };
        let keyed = hole_cutter(&e, &keyed.validate().unwrap())
            .unwrap()
            .unwrap();
        assert!(keyed.volume() > plain.volume());
        let pb = plain.bounding_box().unwrap();
        let kb = keyed.bounding_box().unwrap();
        // Slot runs one diameter past the center toward +Z
        assert_relative_eq!(kb.max.z, 12.5 + 2.0, epsilon = 1e-9);
        assert_relative_eq!(kb.min.z, pb.min.z, epsilon = 1e-9);
    }

    #[test]
    fn test_tiny_ear_has_no_cutter() {
        let e = engine();
        let p = BracketParams {
            ear_width: 2.0,
            ribbing_count: 0,
            ..small()
        };
        let parts = build_parts(&e, &p).unwrap();
        assert!(parts.hole_cutter.is_none());
        assert!(build(&e, &p).is_ok());
    }

    #[test]
    fn test_invalid_params_surface_as_build_error() {
        let e = engine();
        let p = BracketParams {
            width: -1.0,
            ..small()
        };
        assert!(matches!(build(&e, &p), Err(BuildError::Params(_))));
    }
}
