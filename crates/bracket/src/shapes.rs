//! Composite shapes built from kernel primitives.

use bracket_kernel::{CrossSection, Engine, KernelError, Solid};

/// Box `[w, h, d]` with its four edges parallel to Y rounded.
///
/// The radius is clamped to `min(radius, w/2, d/2)`; a radius of zero or
/// less gives a plain box. The result occupies `[0,w]×[0,h]×[0,d]`.
pub fn rounded_cube(engine: &Engine, size: [f64; 3], radius: f64) -> Result<Solid, KernelError> {
    let [w, h, d] = size;
    let r = radius.min(w / 2.0).min(d / 2.0);
    if r <= 0.0 {
        return engine.cube(w, h, d);
    }
    let post = engine.circle(r)?;
    let posts: Vec<CrossSection> = [(r, r), (w - r, r), (w - r, d - r), (r, d - r)]
        .iter()
        .map(|&(x, z)| post.translate(x, z))
        .collect();
    // Footprint drawn in (x, z); standing it up turns the extrusion into +Y.
    let footprint = CrossSection::hull(&posts)?;
    Ok(engine
        .extrude(&footprint, h)?
        .rotate(90.0, 0.0, 0.0)
        .translate(0.0, h, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bracket_kernel::EngineConfig;

    fn engine() -> Engine {
        Engine::init(EngineConfig {
            circular_segments: 32,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_occupies_its_size() {
        let e = engine();
        let s = rounded_cube(&e, [6.0, 2.0, 10.0], 1.5).unwrap();
        let b = s.bounding_box().unwrap();
        assert_relative_eq!(b.min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.max.x, 6.0, epsilon = 1e-9);
        assert_relative_eq!(b.min.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.max.y, 2.0, epsilon = 1e-9);
        assert_relative_eq!(b.min.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.max.z, 10.0, epsilon = 1e-9);
        assert!(s.volume() < 120.0);
        assert!(e.verify(&s).is_ok());
    }

    #[test]
    fn test_radius_clamped_to_footprint() {
        let e = engine();
        let s = rounded_cube(&e, [4.0, 1.0, 8.0], 100.0).unwrap();
        let b = s.bounding_box().unwrap();
        assert_relative_eq!(b.max.x - b.min.x, 4.0, epsilon = 1e-9);
        assert_relative_eq!(b.max.z - b.min.z, 8.0, epsilon = 1e-9);
        // Stadium: 4 x 4 rectangle plus a full circle of radius 2
        let stadium = 4.0 * 4.0 + std::f64::consts::PI * 4.0;
        assert!((s.volume() - stadium).abs() < 0.2);
    }

    #[test]
    fn test_zero_radius_is_a_box() {
        let e = engine();
        let s = rounded_cube(&e, [3.0, 4.0, 5.0], 0.0).unwrap();
        assert_relative_eq!(s.volume(), 60.0, epsilon = 1e-9);
    }
}
