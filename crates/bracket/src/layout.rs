//! Screw hole placement along the ear.
//!
//! Holes keep a fixed padding from the ends of the ear, which the rib
//! distribution in [`crate::spacing`] does not; the two stay separate.

/// Minimum distance from either end of the ear to a hole center when there
/// is more than one hole.
pub fn edge_padding(hole_diameter: f64) -> f64 {
    (hole_diameter * 3.0).max(10.0)
}

/// Z centers of `hole_count` holes along an ear of `depth`.
///
/// One hole sits at the midpoint. More holes span from `edge_padding` to
/// `depth - edge_padding` at equal spacing. Zero holes yield no positions.
pub fn hole_positions(depth: f64, hole_diameter: f64, hole_count: u32) -> Vec<f64> {
    match hole_count {
        0 => Vec::new(),
        1 => vec![depth / 2.0],
        n => {
            let padding = edge_padding(hole_diameter);
            let spacing = (depth - 2.0 * padding) / f64::from(n - 1);
            (0..n).map(|i| padding + f64::from(i) * spacing).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_hole_centered() {
        assert_eq!(hole_positions(25.0, 2.0, 1), vec![12.5]);
    }

    #[test]
    fn test_padding_floor() {
        assert_eq!(edge_padding(2.0), 10.0);
        assert_eq!(edge_padding(5.0), 15.0);
    }

    #[test]
    fn test_multiple_holes_span_padding() {
        let z = hole_positions(100.0, 4.0, 4);
        assert_eq!(z.len(), 4);
        assert_eq!(z[0], 12.0);
        assert!((z[3] - 88.0).abs() < 1e-9);
        assert!((z[1] - z[0] - (z[2] - z[1])).abs() < 1e-12);
        assert!(z.iter().all(|&p| p > 0.0 && p < 100.0));
    }
}
