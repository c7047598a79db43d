//! Build-plate fit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::params::BracketParams;

/// Printable area of a build plate (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateSize {
    /// Extent along X.
    pub width: f64,
    /// Extent along Y of the printer, which the bracket depth lies on.
    pub depth: f64,
}

impl Default for PlateSize {
    /// Bambu Lab X1C textured plate.
    fn default() -> Self {
        Self {
            width: 256.0,
            depth: 256.0,
        }
    }
}

impl PlateSize {
    /// Named printer plates.
    pub const PRESETS: [(&'static str, PlateSize); 5] = [
        ("x1c", PlateSize { width: 256.0, depth: 256.0 }),
        ("p1s", PlateSize { width: 256.0, depth: 256.0 }),
        ("a1-mini", PlateSize { width: 180.0, depth: 180.0 }),
        ("mk4", PlateSize { width: 250.0, depth: 210.0 }),
        ("ender3", PlateSize { width: 220.0, depth: 220.0 }),
    ];

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<PlateSize> {
        Self::PRESETS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, p)| *p)
    }
}

impl fmt::Display for PlateSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.depth)
    }
}

/// Error parsing a [`PlateSize`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid plate `{0}`: expected WIDTHxDEPTH or a preset name")]
pub struct PlateParseError(String);

impl FromStr for PlateSize {
    type Err = PlateParseError;

    /// Accepts `WIDTHxDEPTH` (e.g. `256x256`) or a preset name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(p) = Self::preset(s) {
            return Ok(p);
        }
        let err = || PlateParseError(s.to_string());
        let (w, d) = s.split_once(|c: char| c.eq_ignore_ascii_case(&'x')).ok_or_else(err)?;
        let width: f64 = w.trim().parse().map_err(|_| err())?;
        let depth: f64 = d.trim().parse().map_err(|_| err())?;
        if !(width > 0.0 && depth > 0.0 && width.is_finite() && depth.is_finite()) {
            return Err(err());
        }
        Ok(PlateSize { width, depth })
    }
}

/// Widest channel whose ears and walls still fit on a plate of
/// `plate_width`.
pub fn max_inner_width(ear_width: f64, bracket_thickness: f64, plate_width: f64) -> f64 {
    plate_width - 2.0 * ear_width - 2.0 * bracket_thickness
}

/// Reduce `params.width` so the bracket fits across `plate`.
///
/// Returns the original width if it was reduced.
pub fn clamp_to_plate(params: &mut BracketParams, plate: &PlateSize) -> Option<f64> {
    let max = max_inner_width(params.ear_width, params.bracket_thickness, plate.width);
    if params.width <= max {
        return None;
    }
    let original = params.width;
    params.width = max;
    warn!(original, clamped = max, plate = %plate, "width reduced to fit the plate");
    Some(original)
}

/// True if the bracket lies flat within `plate`.
pub fn fits(params: &BracketParams, plate: &PlateSize) -> bool {
    params.total_width() <= plate.width && params.depth <= plate.depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plate() {
        let plate = PlateSize::default();
        assert_eq!(plate.width, 256.0);
        assert_eq!(max_inner_width(10.0, 3.0, plate.width), 230.0);
        assert!(fits(&BracketParams::default(), &plate));
    }

    #[test]
    fn test_clamp_to_plate() {
        let mut p = BracketParams {
            width: 300.0,
            ..BracketParams::default()
        };
        let plate = PlateSize::default();
        assert!(!fits(&p, &plate));
        assert_eq!(clamp_to_plate(&mut p, &plate), Some(300.0));
        assert_eq!(p.width, 230.0);
        assert_eq!(p.total_width(), 256.0);
        assert!(fits(&p, &plate));
        assert_eq!(clamp_to_plate(&mut p, &plate), None);
    }

    #[test]
    fn test_parse_plate() {
        assert_eq!(
            "220x180".parse::<PlateSize>().unwrap(),
            PlateSize {
                width: 220.0,
                depth: 180.0
            }
        );
        assert_eq!(
            "A1-Mini".parse::<PlateSize>().unwrap().width,
            180.0
        );
        assert!("big".parse::<PlateSize>().is_err());
        assert!("0x10".parse::<PlateSize>().is_err());
    }

    #[test]
    fn test_depth_must_fit() {
        let p = BracketParams {
            depth: 300.0,
            ..BracketParams::default()
        };
        assert!(!fits(&p, &PlateSize::default()));
    }
}
