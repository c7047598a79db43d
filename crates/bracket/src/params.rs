//! Bracket parameters: schema, parsing and validation.
//!
//! Parameters arrive either as typed documents (TOML/JSON through serde) or
//! as a flat map of form strings ([`RawParams`]). Both produce a
//! [`BracketParams`], which [`BracketParams::validate`] turns into
//! [`ValidParams`] carrying the derived [`Dimensions`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{layout, spacing};

/// Errors from parameter parsing and validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    /// A required field is absent.
    #[error("missing parameter `{0}`")]
    Missing(String),
    /// The key is not part of the schema.
    #[error("unknown parameter `{0}`")]
    UnknownKey(String),
    /// The value is not a finite decimal number.
    #[error("`{key}`: `{value}` is not a number")]
    InvalidNumber {
        /// Parameter key.
        key: String,
        /// Offending input.
        value: String,
    },
    /// A count was given with a fractional part.
    #[error("`{key}`: `{value}` is not a whole number")]
    NotAnInteger {
        /// Parameter key.
        key: String,
        /// Offending input.
        value: String,
    },
    /// A flag value other than on/off.
    #[error("`{key}`: `{value}` is not a flag (expected on/off)")]
    InvalidFlag {
        /// Parameter key.
        key: String,
        /// Offending input.
        value: String,
    },
    /// A length is zero, negative or not finite.
    #[error("`{key}` must be positive, got {value}")]
    NonPositive {
        /// Parameter key.
        key: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A count is below its minimum.
    #[error("`{key}` must be at least {min}, got {value}")]
    OutOfRange {
        /// Parameter key.
        key: String,
        /// Offending value.
        value: f64,
        /// Smallest accepted value.
        min: u32,
    },
    /// The ribs need more room than the depth provides.
    #[error("{count} ribs of {thickness} mm do not fit in a depth of {depth} mm")]
    RibbingDoesNotFit {
        /// Requested rib count.
        count: u32,
        /// Rib thickness (mm).
        thickness: f64,
        /// Bracket depth (mm).
        depth: f64,
    },
    /// The holes need more room than the depth provides.
    #[error("{count} holes need {padding} mm padding at each end, depth is only {depth} mm")]
    HolesDoNotFit {
        /// Requested hole count.
        count: u32,
        /// Edge padding per end (mm).
        padding: f64,
        /// Bracket depth (mm).
        depth: f64,
    },
    /// The end wall would consume the whole depth.
    #[error("a {thickness} mm end wall does not fit in a depth of {depth} mm")]
    WallTooThick {
        /// Wall thickness (mm).
        thickness: f64,
        /// Bracket depth (mm).
        depth: f64,
    },
    /// The spacing solver was asked to place nothing.
    #[error("cannot distribute zero items")]
    NoItems,
}

// =============================================================================
// Schema
// =============================================================================

/// How a field's string value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// Positive length in millimeters.
    Length,
    /// Whole number with a lower bound.
    Count {
        /// Smallest accepted value.
        min: u32,
    },
    /// Boolean; a form checkbox sends `on` when ticked and nothing otherwise.
    Flag,
}

/// One entry of the parameter schema.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Field {
    /// Key used in forms, TOML and JSON.
    pub key: &'static str,
    /// Human readable label.
    pub label: &'static str,
    /// Value kind.
    pub kind: FieldKind,
}

/// The parameter schema, in form order.
pub static FIELDS: [Field; 11] = [
    Field { key: "width", label: "Width", kind: FieldKind::Length },
    Field { key: "depth", label: "Depth", kind: FieldKind::Length },
    Field { key: "height", label: "Height", kind: FieldKind::Length },
    Field { key: "bracketThickness", label: "Bracket thickness", kind: FieldKind::Length },
    Field { key: "ribbingCount", label: "Ribbing count", kind: FieldKind::Count { min: 0 } },
    Field { key: "ribbingThickness", label: "Ribbing thickness", kind: FieldKind::Length },
    Field { key: "holeDiameter", label: "Hole diameter", kind: FieldKind::Length },
    Field { key: "holeCount", label: "Hole count", kind: FieldKind::Count { min: 1 } },
    Field { key: "earWidth", label: "Ear width", kind: FieldKind::Length },
    Field { key: "hasBottom", label: "Has bottom", kind: FieldKind::Flag },
    Field { key: "keyHole", label: "Key hole", kind: FieldKind::Flag },
];

/// Look up a schema field by key.
pub fn field(key: &str) -> Option<&'static Field> {
    FIELDS.iter().find(|f| f.key == key)
}

// =============================================================================
// Parameters
// =============================================================================

/// Design parameters of a bracket. Lengths are in millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BracketParams {
    /// Inner width of the channel (the PSU width).
    pub width: f64,
    /// Length of the bracket along the channel.
    pub depth: f64,
    /// Inner height of the channel.
    pub height: f64,
    /// Wall and ear thickness.
    pub bracket_thickness: f64,
    /// Number of stiffening ribs under each ear; 0 disables ribbing.
    pub ribbing_count: u32,
    /// Rib thickness along the depth.
    pub ribbing_thickness: f64,
    /// Requested screw hole diameter (clamped to fit the ear).
    pub hole_diameter: f64,
    /// Screw holes per ear.
    pub hole_count: u32,
    /// Width of each mounting ear.
    pub ear_width: f64,
    /// Close the far end of the channel with a wall.
    pub has_bottom: bool,
    /// Add a key slot to each hole.
    pub key_hole: bool,
}

impl Default for BracketParams {
    fn default() -> Self {
        Self {
            width: 200.0,
            depth: 25.0,
            height: 16.0,
            bracket_thickness: 3.0,
            ribbing_count: 3,
            ribbing_thickness: 2.0,
            hole_diameter: 2.0,
            hole_count: 1,
            ear_width: 10.0,
            has_bottom: false,
            key_hole: false,
        }
    }
}

impl BracketParams {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Parse a JSON document. Missing keys keep their defaults.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Set one field from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ParamError> {
        let field = field(key).ok_or_else(|| ParamError::UnknownKey(key.to_string()))?;
        match field.kind {
            FieldKind::Length => {
                let v = parse_number(key, value)?;
                *self.length_mut(field.key) = v;
            }
            FieldKind::Count { min } => {
                let v = parse_count(key, value, min)?;
                match field.key {
                    "ribbingCount" => self.ribbing_count = v,
                    _ => self.hole_count = v,
                }
            }
            FieldKind::Flag => {
                let v = parse_flag(key, value)?;
                match field.key {
                    "hasBottom" => self.has_bottom = v,
                    _ => self.key_hole = v,
                }
            }
        }
        Ok(())
    }

    fn length_mut(&mut self, key: &str) -> &mut f64 {
        match key {
            "width" => &mut self.width,
            "depth" => &mut self.depth,
            "height" => &mut self.height,
            "bracketThickness" => &mut self.bracket_thickness,
            "ribbingThickness" => &mut self.ribbing_thickness,
            "holeDiameter" => &mut self.hole_diameter,
            _ => &mut self.ear_width,
        }
    }

    fn lengths(&self) -> [(&'static str, f64); 7] {
        [
            ("width", self.width),
            ("depth", self.depth),
            ("height", self.height),
            ("bracketThickness", self.bracket_thickness),
            ("ribbingThickness", self.ribbing_thickness),
            ("holeDiameter", self.hole_diameter),
            ("earWidth", self.ear_width),
        ]
    }

    /// Overall X extent of the finished bracket: channel, walls and ears.
    pub fn total_width(&self) -> f64 {
        self.width + 2.0 * self.bracket_thickness + 2.0 * self.ear_width
    }

    /// Check preconditions and derive the build dimensions.
    ///
    /// Hole diameter is clamped to the ear silently; everything else that
    /// would produce degenerate geometry is an error.
    pub fn validate(&self) -> Result<ValidParams, ParamError> {
        for (key, value) in self.lengths() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParamError::NonPositive { key, value });
            }
        }
        if self.hole_count < 1 {
            return Err(ParamError::OutOfRange {
                key: "holeCount".into(),
                value: f64::from(self.hole_count),
                min: 1,
            });
        }
        if self.has_bottom && self.bracket_thickness >= self.depth {
            return Err(ParamError::WallTooThick {
                thickness: self.bracket_thickness,
                depth: self.depth,
            });
        }

        let rib_positions = if self.ribbing_count > 0 {
            if !ribbing_fits(self.depth, self.ribbing_thickness, self.ribbing_count) {
                return Err(ParamError::RibbingDoesNotFit {
                    count: self.ribbing_count,
                    thickness: self.ribbing_thickness,
                    depth: self.depth,
                });
            }
            spacing::distribute(self.depth, self.ribbing_thickness, self.ribbing_count)?
        } else {
            Vec::new()
        };

        let hole_diameter = clamp_hole_diameter(self.hole_diameter, self.ear_width, self.depth);
        let hole_positions = if hole_diameter > 0.0 {
            let padding = layout::edge_padding(hole_diameter);
            if self.hole_count > 1 && self.depth <= 2.0 * padding {
                return Err(ParamError::HolesDoNotFit {
                    count: self.hole_count,
                    padding,
                    depth: self.depth,
                });
            }
            layout::hole_positions(self.depth, hole_diameter, self.hole_count)
        } else {
            warn!(
                ear_width = self.ear_width,
                depth = self.depth,
                "ear too small for a hole, holes omitted"
            );
            Vec::new()
        };

        let t = self.bracket_thickness;
        let height_with_thickness = self.height + t;
        let dimensions = Dimensions {
            thickness: t,
            height_with_thickness,
            width_with_thickness: self.width + 2.0 * t,
            hole_diameter,
            rib_width: self.ear_width * 0.5,
            rib_height: height_with_thickness * 0.8,
            total_width: self.total_width(),
            rib_positions,
            hole_positions,
        };
        debug!(?dimensions, "derived dimensions");
        Ok(ValidParams {
            params: self.clone(),
            dimensions,
        })
    }
}

/// Quantities derived from [`BracketParams`]. Lengths in millimeters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    /// Wall thickness `t`.
    pub thickness: f64,
    /// `height + t`: floor to ear underside.
    pub height_with_thickness: f64,
    /// `width + 2t`: outer width of the channel.
    pub width_with_thickness: f64,
    /// Hole diameter after clamping; 0 or less means no holes.
    pub hole_diameter: f64,
    /// Rib leg along X.
    pub rib_width: f64,
    /// Rib leg along Y.
    pub rib_height: f64,
    /// `width + 2t + 2·earWidth`.
    pub total_width: f64,
    /// Z start of each rib.
    pub rib_positions: Vec<f64>,
    /// Z center of each hole.
    pub hole_positions: Vec<f64>,
}

/// Parameters that passed validation, with their derived dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidParams {
    params: BracketParams,
    dimensions: Dimensions,
}

impl ValidParams {
    /// The validated parameters.
    pub fn params(&self) -> &BracketParams {
        &self.params
    }

    /// The derived dimensions.
    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }
}

/// Largest hole that leaves at least 1 mm of ear around it.
pub fn clamp_hole_diameter(requested: f64, ear_width: f64, depth: f64) -> f64 {
    let clamped = requested.min(ear_width / 2.0 - 1.0).min(depth / 2.0 - 1.0);
    if clamped < requested {
        warn!(requested, clamped, "hole diameter clamped to fit the ear");
    }
    clamped
}

fn ribbing_fits(depth: f64, thickness: f64, count: u32) -> bool {
    if count == 1 {
        thickness <= depth / 2.0
    } else {
        depth > thickness * f64::from(count + 2)
    }
}

// =============================================================================
// Form input
// =============================================================================

/// Flat string parameters as submitted by a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    values: BTreeMap<String, String>,
}

impl RawParams {
    /// Empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parse into typed parameters.
    ///
    /// Every length and count must be present. An absent flag is off, the
    /// way an unticked checkbox is simply not submitted.
    pub fn parse(&self) -> Result<BracketParams, ParamError> {
        if let Some(unknown) = self.values.keys().find(|k| field(k).is_none()) {
            return Err(ParamError::UnknownKey(unknown.clone()));
        }
        let mut params = BracketParams::default();
        for f in &FIELDS {
            match (self.get(f.key), f.kind) {
                (Some(value), _) => params.set(f.key, value)?,
                (None, FieldKind::Flag) => params.set(f.key, "off")?,
                (None, _) => return Err(ParamError::Missing(f.key.to_string())),
            }
        }
        Ok(params)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, ParamError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParamError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_count(key: &str, value: &str, min: u32) -> Result<u32, ParamError> {
    let v = parse_number(key, value)?;
    if v.fract() != 0.0 {
        return Err(ParamError::NotAnInteger {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    if v < f64::from(min) || v > f64::from(u32::MAX) {
        return Err(ParamError::OutOfRange {
            key: key.to_string(),
            value: v,
            min,
        });
    }
    Ok(v as u32)
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ParamError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" | "" => Ok(false),
        _ => Err(ParamError::InvalidFlag {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> RawParams {
        pairs.iter().copied().collect()
    }

    fn full_form() -> RawParams {
        form(&[
            ("width", "120"),
            ("depth", "40"),
            ("height", "30"),
            ("bracketThickness", "2.5"),
            ("ribbingCount", "2"),
            ("ribbingThickness", "2"),
            ("holeDiameter", "3.5"),
            ("holeCount", "2"),
            ("earWidth", "14"),
            ("hasBottom", "on"),
        ])
    }

    #[test]
    fn test_defaults_match_schema() {
        let p = BracketParams::default();
        assert_eq!(p.total_width(), 200.0 + 6.0 + 20.0);
        assert_eq!(FIELDS.len(), 11);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_form_parse() {
        let p = full_form().parse().unwrap();
        assert_eq!(p.width, 120.0);
        assert_eq!(p.bracket_thickness, 2.5);
        assert_eq!(p.hole_count, 2);
        assert!(p.has_bottom);
        // Unticked checkbox is absent
        assert!(!p.key_hole);
    }

    #[test]
    fn test_form_missing_number() {
        let mut raw = full_form();
        raw.values.remove("depth");
        assert_eq!(raw.parse(), Err(ParamError::Missing("depth".into())));
    }

    #[test]
    fn test_form_rejects_bad_values() {
        let mut raw = full_form();
        raw.insert("width", "wide");
        assert!(matches!(raw.parse(), Err(ParamError::InvalidNumber { .. })));

        let mut raw = full_form();
        raw.insert("ribbingCount", "2.5");
        assert!(matches!(raw.parse(), Err(ParamError::NotAnInteger { .. })));

        let mut raw = full_form();
        raw.insert("holeCount", "-1");
        assert!(matches!(raw.parse(), Err(ParamError::OutOfRange { .. })));

        let mut raw = full_form();
        raw.insert("keyHole", "maybe");
        assert!(matches!(raw.parse(), Err(ParamError::InvalidFlag { .. })));

        let mut raw = full_form();
        raw.insert("colour", "red");
        assert_eq!(raw.parse(), Err(ParamError::UnknownKey("colour".into())));
    }

    #[test]
    fn test_toml_and_json_fill_defaults() {
        let p = BracketParams::from_toml("width = 150.0\nkeyHole = true\n").unwrap();
        assert_eq!(p.width, 150.0);
        assert!(p.key_hole);
        assert_eq!(p.depth, 25.0);

        let p = BracketParams::from_json(r#"{"holeCount": 3, "depth": 60}"#).unwrap();
        assert_eq!(p.hole_count, 3);
        assert_eq!(p.depth, 60.0);
        assert!(BracketParams::from_json(r#"{"colour": 1}"#).is_err());
    }

    #[test]
    fn test_non_positive_lengths_rejected() {
        let p = BracketParams {
            height: 0.0,
            ..BracketParams::default()
        };
        assert_eq!(
            p.validate(),
            Err(ParamError::NonPositive {
                key: "height",
                value: 0.0
            })
        );
        let p = BracketParams {
            ear_width: -4.0,
            ..BracketParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_count_minimum_comes_from_schema() {
        let mut p = BracketParams::default();
        let err = p.set("holeCount", "-1").unwrap_err();
        assert_eq!(
            err,
            ParamError::OutOfRange {
                key: "holeCount".into(),
                value: -1.0,
                min: 1,
            }
        );
        assert_eq!(err.to_string(), "`holeCount` must be at least 1, got -1");
        assert!(p.set("holeCount", "0").is_err());

        let err = p.set("ribbingCount", "-2").unwrap_err();
        assert!(matches!(err, ParamError::OutOfRange { min: 0, .. }));
        p.set("ribbingCount", "0").unwrap();
        assert_eq!(p.ribbing_count, 0);
    }

    #[test]
    fn test_zero_holes_rejected() {
        let p = BracketParams {
            hole_count: 0,
            ..BracketParams::default()
        };
        assert!(matches!(p.validate(), Err(ParamError::OutOfRange { .. })));
    }

    #[test]
    fn test_ribbing_must_fit() {
        // 10 ribs of 2 mm need more than 24 mm
        let p = BracketParams {
            ribbing_count: 10,
            ..BracketParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ParamError::RibbingDoesNotFit { .. })
        ));
        let p = BracketParams {
            ribbing_count: 1,
            ribbing_thickness: 12.5,
            ..BracketParams::default()
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_multiple_holes_must_fit() {
        // Padding is 10 mm at each end; 20 mm deep leaves nothing between
        let p = BracketParams {
            depth: 20.0,
            hole_count: 2,
            ..BracketParams::default()
        };
        assert!(matches!(p.validate(), Err(ParamError::HolesDoNotFit { .. })));
    }

    #[test]
    fn test_hole_clamp() {
        assert_eq!(clamp_hole_diameter(2.0, 10.0, 25.0), 2.0);
        assert_eq!(clamp_hole_diameter(50.0, 10.0, 25.0), 4.0);
        assert_eq!(clamp_hole_diameter(50.0, 40.0, 12.0), 5.0);
    }

    #[test]
    fn test_tiny_ear_omits_holes() {
        let p = BracketParams {
            ear_width: 2.0,
            ..BracketParams::default()
        };
        let valid = p.validate().unwrap();
        assert!(valid.dimensions().hole_diameter <= 0.0);
        assert!(valid.dimensions().hole_positions.is_empty());
    }

    #[test]
    fn test_derived_dimensions() {
        let valid = BracketParams::default().validate().unwrap();
        let d = valid.dimensions();
        assert_eq!(d.height_with_thickness, 19.0);
        assert_eq!(d.width_with_thickness, 206.0);
        assert_eq!(d.rib_width, 5.0);
        assert!((d.rib_height - 15.2).abs() < 1e-12);
        assert_eq!(d.total_width, 226.0);
        assert_eq!(d.rib_positions.len(), 3);
        assert_eq!(d.hole_positions, vec![12.5]);
    }

    #[test]
    fn test_end_wall_must_fit() {
        let p = BracketParams {
            has_bottom: true,
            bracket_thickness: 25.0,
            ribbing_count: 0,
            ..BracketParams::default()
        };
        assert!(matches!(p.validate(), Err(ParamError::WallTooThick { .. })));
    }
}
