//! 2D cross-sections: the contours that get extruded into prisms.

use std::f64::consts::PI;

use crate::math::{Point2, Vec2};
use crate::{KernelError, Result};

/// Area under which a contour counts as degenerate (mm²).
const MIN_AREA: f64 = 1e-9;

/// A simple closed polygon in the XY plane, stored counter-clockwise.
///
/// Contours given clockwise are reversed on construction, so both winding
/// conventions describe the same filled region.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    points: Vec<Point2>,
}

impl CrossSection {
    /// Create a cross-section from a closed contour (last point is implicitly
    /// connected to the first).
    ///
    /// # Errors
    ///
    /// [`KernelError::DegenerateSection`] for fewer than three points or a
    /// contour with zero area.
    pub fn new(points: Vec<Point2>) -> Result<Self> {
        if points.len() < 3 {
            return Err(KernelError::DegenerateSection(format!(
                "{} points, need at least 3",
                points.len()
            )));
        }
        let area = signed_area(&points);
        if area.abs() < MIN_AREA {
            return Err(KernelError::DegenerateSection(format!(
                "zero area ({area:.3e} mm²)"
            )));
        }
        let mut points = points;
        if area < 0.0 {
            points.reverse();
        }
        Ok(Self { points })
    }

    /// Axis-aligned rectangle with its corner at the origin.
    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        Self::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(width, 0.0),
            Point2::new(width, height),
            Point2::new(0.0, height),
        ])
    }

    /// Regular polygon approximating a circle centered at the origin.
    pub fn circle(radius: f64, segments: u32) -> Result<Self> {
        if radius <= 0.0 || segments < 3 {
            return Err(KernelError::DegenerateSection(format!(
                "circle radius {radius} with {segments} segments"
            )));
        }
        let points = (0..segments)
            .map(|i| {
                let angle = 2.0 * PI * f64::from(i) / f64::from(segments);
                Point2::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect();
        Self::new(points)
    }

    /// Convex hull of all points of `sections` (Andrew's monotone chain).
    pub fn hull(sections: &[CrossSection]) -> Result<Self> {
        let mut pts: Vec<Point2> = sections
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .collect();
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        pts.dedup_by(|a, b| (*a - *b).norm() < 1e-12);
        if pts.len() < 3 {
            return Err(KernelError::DegenerateSection(
                "hull of fewer than 3 distinct points".into(),
            ));
        }

        let mut lower: Vec<Point2> = Vec::with_capacity(pts.len());
        for p in &pts {
            while lower.len() >= 2 && turn(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
            {
                lower.pop();
            }
            lower.push(*p);
        }
        let mut upper: Vec<Point2> = Vec::with_capacity(pts.len());
        for p in pts.iter().rev() {
            while upper.len() >= 2 && turn(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
            {
                upper.pop();
            }
            upper.push(*p);
        }
        lower.pop();
        upper.pop();
        lower.extend(upper);
        Self::new(lower)
    }

    /// Translate by `(dx, dy)`.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        let offset = Vec2::new(dx, dy);
        Self {
            points: self.points.iter().map(|p| *p + offset).collect(),
        }
    }

    /// Contour points, counter-clockwise.
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// True if no vertex turns clockwise.
    pub fn is_convex(&self) -> bool {
        let n = self.points.len();
        (0..n).all(|i| {
            turn(
                &self.points[i],
                &self.points[(i + 1) % n],
                &self.points[(i + 2) % n],
            ) >= -1e-12
        })
    }

    /// Split the contour into counter-clockwise triangles by ear clipping.
    pub(crate) fn triangulate(&self) -> Vec<[Point2; 3]> {
        let mut idx: Vec<usize> = (0..self.points.len()).collect();
        let mut tris = Vec::with_capacity(idx.len().saturating_sub(2));
        let pts = &self.points;
        while idx.len() > 3 {
            let n = idx.len();
            let ear = (0..n).find(|&i| {
                let (a, b, c) = (pts[idx[(i + n - 1) % n]], pts[idx[i]], pts[idx[(i + 1) % n]]);
                turn(&a, &b, &c) > 0.0
                    && idx
                        .iter()
                        .filter(|&&k| k != idx[(i + n - 1) % n] && k != idx[i] && k != idx[(i + 1) % n])
                        .all(|&k| !point_in_triangle(&pts[k], &a, &b, &c))
            });
            // A simple polygon always has an ear; fall back to the first
            // vertex if rounding hides it.
            let i = ear.unwrap_or(0);
            tris.push([pts[idx[(i + n - 1) % n]], pts[idx[i]], pts[idx[(i + 1) % n]]]);
            idx.remove(i);
        }
        tris.push([pts[idx[0]], pts[idx[1]], pts[idx[2]]]);
        tris
    }
}

fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// Positive when `a → b → c` turns counter-clockwise.
fn turn(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn point_in_triangle(p: &Point2, a: &Point2, b: &Point2, c: &Point2) -> bool {
    turn(a, b, p) >= 0.0 && turn(b, c, p) >= 0.0 && turn(c, a, p) >= 0.0
}
