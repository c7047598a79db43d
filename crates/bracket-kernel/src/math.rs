//! Math types for the bracket CSG kernel.
//!
//! Thin wrappers around nalgebra: points, vectors and an affine
//! [`Transform`] used by every rigid operation on a [`crate::Solid`].

use nalgebra::{Matrix3, Matrix4, Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A point in the 2D plane of a [`crate::CrossSection`].
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            matrix: Matrix4::new_translation(&Vec3::new(dx, dy, dz)),
        }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        Self::axis_rotation(0, angle)
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: f64) -> Self {
        Self::axis_rotation(1, angle)
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        Self::axis_rotation(2, angle)
    }

    /// Euler rotation in degrees, applied about X first, then Y, then Z.
    pub fn euler_degrees(x: f64, y: f64, z: f64) -> Self {
        Self::rotation_z(z.to_radians())
            .then(&Self::rotation_y(y.to_radians()))
            .then(&Self::rotation_x(x.to_radians()))
    }

    /// Reflection across the plane through the origin with unit `normal`.
    pub fn mirror(normal: &Vec3) -> Self {
        let n = *normal;
        let mut matrix = Matrix4::identity();
        let householder = Matrix3::identity() - n * n.transpose() * 2.0;
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&householder);
        Self { matrix }
    }

    /// Right-handed rotation about coordinate axis `axis` (0 = X, 1 = Y, 2 = Z).
    fn axis_rotation(axis: usize, angle: f64) -> Self {
        let (s, c) = snap_sin_cos(angle);
        // The two axes spanning the rotation plane, in right-handed order.
        let (i, j) = ((axis + 1) % 3, (axis + 2) % 3);
        let mut m = Matrix4::identity();
        m[(i, i)] = c;
        m[(i, j)] = -s;
        m[(j, i)] = s;
        m[(j, j)] = c;
        Self { matrix: m }
    }

    /// Compose: `self` then `other` (self * other).
    ///
    /// Matrix product semantics: the result applies `other` first and
    /// `self` second.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        self.matrix.transform_point(p)
    }

    /// Determinant of the linear part. Negative for mirroring transforms.
    pub fn determinant(&self) -> f64 {
        self.matrix.fixed_view::<3, 3>(0, 0).determinant()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// `sin_cos` with exact results at multiples of a quarter turn.
///
/// Quarter-turn rotations are common when orienting cutters; snapping keeps
/// axis-aligned faces exactly axis-aligned.
fn snap_sin_cos(angle: f64) -> (f64, f64) {
    let quarters = angle / std::f64::consts::FRAC_PI_2;
    if (quarters - quarters.round()).abs() < 1e-12 {
        match (quarters.round() as i64).rem_euclid(4) {
            0 => (0.0, 1.0),
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            _ => (-1.0, 0.0),
        }
    } else {
        angle.sin_cos()
    }
}
