#![warn(missing_docs)]

//! Math types for the rigkit asset engines.
//!
//! Thin wrappers around nalgebra providing domain-specific types for
//! runtime collision and fragment assets: points, vectors, quaternions,
//! affine transforms, the 3×4 matrices the target runtime stores, and
//! the tolerance constants shared by the engines.

use nalgebra::{Matrix3, Matrix3x4, Matrix4, Vector4};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = nalgebra::Vector3<f64>;

/// A 4D vector; `w` carries auxiliary payloads (volume·mass on child inertias).
pub type Vec4 = Vector4<f64>;

/// A unit quaternion, (w, x, y, z) convention.
pub type Quat = nalgebra::UnitQuaternion<f64>;

/// A 4×4 affine transformation matrix (column-major).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// The underlying 4×4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `t`.
    pub fn translation(t: Vec3) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = t.x;
        m[(1, 3)] = t.y;
        m[(2, 3)] = t.z;
        Self { matrix: m }
    }

    /// Build from position, rotation, and per-axis scale (scale applied first).
    pub fn from_parts(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let mut m = Matrix4::identity();
        let r = rotation.to_rotation_matrix();
        for col in 0..3 {
            let s = scale[col];
            for row in 0..3 {
                m[(row, col)] = r[(row, col)] * s;
            }
        }
        m[(0, 3)] = position.x;
        m[(1, 3)] = position.y;
        m[(2, 3)] = position.z;
        Self { matrix: m }
    }

    /// Compose: apply `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// The translation column.
    pub fn translation_part(&self) -> Vec3 {
        Vec3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// The upper-left 3×3 block (rotation · scale).
    pub fn linear_part(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Replace the translation column.
    pub fn with_translation(&self, t: Vec3) -> Self {
        let mut m = self.matrix;
        m[(0, 3)] = t.x;
        m[(1, 3)] = t.y;
        m[(2, 3)] = t.z;
        Self { matrix: m }
    }

    /// Whether the linear part is the identity within `tol`.
    pub fn is_rotation_identity(&self, tol: f64) -> bool {
        let l = self.linear_part();
        (l - Matrix3::identity()).norm() < tol
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// A 3×4 matrix: the runtime's storage for composite child transforms,
/// bound-to-bone offsets, and link attachments. Rows are the three rows
/// of an affine transform; the fourth column is translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform34 {
    /// The underlying 3×4 matrix.
    pub matrix: Matrix3x4<f64>,
}

impl Transform34 {
    /// Identity transform.
    pub fn identity() -> Self {
        let mut m = Matrix3x4::zeros();
        m[(0, 0)] = 1.0;
        m[(1, 1)] = 1.0;
        m[(2, 2)] = 1.0;
        Self { matrix: m }
    }

    /// Build from a 3×3 linear block plus a translation column.
    pub fn from_parts(linear: Matrix3<f64>, translation: Vec3) -> Self {
        let mut m = Matrix3x4::zeros();
        for row in 0..3 {
            for col in 0..3 {
                m[(row, col)] = linear[(row, col)];
            }
            m[(row, 3)] = translation[row];
        }
        Self { matrix: m }
    }

    /// Pure translation.
    pub fn from_translation(t: Vec3) -> Self {
        Self::from_parts(Matrix3::identity(), t)
    }

    /// Promote to a full 4×4 affine transform.
    pub fn to_transform(&self) -> Transform {
        let mut m = Matrix4::identity();
        for row in 0..3 {
            for col in 0..4 {
                m[(row, col)] = self.matrix[(row, col)];
            }
        }
        Transform { matrix: m }
    }

    /// Truncate a 4×4 affine transform (the bottom row is dropped).
    pub fn from_transform(t: &Transform) -> Self {
        let mut m = Matrix3x4::zeros();
        for row in 0..3 {
            for col in 0..4 {
                m[(row, col)] = t.matrix[(row, col)];
            }
        }
        Self { matrix: m }
    }

    /// The translation column.
    pub fn translation_part(&self) -> Vec3 {
        Vec3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// The 3×3 linear block.
    pub fn linear_part(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Replace the translation column.
    pub fn with_translation(&self, t: Vec3) -> Self {
        Self::from_parts(self.linear_part(), t)
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let l = self.linear_part();
        let v = l * p.coords + self.translation_part();
        Point3::from(v)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.linear_part() * v
    }
}

impl Default for Transform34 {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance and calibration constants shared by the engines.
pub mod tol {
    /// Linear distance tolerance for geometric comparisons.
    pub const LINEAR: f64 = 1e-6;

    /// Squared-distance slack accepted on the boundary of a Welzl
    /// candidate ball.
    pub const WELZL_EPS: f64 = 1e-7;

    /// The mesh-shrink margin-halving loop gives up below this.
    pub const SHRINK_MIN_MARGIN: f64 = 1e-6;

    /// Smallest collision margin the runtime accepts on a mesh bound.
    pub const MARGIN_FLOOR: f64 = 0.025;

    /// The runtime's default collision skin.
    pub const DEFAULT_MARGIN: f64 = 0.04;
}

/// Sink for engine warnings.
///
/// The engines never abort a build over a single bad shape; they emit
/// exactly one warning per skipped input and carry on. Hosts plug in a
/// sink to route those messages wherever their UI wants them.
pub trait WarningSink {
    /// Report one warning.
    fn warning(&mut self, msg: String);
}

/// A sink that forwards warnings to the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink;

impl WarningSink for LogSink {
    fn warning(&mut self, msg: String) {
        log::warn!("{msg}");
    }
}

/// A sink that accumulates warnings for later inspection.
#[derive(Debug, Default)]
pub struct CollectSink {
    /// Warnings received so far, in emission order.
    pub warnings: Vec<String>,
}

impl WarningSink for CollectSink {
    fn warning(&mut self, msg: String) {
        self.warnings.push(msg);
    }
}
