use nalgebra::{Matrix3, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::{Point3, PointCloud};

/// Proper rotation (row-major) followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0, 0.0, 0.0],
        }
    }

    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            translation: [dx, dy, dz],
            ..Self::identity()
        }
    }

    /// Rotation of `angle` radians about `axis` (need not be normalized),
    /// followed by `translation`.
    pub fn from_axis_angle(axis: [f64; 3], angle: f64, translation: [f64; 3]) -> Self {
        let axis = Unit::new_normalize(Vector3::new(axis[0], axis[1], axis[2]));
        let r = Rotation3::from_axis_angle(&axis, angle);
        Self {
            rotation: mat3_to_arrays(r.matrix()),
            translation,
        }
    }

    pub fn from_parts(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        Self {
            rotation: mat3_to_arrays(rotation),
            translation: [translation[0], translation[1], translation[2]],
        }
    }

    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        mat3_from_arrays(&self.rotation)
    }

    pub fn translation_vector(&self) -> Vector3<f64> {
        Vector3::new(
            self.translation[0],
            self.translation[1],
            self.translation[2],
        )
    }

    pub fn is_identity(&self, eps: f64) -> bool {
        let id = Self::identity();
        for r in 0..3 {
            for c in 0..3 {
                if (self.rotation[r][c] - id.rotation[r][c]).abs() > eps {
                    return false;
                }
            }
        }
        self.translation.iter().all(|t| t.abs() <= eps)
    }

    /// Apply the rigid transform to a single point: R * p + t
    pub fn apply_to_point(&self, p: &Point3) -> Point3 {
        let r = &self.rotation;
        let t = &self.translation;
        Point3::new(
            r[0][0] * p.x + r[0][1] * p.y + r[0][2] * p.z + t[0],
            r[1][0] * p.x + r[1][1] * p.y + r[1][2] * p.z + t[1],
            r[2][0] * p.x + r[2][1] * p.y + r[2][2] * p.z + t[2],
        )
    }

    /// Compose two transforms: apply `self` first, then `other`.
    ///
    /// Result: R_new = other.R * self.R, t_new = other.R * self.t + other.t
    pub fn compose(&self, other: &RigidTransform) -> RigidTransform {
        let r_other = other.rotation_matrix();
        let r_new = r_other * self.rotation_matrix();
        let t_new = r_other * self.translation_vector() + other.translation_vector();
        Self::from_parts(&r_new, &t_new)
    }

    /// The transform that undoes `self`: R^T, -R^T t.
    pub fn inverse(&self) -> RigidTransform {
        let rt = self.rotation_matrix().transpose();
        let t = -(rt * self.translation_vector());
        Self::from_parts(&rt, &t)
    }

    /// Magnitude of the rotation in radians.
    pub fn rotation_angle(&self) -> f64 {
        let trace = self.rotation[0][0] + self.rotation[1][1] + self.rotation[2][2];
        ((trace - 1.0) / 2.0).clamp(-1.0, 1.0).acos()
    }

    pub fn translation_norm(&self) -> f64 {
        self.translation_vector().norm()
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Apply a rigid transform to all points in a cloud, returning a new cloud.
pub fn apply_transform(cloud: &PointCloud, transform: &RigidTransform) -> PointCloud {
    cloud
        .iter_points()
        .map(|p| transform.apply_to_point(&p))
        .collect()
}

/// Convert a nalgebra Matrix3 to a row-major array.
fn mat3_to_arrays(m: &Matrix3<f64>) -> [[f64; 3]; 3] {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

fn mat3_from_arrays(a: &[[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::new(
        a[0][0], a[0][1], a[0][2], a[1][0], a[1][1], a[1][2], a[2][0], a[2][1], a[2][2],
    )
}
