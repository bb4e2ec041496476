// Transform utilities for Mat4
//
// Node transforms in the scene graph are affine; object-space rays are
// produced with the inverse and normals with the inverse transpose.

use crate::Aabb;
use glam::{Mat3, Mat4, Vec3};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Matrix that maps object-space normals to the space of `self`
    /// (the transposed inverse of the upper 3x3 block).
    fn normal_matrix(&self) -> Mat3;

    /// Transform a normal with the inverse transpose and renormalize.
    fn transform_normal(&self, normal: Vec3) -> Vec3 {
        (self.normal_matrix() * normal).normalize_or_zero()
    }
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }

        let mut result_min = Vec3::splat(f32::INFINITY);
        let mut result_max = Vec3::splat(f32::NEG_INFINITY);

        for corner in aabb.corners() {
            let p = self.transform_point3(corner);
            result_min = result_min.min(p);
            result_max = result_max.max(p);
        }

        Aabb::from_points(result_min, result_max)
    }

    fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(*self).inverse().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_aabb_translation() {
        let mat = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        let transformed = mat.transform_aabb(&aabb);

        assert_eq!(transformed.x.min, 10.0);
        assert_eq!(transformed.x.max, 11.0);
        assert_eq!(transformed.y.min, 0.0);
    }

    #[test]
    fn test_transform_aabb_rotation_grows() {
        let mat = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let transformed = mat.transform_aabb(&aabb);

        let expected = 2.0_f32.sqrt();
        assert!((transformed.x.max - expected).abs() < 1e-5);
        assert!((transformed.y.max - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_transform_aabb_empty_stays_empty() {
        let mat = Mat4::from_scale(Vec3::splat(2.0));
        assert!(mat.transform_aabb(&Aabb::EMPTY).is_empty());
    }

    #[test]
    fn test_normal_under_non_uniform_scale() {
        // A 45 degree plane squashed along x: the normal must tilt the other way.
        let mat = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = mat.transform_normal(Vec3::new(1.0, 1.0, 0.0).normalize());

        assert!((n.length() - 1.0).abs() < 1e-5);
        assert!(n.y > n.x, "Normal should lean toward the unscaled axis");
    }
}
