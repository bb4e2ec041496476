//! Ray/triangle intersection.
//!
//! Uses the Möller-Trumbore algorithm in object space. The culling variant
//! only accepts front faces and is used for rays approaching a closed
//! volume from outside. All comparisons are written so that NaN from
//! degenerate input fails them.

use glint_core::Mesh;
use glint_math::Vec3;

use crate::ray::LocalRay;

/// Determinant threshold below which a ray counts as parallel.
const DET_EPSILON: f32 = 1.0e-12;

/// Intersect a ray with triangle `(v0, v1, v2)`.
///
/// Returns `(t, u, v)` with barycentric `u`/`v` on success. `t` is not
/// range-checked.
#[inline]
pub fn intersect_triangle(tri: &[Vec3; 3], origin: Vec3, dir: Vec3, cull: bool) -> Option<(f32, f32, f32)> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let pvec = dir.cross(edge2);
    let det = edge1.dot(pvec);

    if cull {
        if !(det > DET_EPSILON) {
            return None;
        }
        let tvec = origin - tri[0];
        let u = tvec.dot(pvec);
        if !(u >= 0.0 && u <= det) {
            return None;
        }
        let qvec = tvec.cross(edge1);
        let v = dir.dot(qvec);
        if !(v >= 0.0 && u + v <= det) {
            return None;
        }
        let inv_det = 1.0 / det;
        Some((edge2.dot(qvec) * inv_det, u * inv_det, v * inv_det))
    } else {
        if !(det.abs() > DET_EPSILON) {
            return None;
        }
        let inv_det = 1.0 / det;
        let tvec = origin - tri[0];
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let qvec = tvec.cross(edge1);
        let v = dir.dot(qvec) * inv_det;
        if !(v >= 0.0 && u + v <= 1.0) {
            return None;
        }
        Some((edge2.dot(qvec) * inv_det, u, v))
    }
}

/// Closest triangle found by a [`TriangleQuery`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub triangle: u32,
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// State of one ray against one mesh: the narrowing distance window, the
/// self-intersection guard and the test counter.
pub struct TriangleQuery<'a> {
    mesh: &'a Mesh,
    origin: Vec3,
    dir: Vec3,
    cull: bool,
    skip: Option<u32>,
    any_hit: bool,
    t_min: f32,
    /// Closest accepted distance so far
    pub t_max: f32,
    pub hit: Option<TriangleHit>,
    /// Number of triangle tests performed
    pub tests: u64,
}

impl<'a> TriangleQuery<'a> {
    pub fn new(mesh: &'a Mesh, ray: &LocalRay, t_min: f32, t_max: f32) -> Self {
        Self {
            mesh,
            origin: ray.origin,
            dir: ray.dir,
            cull: false,
            skip: None,
            any_hit: false,
            t_min,
            t_max,
            hit: None,
            tests: 0,
        }
    }

    /// Only accept front faces.
    pub fn with_culling(mut self, cull: bool) -> Self {
        self.cull = cull;
        self
    }

    /// Never report this triangle (the one the ray started on).
    pub fn skipping(mut self, triangle: Option<u32>) -> Self {
        self.skip = triangle;
        self
    }

    /// Stop at the first hit instead of searching for the closest.
    pub fn any_hit(mut self, any_hit: bool) -> Self {
        self.any_hit = any_hit;
        self
    }

    pub fn mesh(&self) -> &Mesh {
        self.mesh
    }

    /// True once an any-hit query found something.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.any_hit && self.hit.is_some()
    }

    /// Test one triangle. Returns true if it narrowed the window.
    #[inline]
    pub fn test(&mut self, triangle: u32) -> bool {
        if self.skip == Some(triangle) {
            return false;
        }
        self.tests += 1;
        let tri = self.mesh.triangle(triangle as usize);
        match intersect_triangle(&tri, self.origin, self.dir, self.cull) {
            Some((t, u, v)) if t > self.t_min && t < self.t_max => {
                self.t_max = t;
                self.hit = Some(TriangleHit { triangle, t, u, v });
                true
            }
            _ => false,
        }
    }

    /// Test every triangle of the mesh.
    pub fn brute_force(&mut self) -> bool {
        let mut hit_any = false;
        for tri in 0..self.mesh.triangle_count() as u32 {
            if self.test(tri) {
                hit_any = true;
                if self.is_done() {
                    break;
                }
            }
        }
        hit_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_math::Vec2;

    fn unit_tri() -> [Vec3; 3] {
        // Counter-clockwise seen from +Z
        [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_triangle_hit() {
        let hit = intersect_triangle(&unit_tri(), Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, false);
        let (t, u, v) = hit.expect("Ray should hit triangle");
        assert!((t - 5.0).abs() < 1e-6);
        assert!(u >= 0.0 && v >= 0.0 && u + v <= 1.0);
    }

    #[test]
    fn test_triangle_miss() {
        let hit = intersect_triangle(&unit_tri(), Vec3::new(5.0, 5.0, 5.0), Vec3::NEG_Z, false);
        assert!(hit.is_none(), "Ray should miss triangle");
    }

    #[test]
    fn test_back_face_culling() {
        let from_front = intersect_triangle(&unit_tri(), Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, true);
        let from_back = intersect_triangle(&unit_tri(), Vec3::new(0.0, 0.0, -5.0), Vec3::Z, true);
        let two_sided = intersect_triangle(&unit_tri(), Vec3::new(0.0, 0.0, -5.0), Vec3::Z, false);

        assert!(from_front.is_some());
        assert!(from_back.is_none(), "Back face should be culled");
        assert!(two_sided.is_some());
        let (t_front, u_front, v_front) = from_front.unwrap();
        assert!((t_front - 5.0).abs() < 1e-6);
        assert!(u_front + v_front <= 1.0);
    }

    #[test]
    fn test_degenerate_and_parallel() {
        let flat = [Vec3::ZERO, Vec3::X, Vec3::X * 2.0];
        assert!(intersect_triangle(&flat, Vec3::new(0.5, 0.0, 1.0), Vec3::NEG_Z, false).is_none());
        assert!(intersect_triangle(&unit_tri(), Vec3::new(0.0, 0.0, 1.0), Vec3::X, false).is_none());
        let nan = Vec3::new(f32::NAN, 0.0, -1.0);
        assert!(intersect_triangle(&unit_tri(), Vec3::new(0.0, 0.0, 1.0), nan, false).is_none());
        assert!(intersect_triangle(&unit_tri(), Vec3::new(0.0, 0.0, 1.0), nan, true).is_none());
    }

    #[test]
    fn test_query_skips_source_triangle() {
        let mesh = Mesh::rectangle(Vec2::splat(-1.0), Vec2::splat(1.0));
        let ray = LocalRay::new(Vec3::new(0.5, -0.5, 1.0), Vec3::NEG_Z);

        let mut query = TriangleQuery::new(&mesh, &ray, 0.0, f32::MAX);
        assert!(query.brute_force());
        let hit = query.hit.unwrap();
        assert!((hit.t - 1.0).abs() < 1e-6);

        let mut skipping = TriangleQuery::new(&mesh, &ray, 0.0, f32::MAX).skipping(Some(hit.triangle));
        assert!(!skipping.brute_force(), "Source triangle must not be hit again");
    }

    #[test]
    fn test_query_window() {
        let mesh = Mesh::rectangle(Vec2::splat(-1.0), Vec2::splat(1.0));
        let ray = LocalRay::new(Vec3::new(0.1, 0.2, 3.0), Vec3::NEG_Z);
        let mut query = TriangleQuery::new(&mesh, &ray, 0.0, 2.0);
        assert!(!query.brute_force(), "Hit beyond the window is ignored");
        assert_eq!(query.tests, 2);
    }
}
