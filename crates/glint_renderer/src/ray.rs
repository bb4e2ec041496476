//! Ray record for Whitted tracing.
//!
//! A ray carries everything the dispatcher and the shading evaluator need:
//! the world-space line with its precomputed reciprocal direction and sign
//! bits, the current closest distance (`length`), recursion bookkeeping and
//! the primitive it was spawned from.

use glint_core::{MeshId, NodeId};
use glint_math::{Mat4, Vec3};

/// Why a ray was cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayRole {
    Primary,
    Shadow,
    Reflected,
    Refracted,
}

/// A triangle of a mesh as drawn by a particular node.
///
/// `node` is the node the hit is attributed to: the shape itself, or the
/// outermost reference on the path that reached it. `shape` is the shape
/// node that owns the mesh; it differs from `node` only inside references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveRef {
    pub node: NodeId,
    pub shape: NodeId,
    pub mesh: MeshId,
    pub triangle: u32,
}

/// Closest intersection found so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub primitive: PrimitiveRef,
    /// Barycentric coordinates of the hit point
    pub u: f32,
    pub v: f32,
    /// World-to-object transform of the path that reached the mesh
    pub world_to_object: Mat4,
}

/// A ray in the object space of some node.
///
/// The direction is the transformed world direction and is not normalized,
/// so parametric distances are the same in every space.
#[derive(Debug, Clone, Copy)]
pub struct LocalRay {
    pub origin: Vec3,
    pub dir: Vec3,
    pub inv_dir: Vec3,
    pub sign: [usize; 3],
}

impl LocalRay {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        let inv_dir = dir.recip();
        Self {
            origin,
            dir,
            inv_dir,
            sign: sign_bits(inv_dir),
        }
    }
}

#[inline]
fn sign_bits(inv_dir: Vec3) -> [usize; 3] {
    [
        (inv_dir.x < 0.0) as usize,
        (inv_dir.y < 0.0) as usize,
        (inv_dir.z < 0.0) as usize,
    ]
}

/// Smallest accepted hit distance of secondary rays.
pub const SECONDARY_T_MIN: f32 = 1.0e-5;

#[derive(Debug, Clone)]
pub struct Ray {
    /// World-space origin
    pub origin: Vec3,
    /// Normalized world-space direction
    pub dir: Vec3,
    pub inv_dir: Vec3,
    pub sign: [usize; 3],
    /// Hits closer than this are ignored
    pub t_min: f32,
    /// Distance to the closest hit so far, or the maximum distance to search.
    /// Only ever decreases while the scene is traversed.
    pub length: f32,
    /// Recursion depth, 1 for primary rays
    pub depth: u32,
    /// Weight of this ray in the final pixel color
    pub contrib: f32,
    pub role: RayRole,
    /// Pixel of a primary ray
    pub pixel: Option<(u32, u32)>,
    /// Primitive that spawned the ray
    pub source: Option<PrimitiveRef>,
    /// False while the ray travels inside a closed volume
    pub is_outside: bool,
    pub hit: Option<Hit>,
}

impl Ray {
    /// Create a ray with a normalized direction and an unbounded length.
    pub fn new(origin: Vec3, dir: Vec3, role: RayRole) -> Self {
        let dir = dir.normalize_or_zero();
        let inv_dir = dir.recip();
        Self {
            origin,
            dir,
            inv_dir,
            sign: sign_bits(inv_dir),
            t_min: 0.0,
            length: f32::MAX,
            depth: 1,
            contrib: 1.0,
            role,
            pixel: None,
            source: None,
            is_outside: true,
            hit: None,
        }
    }

    /// Create a primary ray for pixel `(x, y)`.
    pub fn primary(origin: Vec3, dir: Vec3, x: u32, y: u32) -> Self {
        let mut ray = Self::new(origin, dir, RayRole::Primary);
        ray.pixel = Some((x, y));
        ray
    }

    /// Compute a point along the ray at parameter t.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.dir
    }

    /// Rays with a zero or non-finite direction or origin never hit anything.
    pub fn is_valid(&self) -> bool {
        self.origin.is_finite() && self.dir.is_finite() && self.dir != Vec3::ZERO
    }

    #[inline]
    pub fn is_shadow(&self) -> bool {
        self.role == RayRole::Shadow
    }

    /// True once the ray found a hit.
    pub fn has_hit(&self) -> bool {
        self.hit.is_some()
    }

    /// Transform the ray into an object space.
    #[inline]
    pub fn to_object(&self, world_to_object: &Mat4) -> LocalRay {
        LocalRay::new(
            world_to_object.transform_point3(self.origin),
            world_to_object.transform_vector3(self.dir),
        )
    }

    /// Record a closer hit.
    pub fn record(&mut self, t: f32, hit: Hit) {
        debug_assert!(t <= self.length);
        self.length = t;
        self.hit = Some(hit);
    }

    fn spawn(&self, origin: Vec3, dir: Vec3, role: RayRole, contrib: f32) -> Ray {
        let mut ray = Ray::new(origin, dir, role);
        ray.t_min = SECONDARY_T_MIN;
        ray.depth = self.depth + 1;
        ray.contrib = contrib;
        ray.source = self.hit.map(|h| h.primitive);
        ray.is_outside = self.is_outside;
        ray
    }

    /// Mirror reflection at `point` about `normal` (facing this ray).
    pub fn reflected(&self, point: Vec3, normal: Vec3, weight: f32) -> Ray {
        let dir = self.dir - 2.0 * self.dir.dot(normal) * normal;
        self.spawn(point, dir, RayRole::Reflected, self.contrib * weight)
    }

    /// Refraction at `point` through a surface with index of refraction `kn`.
    ///
    /// `normal` faces this ray. Only closed volumes bend the ray and switch
    /// it between inside and outside; open surfaces are treated as thin
    /// sheets the ray passes straight through. Returns the new ray and
    /// whether total internal reflection turned it into a reflection.
    pub fn refracted(
        &self,
        point: Vec3,
        normal: Vec3,
        kn: f32,
        through_volume: bool,
        weight: f32,
    ) -> (Ray, bool) {
        let contrib = self.contrib * weight;
        if !through_volume || kn <= 0.0 {
            return (
                self.spawn(point, self.dir, RayRole::Refracted, contrib),
                false,
            );
        }

        let eta = if self.is_outside { 1.0 / kn } else { kn };
        let c1 = -self.dir.dot(normal);
        let k = 1.0 - eta * eta * (1.0 - c1 * c1);
        if k < 0.0 {
            let mut tir = self.reflected(point, normal, weight);
            tir.role = RayRole::Refracted;
            return (tir, true);
        }

        let dir = eta * self.dir + (eta * c1 - k.sqrt()) * normal;
        let mut ray = self.spawn(point, dir, RayRole::Refracted, contrib);
        ray.is_outside = !self.is_outside;
        (ray, false)
    }

    /// Shadow ray from `point` toward a light `dist` away along unit `dir`.
    pub fn shadow(&self, point: Vec3, dir: Vec3, dist: f32) -> Ray {
        let mut ray = self.spawn(point, dir, RayRole::Shadow, self.contrib);
        ray.depth = self.depth;
        ray.length = dist;
        ray.is_outside = true;
        ray
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), RayRole::Primary);

        assert_eq!(ray.dir, Vec3::X);
        assert_eq!(ray.at(2.5), Vec3::new(2.5, 0.0, 0.0));
        assert_eq!(ray.length, f32::MAX);
        assert_eq!(ray.depth, 1);
    }

    #[test]
    fn test_sign_bits_and_infinities() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(-1.0, 0.0, 1.0), RayRole::Primary);
        assert_eq!(ray.sign, [1, 0, 0]);
        assert_eq!(ray.inv_dir.y, f32::INFINITY);
    }

    #[test]
    fn test_invalid_rays() {
        assert!(!Ray::new(Vec3::ZERO, Vec3::ZERO, RayRole::Primary).is_valid());
        assert!(!Ray::new(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 1.0), RayRole::Primary).is_valid());
        assert!(Ray::new(Vec3::ZERO, Vec3::Z, RayRole::Primary).is_valid());
    }

    #[test]
    fn test_reflection() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, -1.0, 0.0), RayRole::Primary);
        let r = ray.reflected(Vec3::new(1.0, -1.0, 0.0), Vec3::Y, 0.5);
        assert!((r.dir - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-6);
        assert_eq!(r.depth, 2);
        assert_eq!(r.contrib, 0.5);
        assert_eq!(r.role, RayRole::Reflected);
    }

    #[test]
    fn test_refraction_at_normal_incidence() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, RayRole::Primary);
        let (r, tir) = ray.refracted(Vec3::new(0.0, 0.0, -1.0), Vec3::Z, 1.5, true, 1.0);
        assert!(!tir);
        assert!((r.dir - Vec3::NEG_Z).length() < 1e-6);
        assert!(!r.is_outside);
    }

    #[test]
    fn test_snell_and_total_internal_reflection() {
        // 45 degrees into glass bends toward the normal.
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, -1.0, 0.0), RayRole::Primary);
        let (r, tir) = ray.refracted(Vec3::ZERO, Vec3::Y, 1.5, true, 1.0);
        assert!(!tir);
        let sin_in = std::f32::consts::FRAC_1_SQRT_2;
        assert!((r.dir.x - sin_in / 1.5).abs() < 1e-5);

        // The same angle from inside exceeds the critical angle.
        let mut inside = ray.clone();
        inside.is_outside = false;
        let (r, tir) = inside.refracted(Vec3::ZERO, Vec3::Y, 1.5, true, 1.0);
        assert!(tir);
        assert!(r.dir.y > 0.0);
        assert!(!r.is_outside);
    }

    #[test]
    fn test_shadow_ray() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, RayRole::Primary);
        let s = ray.shadow(Vec3::new(0.0, 0.0, -2.0), Vec3::Y, 3.0);
        assert!(s.is_shadow());
        assert_eq!(s.length, 3.0);
        assert_eq!(s.depth, 1);
    }
}
