//! Pinhole / thin-lens camera description.

use glint_math::Vec3;

/// Camera for the ray tracer.
///
/// The view plane sits at `focal_dist` in front of the eye. With a lens
/// diameter above zero and more than one lens sample, primary rays start on
/// the lens disc and converge on the view plane, which gives depth of field.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Distance from the eye to the plane in focus
    pub focal_dist: f32,
    pub lens_diameter: f32,
    pub clip_near: f32,
    pub clip_far: f32,
}

/// Orthonormal camera frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub eye: Vec3,
    /// Normalized view direction
    pub look: Vec3,
    /// Normalized up vector perpendicular to `look`
    pub up: Vec3,
    /// Normalized right vector
    pub right: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)
    }
}

impl Camera {
    /// Camera at `eye` looking at `look_at`, focused on the look-at point.
    pub fn new(eye: Vec3, look_at: Vec3) -> Self {
        Self {
            eye,
            look_at,
            up: Vec3::Y,
            fov: 45.0,
            focal_dist: (look_at - eye).length().max(f32::EPSILON),
            lens_diameter: 0.0,
            clip_near: 0.1,
            clip_far: 500.0,
        }
    }

    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up;
        self
    }

    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    pub fn with_focal_dist(mut self, focal_dist: f32) -> Self {
        self.focal_dist = focal_dist;
        self
    }

    pub fn with_lens(mut self, diameter: f32) -> Self {
        self.lens_diameter = diameter.max(0.0);
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.clip_near = near;
        self.clip_far = far;
        self
    }

    /// Compute the eye/look/up/right frame.
    ///
    /// Falls back to a different up vector when `up` is parallel to the view
    /// direction.
    pub fn basis(&self) -> CameraBasis {
        let look = (self.look_at - self.eye).normalize_or(Vec3::NEG_Z);
        let mut right = look.cross(self.up).normalize_or_zero();
        if right == Vec3::ZERO {
            let alt = if look.y.abs() < 0.9 { Vec3::Y } else { Vec3::Z };
            right = look.cross(alt).normalize();
        }
        let up = right.cross(look);
        CameraBasis {
            eye: self.eye,
            look,
            up,
            right,
        }
    }
}
