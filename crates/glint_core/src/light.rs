//! Light sources.
//!
//! A light is positioned by a transform. Its shadow behaviour depends on the
//! kind: a sphere light samples concentric rings of a disc facing the shaded
//! point, a rectangular light samples a grid in its local XY plane. A light
//! with a single sample casts hard shadows.

use glint_math::{Color, Mat4, Vec3};

/// Geometry of a light for shadow sampling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Spherical light. `samples` is `[rings, sectors]` of the sample disc.
    Sphere { radius: f32, samples: [u32; 2] },
    /// Rectangle in the light's local XY plane, emitting along -Z.
    /// `samples` is `[x, y]`; both are odd.
    Rect {
        width: f32,
        height: f32,
        samples: [u32; 2],
    },
}

/// A light source with OpenGL-style parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// Object-to-world transform. Translation is the light position, -Z the
    /// spot direction.
    pub transform: Mat4,
    pub on: bool,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    /// Constant attenuation
    pub kc: f32,
    /// Linear attenuation
    pub kl: f32,
    /// Quadratic attenuation
    pub kq: f32,
    /// Half angle of the spot cone in degrees. 180 turns the spot off.
    pub spot_cutoff: f32,
    pub spot_exponent: f32,
}

impl Light {
    /// A point light: a sphere light without area.
    pub fn point(position: Vec3) -> Self {
        Self::sphere(position, 0.0, [1, 1])
    }

    /// A spherical area light.
    pub fn sphere(position: Vec3, radius: f32, samples: [u32; 2]) -> Self {
        Self {
            kind: LightKind::Sphere {
                radius: radius.max(0.0),
                samples: [samples[0].max(1), samples[1].max(1)],
            },
            transform: Mat4::from_translation(position),
            on: true,
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            kc: 1.0,
            kl: 0.0,
            kq: 0.0,
            spot_cutoff: 180.0,
            spot_exponent: 1.0,
        }
    }

    /// A rectangular area light. Even sample counts are raised to the next
    /// odd number so that the grid has a center row and column.
    pub fn rect(transform: Mat4, width: f32, height: f32, samples: [u32; 2]) -> Self {
        let odd = |n: u32| {
            let n = n.max(1);
            if n % 2 == 0 {
                log::warn!("Rect light sample count {} is even, using {}", n, n + 1);
                n + 1
            } else {
                n
            }
        };
        Self {
            kind: LightKind::Rect {
                width,
                height,
                samples: [odd(samples[0]), odd(samples[1])],
            },
            transform,
            ..Self::point(Vec3::ZERO)
        }
    }

    pub fn with_colors(mut self, ambient: Color, diffuse: Color, specular: Color) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }

    pub fn with_attenuation(mut self, kc: f32, kl: f32, kq: f32) -> Self {
        self.kc = kc;
        self.kl = kl;
        self.kq = kq;
        self
    }

    /// Turn the light into a spot light aimed at `target`.
    pub fn with_spot(mut self, target: Vec3, cutoff_deg: f32, exponent: f32) -> Self {
        self.transform = aim(self.position_ws(), target);
        self.spot_cutoff = cutoff_deg.clamp(0.0, 180.0);
        self.spot_exponent = exponent;
        self
    }

    /// Rotate the light so that -Z points at `target`, keeping its position.
    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.transform = aim(self.position_ws(), target);
        self
    }

    pub fn with_on(mut self, on: bool) -> Self {
        self.on = on;
        self
    }

    /// World-space position.
    pub fn position_ws(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// World-space spot direction (local -Z).
    pub fn spot_dir_ws(&self) -> Vec3 {
        (-self.transform.z_axis.truncate()).normalize_or_zero()
    }

    /// Cosine of the spot cutoff angle.
    pub fn spot_cos_cut(&self) -> f32 {
        self.spot_cutoff.to_radians().cos()
    }

    pub fn is_spot(&self) -> bool {
        self.spot_cutoff < 180.0
    }

    /// Distance attenuation `1 / (kc + kl*d + kq*d^2)`.
    pub fn attenuation(&self, dist: f32) -> f32 {
        let denom = self.kc + self.kl * dist + self.kq * dist * dist;
        if denom > 0.0 {
            1.0 / denom
        } else {
            1.0
        }
    }

    /// Total number of shadow samples.
    pub fn sample_count(&self) -> u32 {
        match self.kind {
            LightKind::Sphere { samples, .. } | LightKind::Rect { samples, .. } => {
                samples[0] * samples[1]
            }
        }
    }
}

/// Object-to-world matrix at `eye` whose -Z axis points at `target`.
fn aim(eye: Vec3, target: Vec3) -> Mat4 {
    let dir = (target - eye).normalize_or_zero();
    if dir == Vec3::ZERO {
        return Mat4::from_translation(eye);
    }
    let up = if dir.y.abs() > 0.999 { Vec3::Z } else { Vec3::Y };
    Mat4::look_at_rh(eye, target, up).inverse()
}
