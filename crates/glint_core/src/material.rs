//! Surface description consumed by the shading evaluator.
//!
//! Materials are plain coefficient records. Colors are linear RGB.

use glint_math::{Color, Vec3};

/// Classic Phong material with Whitted reflection/refraction coefficients.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name (for logs)
    pub name: String,

    /// Ambient reflectance, scaled by the scene's global ambient light
    pub ambient: Color,

    /// Diffuse reflectance
    pub diffuse: Color,

    /// Specular reflectance
    pub specular: Color,

    /// Emitted color, added unconditionally
    pub emission: Color,

    /// Phong exponent of the specular highlight
    pub shininess: f32,

    /// Mirror reflectivity (also F0 of the Fresnel blend for transmissive materials)
    pub kr: f32,

    /// Transmissivity
    pub kt: f32,

    /// Index of refraction
    pub kn: f32,

    /// Opacity (1 = opaque). Values below 1 blend in the refracted color.
    pub opacity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            ambient: Vec3::splat(0.2),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::ZERO,
            emission: Vec3::ZERO,
            shininess: 100.0,
            kr: 0.0,
            kt: 0.0,
            kn: 1.0,
            opacity: 1.0,
        }
    }
}

impl Material {
    /// Create a diffuse material. Ambient follows the diffuse color.
    pub fn new(name: impl Into<String>, diffuse: Color) -> Self {
        Self {
            name: name.into(),
            ambient: diffuse,
            diffuse,
            ..Default::default()
        }
    }

    /// A perfect mirror with a white highlight.
    pub fn mirror(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            specular: Vec3::ONE,
            kr: 1.0,
            ..Default::default()
        }
    }

    /// A clear dielectric. `kr` becomes F0 of the Fresnel blend.
    pub fn glass(name: impl Into<String>, kn: f32) -> Self {
        // F0 from the index of refraction against air.
        let f0 = ((kn - 1.0) / (kn + 1.0)).powi(2);
        Self {
            name: name.into(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            specular: Vec3::ONE,
            shininess: 200.0,
            kr: f0,
            kt: 1.0,
            kn,
            ..Default::default()
        }
    }

    /// An emissive surface that ignores lighting.
    pub fn emissive(name: impl Into<String>, emission: Color) -> Self {
        Self {
            name: name.into(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            emission,
            ..Default::default()
        }
    }

    pub fn with_ambient(mut self, ambient: Color) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_specular(mut self, specular: Color, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    pub fn with_emission(mut self, emission: Color) -> Self {
        self.emission = emission;
        self
    }

    pub fn with_reflectivity(mut self, kr: f32) -> Self {
        self.kr = kr;
        self
    }

    pub fn with_transmission(mut self, kt: f32, kn: f32) -> Self {
        self.kt = kt;
        self.kn = kn;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// True if light passes through the surface, either by transmission or
    /// by partial opacity. Such occluders only attenuate shadow rays.
    pub fn is_transparent(&self) -> bool {
        self.kt > 0.0 || self.opacity < 1.0
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emission.length_squared() > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diffuse_material() {
        let m = Material::new("red", Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(m.ambient, m.diffuse);
        assert!(!m.is_transparent());
        assert!(!m.is_emissive());
    }

    #[test]
    fn test_glass_fresnel_f0() {
        let m = Material::glass("glass", 1.5);
        assert!((m.kr - 0.04).abs() < 1e-6);
        assert!(m.is_transparent());
    }

    #[test]
    fn test_opacity_is_clamped() {
        let m = Material::default().with_opacity(1.5);
        assert_eq!(m.opacity, 1.0);
        let m = Material::default().with_opacity(0.25);
        assert!(m.is_transparent());
    }
}
