//! Distance fog blended over traced colors.

use glint_math::Color;

/// Fog falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FogMode {
    /// Linear ramp between two distances.
    Linear { start: f32, end: f32 },
    /// `exp(-density * z)`
    Exp { density: f32 },
    /// `exp(-(density * z)^2)`
    Exp2 { density: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub mode: FogMode,
    pub color: Color,
}

impl Fog {
    pub fn new(mode: FogMode, color: Color) -> Self {
        Self { mode, color }
    }

    /// Visibility at distance `z`: 1 is clear, 0 is fully fogged.
    pub fn factor(&self, z: f32) -> f32 {
        let f = match self.mode {
            FogMode::Linear { start, end } => {
                if end == start {
                    if z < end {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    (end - z) / (end - start)
                }
            }
            FogMode::Exp { density } => (-density * z).exp(),
            FogMode::Exp2 { density } => {
                let dz = density * z;
                (-dz * dz).exp()
            }
        };
        f.clamp(0.0, 1.0)
    }

    /// Blend `color` toward the fog color for a hit at distance `z`.
    pub fn blend(&self, color: Color, z: f32) -> Color {
        let f = self.factor(z);
        f * color + (1.0 - f) * self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_math::Vec3;

    #[test]
    fn test_linear_fog() {
        let fog = Fog::new(FogMode::Linear { start: 10.0, end: 20.0 }, Vec3::ONE);
        assert_eq!(fog.factor(5.0), 1.0);
        assert!((fog.factor(15.0) - 0.5).abs() < 1e-6);
        assert_eq!(fog.factor(30.0), 0.0);
        assert_eq!(fog.blend(Vec3::ZERO, 30.0), Vec3::ONE);
    }

    #[test]
    fn test_exponential_fog() {
        let exp = Fog::new(FogMode::Exp { density: 0.1 }, Vec3::ZERO);
        let exp2 = Fog::new(FogMode::Exp2 { density: 0.1 }, Vec3::ZERO);
        assert!((exp.factor(10.0) - (-1.0_f32).exp()).abs() < 1e-6);
        assert!((exp2.factor(10.0) - (-1.0_f32).exp()).abs() < 1e-6);
        assert!(exp2.factor(5.0) > exp.factor(5.0));
    }
}
