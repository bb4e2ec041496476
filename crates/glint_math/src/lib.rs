// Re-export glam for convenience
pub use glam::*;

// Glint math types
mod aabb;
mod bounds;
mod interval;
mod transform;

pub use aabb::Aabb;
pub use bounds::NodeBounds;
pub use interval::Interval;
pub use transform::Mat4Ext;

/// Small tolerance used for self-intersection and shadow distance checks.
pub const EPSILON: f32 = 1.0e-4;

/// Linear RGB color. Components are usually in `[0, 1]` but may exceed it
/// before clamping.
pub type Color = Vec3;
