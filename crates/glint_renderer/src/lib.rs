//! Glint Renderer - Whitted-style CPU ray tracing
//!
//! Traces primary, reflected, refracted and shadow rays through a
//! [`glint_core::Scene`] with OpenGL-style local illumination.
//!
//! - Meshes with enough triangles get a [`UniformGrid`] walked with
//!   Amanatides-Woo traversal; small meshes are tested brute force.
//! - [`World`] owns the scene and the grids and dispatches ray queries
//!   through group, shape and reference nodes.
//! - [`Raytracer`] renders scanlines in parallel with rayon, then
//!   resamples high-contrast pixels.

mod config;
mod error;
mod grid;
mod image;
mod ray;
mod raytracer;
mod sampling;
mod stats;
mod tracer;
mod tri_box;
mod triangle;
mod world;

pub use config::{ConfigError, RenderConfig};
pub use error::{RenderError, RenderResult};
pub use grid::{GridStats, UniformGrid, GRID_DENSITY, MAX_GRID_RESOLUTION, MIN_GRID_TRIANGLES};
pub use image::{clamp_01, color_to_rgba, ImageBuffer};
pub use ray::{Hit, LocalRay, PrimitiveRef, Ray, RayRole, SECONDARY_T_MIN};
pub use raytracer::{
    pixels_to_resample, ChannelProgress, ProgressSink, RenderHandle, RenderOutcome, RenderProgress, RenderState,
    Raytracer, ViewPlane,
};
pub use sampling::{disc_point, jittered_disc_point};
pub use stats::RenderStats;
pub use tracer::{schlick, SurfacePoint, Tracer};
pub use tri_box::triangle_box_overlap;
pub use triangle::{intersect_triangle, TriangleHit, TriangleQuery};
pub use world::World;

/// Re-export math types from glint_math
pub use glint_math::{Aabb, Color, Interval, Vec3};
