//! Glint Core - scene description for the Glint ray tracer.
//!
//! This crate provides:
//!
//! - **Scene graph**: arena of group, shape and reference nodes with cached
//!   transforms and bounds
//! - **Geometry**: triangle meshes and primitive builders
//! - **Appearance**: materials, lights, camera and fog
//!
//! # Example
//!
//! ```ignore
//! use glint_core::{Camera, Light, Material, Mesh, Scene};
//! use glint_math::{Mat4, Vec3};
//!
//! let mut scene = Scene::new().with_camera(Camera::default());
//! let red = scene.add_material(Material::new("red", Vec3::new(1.0, 0.0, 0.0)));
//! let mesh = scene.add_mesh(Mesh::sphere(1.0, 32, 16).with_material(red))?;
//! scene.add_shape(Some(scene.root()), "ball", mesh, Mat4::IDENTITY)?;
//! scene.add_light(Light::point(Vec3::new(0.0, 5.0, 5.0)));
//! scene.update()?;
//! ```

pub mod camera;
pub mod error;
pub mod fog;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use camera::{Camera, CameraBasis};
pub use error::{SceneError, SceneResult};
pub use fog::{Fog, FogMode};
pub use light::{Light, LightKind};
pub use material::Material;
pub use mesh::Mesh;
pub use scene::{LightId, MaterialId, MeshId, Node, NodeId, NodeKind, Scene};
