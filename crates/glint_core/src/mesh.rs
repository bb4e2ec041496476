//! Triangle mesh geometry.
//!
//! Meshes live in the scene's mesh table and are referenced by shape nodes.
//! Triangles are counter-clockwise when seen from the side their geometric
//! normal `(v1 - v0) x (v2 - v0)` points to.

use glint_math::{Aabb, Vec2, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::scene::MaterialId;

/// A mesh consisting of vertex positions, optional normals, and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Mesh name (for logs and errors)
    pub name: String,

    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals. Face normals are used when absent.
    pub normals: Option<Vec<Vec3>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box in object space
    pub bounds: Aabb,

    /// Material of every triangle
    pub material: MaterialId,

    /// True if the mesh encloses a volume. Rays from outside are then
    /// back-face culled and rays travelling inside can only hit this mesh.
    pub is_volume: bool,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Aabb::from_point_cloud(&positions);
        Self {
            name: String::from("mesh"),
            positions,
            normals,
            indices,
            bounds,
            material: MaterialId::DEFAULT,
            is_volume: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    pub fn with_volume(mut self, is_volume: bool) -> Self {
        self.is_volume = is_volume;
        self
    }

    /// Flat rectangle in the XY plane at z = 0, facing +Z, split into
    /// `nx * ny` quads.
    pub fn plane(min: Vec2, max: Vec2, nx: u32, ny: u32) -> Self {
        let nx = nx.max(1);
        let ny = ny.max(1);
        let mut positions = Vec::with_capacity(((nx + 1) * (ny + 1)) as usize);
        for j in 0..=ny {
            for i in 0..=nx {
                let s = i as f32 / nx as f32;
                let t = j as f32 / ny as f32;
                positions.push(Vec3::new(
                    min.x + s * (max.x - min.x),
                    min.y + t * (max.y - min.y),
                    0.0,
                ));
            }
        }

        let mut indices = Vec::with_capacity((nx * ny * 6) as usize);
        let row = nx + 1;
        for j in 0..ny {
            for i in 0..nx {
                let a = j * row + i;
                let b = a + 1;
                let c = a + row + 1;
                let d = a + row;
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }

        let normals = vec![Vec3::Z; positions.len()];
        Self::new(positions, indices, Some(normals)).with_name("plane")
    }

    /// Rectangle made of two triangles, see [`Mesh::plane`].
    pub fn rectangle(min: Vec2, max: Vec2) -> Self {
        Self::plane(min, max, 1, 1).with_name("rectangle")
    }

    /// Closed axis-aligned box with flat faces.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let center = (min + max) * 0.5;
        let half = (max - min).abs() * 0.5;

        // (normal, u, v) with u x v = normal
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (n, u, v) in faces {
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push(center + half * (n + su * u + sv * v));
                normals.push(n);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new(positions, indices, Some(normals))
            .with_name("box")
            .with_volume(true)
    }

    /// Closed UV sphere centered at the origin with smooth normals.
    pub fn sphere(radius: f32, slices: u32, stacks: u32) -> Self {
        let slices = slices.max(3);
        let stacks = stacks.max(2);
        let mut positions = Vec::with_capacity(((slices + 1) * (stacks + 1)) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());

        for i in 0..=stacks {
            let theta = std::f32::consts::PI * i as f32 / stacks as f32;
            let (sin_t, cos_t) = theta.sin_cos();
            for j in 0..=slices {
                let phi = std::f32::consts::TAU * j as f32 / slices as f32;
                let (sin_p, cos_p) = phi.sin_cos();
                let n = Vec3::new(sin_t * cos_p, cos_t, sin_t * sin_p);
                positions.push(n * radius);
                normals.push(n);
            }
        }

        let row = slices + 1;
        let mut indices = Vec::new();
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = a + row;
                let c = b + 1;
                let d = a + 1;
                // Skip the triangles that collapse at the poles.
                if i != stacks - 1 {
                    indices.extend_from_slice(&[a, c, b]);
                }
                if i != 0 {
                    indices.extend_from_slice(&[a, d, c]);
                }
            }
        }

        Self::new(positions, indices, Some(normals))
            .with_name("sphere")
            .with_volume(true)
    }

    /// Check indices and normals against the vertex count.
    pub fn validate(&self) -> SceneResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(SceneError::InvalidMesh {
                mesh: self.name.clone(),
                message: format!("index count {} is not a multiple of 3", self.indices.len()),
            });
        }
        if let Some(&index) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.positions.len())
        {
            return Err(SceneError::IndexOutOfRange {
                mesh: self.name.clone(),
                index,
                vertex_count: self.positions.len(),
            });
        }
        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(SceneError::InvalidMesh {
                    mesh: self.name.clone(),
                    message: format!(
                        "{} normals for {} vertices",
                        normals.len(),
                        self.positions.len()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Compute smooth vertex normals by averaging area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }
            let face_normal =
                (self.positions[i1] - self.positions[i0]).cross(self.positions[i2] - self.positions[i0]);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.normalize_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex indices of triangle `tri`.
    #[inline]
    pub fn triangle_indices(&self, tri: usize) -> [usize; 3] {
        let i = tri * 3;
        [
            self.indices[i] as usize,
            self.indices[i + 1] as usize,
            self.indices[i + 2] as usize,
        ]
    }

    /// Vertex positions of triangle `tri`.
    #[inline]
    pub fn triangle(&self, tri: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangle_indices(tri);
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Unit geometric normal of triangle `tri` (zero if degenerate).
    pub fn face_normal(&self, tri: usize) -> Vec3 {
        let [v0, v1, v2] = self.triangle(tri);
        (v1 - v0).cross(v2 - v0).normalize_or_zero()
    }

    /// Object-space shading normal at barycentric `(u, v)` of triangle `tri`.
    pub fn shading_normal(&self, tri: usize, u: f32, v: f32) -> Vec3 {
        match &self.normals {
            Some(normals) => {
                let [a, b, c] = self.triangle_indices(tri);
                let n = (1.0 - u - v) * normals[a] + u * normals[b] + v * normals[c];
                let n = n.normalize_or_zero();
                if n == Vec3::ZERO {
                    self.face_normal(tri)
                } else {
                    n
                }
            }
            None => self.face_normal(tri),
        }
    }
}
