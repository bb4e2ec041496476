//! Uniform grid acceleration structure.
//!
//! Each mesh with enough triangles gets a voxel grid over its object-space
//! bounds. The resolution follows Woo's heuristic: about
//! `(GRID_DENSITY * triangles)^(1/3)` voxels along the longest axis, the
//! other axes in proportion to their extent. Triangles are inserted into
//! the voxels they overlap (exact SAT test), then the buckets are frozen
//! into one flat index array.
//!
//! Queries walk the voxels along the ray with the Amanatides-Woo
//! incremental algorithm and stop as soon as a hit lies inside the voxel
//! being left.

use glint_core::Mesh;
use glint_math::{Aabb, Vec3};

use crate::ray::LocalRay;
use crate::tri_box::triangle_box_overlap;
use crate::triangle::TriangleQuery;

/// Target voxels per triangle (cubed root taken over the whole grid).
pub const GRID_DENSITY: f32 = 20.0;

/// Meshes with fewer triangles are tested brute force.
pub const MIN_GRID_TRIANGLES: usize = 8;

/// Upper bound of the resolution along one axis.
pub const MAX_GRID_RESOLUTION: usize = 256;

/// Occupancy figures of a built grid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GridStats {
    pub voxels: usize,
    pub empty_voxels: usize,
    /// Most triangles in a single voxel
    pub max_per_voxel: usize,
    /// Mean triangles per non-empty voxel
    pub avg_per_voxel: f32,
}

/// Frozen voxel grid over one mesh.
#[derive(Debug, Clone)]
pub struct UniformGrid {
    bounds: Aabb,
    resolution: [usize; 3],
    voxel_size: Vec3,
    /// `offsets[i]..offsets[i + 1]` is the slice of `items` for voxel `i`
    offsets: Vec<u32>,
    items: Vec<u32>,
    stats: GridStats,
}

impl UniformGrid {
    /// Build a grid over `mesh` in its object space.
    pub fn build(mesh: &Mesh) -> Self {
        let bounds = mesh.bounds;
        let resolution = Self::resolution_for(&bounds, mesh.triangle_count());
        let extent = bounds.extent();
        let voxel_size = Vec3::new(
            extent.x / resolution[0] as f32,
            extent.y / resolution[1] as f32,
            extent.z / resolution[2] as f32,
        );
        let voxel_count = resolution[0] * resolution[1] * resolution[2];

        // Slightly enlarged voxels keep triangles lying on a voxel face in
        // both neighbours.
        let half = voxel_size * (0.5 + 1.0e-4);
        let min = bounds.min();

        let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); voxel_count];
        for tri in 0..mesh.triangle_count() {
            let verts = mesh.triangle(tri);
            let lo = verts[0].min(verts[1]).min(verts[2]);
            let hi = verts[0].max(verts[1]).max(verts[2]);
            let c0 = Self::cell_of(lo, min, voxel_size, resolution);
            let c1 = Self::cell_of(hi, min, voxel_size, resolution);

            for z in c0[2]..=c1[2] {
                for y in c0[1]..=c1[1] {
                    for x in c0[0]..=c1[0] {
                        let center = min
                            + Vec3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5) * voxel_size;
                        if triangle_box_overlap(center, half, &verts) {
                            buckets[x + resolution[0] * (y + resolution[1] * z)].push(tri as u32);
                        }
                    }
                }
            }
        }

        let mut offsets = Vec::with_capacity(voxel_count + 1);
        let mut items = Vec::with_capacity(buckets.iter().map(Vec::len).sum());
        let mut stats = GridStats {
            voxels: voxel_count,
            ..Default::default()
        };
        offsets.push(0);
        for bucket in &buckets {
            if bucket.is_empty() {
                stats.empty_voxels += 1;
            }
            stats.max_per_voxel = stats.max_per_voxel.max(bucket.len());
            items.extend_from_slice(bucket);
            offsets.push(items.len() as u32);
        }
        let filled = voxel_count - stats.empty_voxels;
        if filled > 0 {
            stats.avg_per_voxel = items.len() as f32 / filled as f32;
        }

        log::debug!(
            "Grid '{}': {}x{}x{} = {} voxels, {} empty, max {} / avg {:.2} triangles per voxel",
            mesh.name,
            resolution[0],
            resolution[1],
            resolution[2],
            voxel_count,
            stats.empty_voxels,
            stats.max_per_voxel,
            stats.avg_per_voxel
        );

        Self {
            bounds,
            resolution,
            voxel_size,
            offsets,
            items,
            stats,
        }
    }

    /// Per-axis resolution for `triangles` triangles inside `bounds`.
    pub fn resolution_for(bounds: &Aabb, triangles: usize) -> [usize; 3] {
        let extent = bounds.extent();
        let max_size = extent.max_element();
        if !(max_size > 0.0) || triangles == 0 {
            return [1, 1, 1];
        }
        let nr = (GRID_DENSITY * triangles as f32).cbrt();
        let axis = |size: f32| ((nr * size / max_size) as usize).clamp(1, MAX_GRID_RESOLUTION);
        [axis(extent.x), axis(extent.y), axis(extent.z)]
    }

    fn cell_of(p: Vec3, min: Vec3, size: Vec3, res: [usize; 3]) -> [usize; 3] {
        let rel = (p - min) / size;
        let clamp = |v: f32, n: usize| {
            if v > 0.0 {
                (v as usize).min(n - 1)
            } else {
                0
            }
        };
        [clamp(rel.x, res[0]), clamp(rel.y, res[1]), clamp(rel.z, res[2])]
    }

    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn stats(&self) -> &GridStats {
        &self.stats
    }

    /// Triangles registered in voxel `(x, y, z)`.
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> &[u32] {
        let i = x + self.resolution[0] * (y + self.resolution[1] * z);
        &self.items[self.offsets[i] as usize..self.offsets[i + 1] as usize]
    }

    /// Population of every voxel in storage order.
    pub fn voxel_counts(&self) -> Vec<usize> {
        self.offsets
            .windows(2)
            .map(|w| (w[1] - w[0]) as usize)
            .collect()
    }

    /// Walk the voxels along `ray` and feed their triangles to `query`.
    ///
    /// Returns true if the query's window was narrowed by a hit.
    pub fn traverse(&self, ray: &LocalRay, query: &mut TriangleQuery) -> bool {
        let span = self.bounds.slab(ray.origin, ray.inv_dir, ray.sign);
        if span.is_empty() || span.max < 0.0 || span.min >= query.t_max {
            return false;
        }

        let t_enter = span.min.max(0.0);
        let entry = ray.origin + ray.dir * t_enter;
        let min = self.bounds.min();
        let cell = Self::cell_of(entry, min, self.voxel_size, self.resolution);
        let mut cell = [cell[0] as isize, cell[1] as isize, cell[2] as isize];

        let mut step = [0isize; 3];
        let mut t_next = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];
        for a in 0..3 {
            let size = self.voxel_size[a];
            if ray.dir[a] > 0.0 {
                step[a] = 1;
                let boundary = min[a] + (cell[a] + 1) as f32 * size;
                t_next[a] = (boundary - ray.origin[a]) * ray.inv_dir[a];
                t_delta[a] = size * ray.inv_dir[a];
            } else if ray.dir[a] < 0.0 {
                step[a] = -1;
                let boundary = min[a] + cell[a] as f32 * size;
                t_next[a] = (boundary - ray.origin[a]) * ray.inv_dir[a];
                t_delta[a] = -size * ray.inv_dir[a];
            }
        }

        let res = [
            self.resolution[0] as isize,
            self.resolution[1] as isize,
            self.resolution[2] as isize,
        ];
        let mut hit_any = false;

        loop {
            let (x, y, z) = (cell[0] as usize, cell[1] as usize, cell[2] as usize);
            for &tri in self.voxel(x, y, z) {
                if query.test(tri) {
                    hit_any = true;
                    if query.is_done() {
                        return true;
                    }
                }
            }

            let axis = if t_next[0] < t_next[1] {
                if t_next[0] < t_next[2] {
                    0
                } else {
                    2
                }
            } else if t_next[1] < t_next[2] {
                1
            } else {
                2
            };

            // Nothing beyond this voxel can be closer than the current best
            // hit, and nothing beyond the ray's length counts anyway.
            if t_next[axis] >= query.t_max {
                return hit_any;
            }

            cell[axis] += step[axis];
            if step[axis] == 0 || cell[axis] < 0 || cell[axis] >= res[axis] {
                return hit_any;
            }
            t_next[axis] += t_delta[axis];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_math::Vec2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_soup(rng: &mut StdRng, count: usize) -> Mesh {
        let mut positions = Vec::with_capacity(count * 3);
        for _ in 0..count {
            let center = Vec3::new(rng.gen_range(-4.0..4.0), rng.gen_range(-2.0..2.0), rng.gen_range(-3.0..3.0));
            for _ in 0..3 {
                let offset = Vec3::new(rng.gen_range(-0.6..0.6), rng.gen_range(-0.6..0.6), rng.gen_range(-0.6..0.6));
                positions.push(center + offset);
            }
        }
        let indices = (0..(count * 3) as u32).collect();
        Mesh::new(positions, indices, None)
    }

    fn random_dir(rng: &mut StdRng) -> Vec3 {
        loop {
            let v = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            if v.length_squared() > 0.01 && v.length_squared() <= 1.0 {
                return v.normalize();
            }
        }
    }

    #[test]
    fn test_resolution_heuristic() {
        let bounds = Aabb::from_points(Vec3::ZERO, Vec3::new(4.0, 2.0, 1.0));
        // (20 * 54)^(1/3) is about 10.26
        let res = UniformGrid::resolution_for(&bounds, 54);
        assert_eq!(res, [10, 5, 2]);

        let flat = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(UniformGrid::resolution_for(&flat, 50)[2], 1, "Thin axes keep one layer");
        assert_eq!(UniformGrid::resolution_for(&bounds, 0), [1, 1, 1]);
    }

    #[test]
    fn test_resolution_is_capped() {
        let bounds = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let res = UniformGrid::resolution_for(&bounds, 100_000_000);
        assert_eq!(res, [MAX_GRID_RESOLUTION; 3]);
    }

    #[test]
    fn test_every_triangle_is_registered() {
        let mut rng = StdRng::seed_from_u64(7);
        let mesh = random_soup(&mut rng, 100);
        let grid = UniformGrid::build(&mesh);

        let mut seen = vec![false; mesh.triangle_count()];
        let [rx, ry, rz] = grid.resolution();
        for z in 0..rz {
            for y in 0..ry {
                for x in 0..rx {
                    for &tri in grid.voxel(x, y, z) {
                        seen[tri as usize] = true;
                    }
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(grid.stats().voxels, rx * ry * rz);
        assert!(grid.stats().empty_voxels > 0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(11);
        let mesh = random_soup(&mut rng, 200);
        let a = UniformGrid::build(&mesh);
        let b = UniformGrid::build(&mesh);
        assert_eq!(a.resolution(), b.resolution());
        assert_eq!(a.voxel_counts(), b.voxel_counts());
        assert_eq!(a.stats(), b.stats());
    }

    #[test]
    fn test_grid_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let mesh = random_soup(&mut rng, 300);
        let grid = UniformGrid::build(&mesh);

        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for i in 0..2000 {
            let origin = Vec3::new(rng.gen_range(-8.0..8.0), rng.gen_range(-6.0..6.0), rng.gen_range(-7.0..7.0));
            let dir = if i % 4 == 0 {
                axes[i / 4 % axes.len()]
            } else if i % 4 == 1 {
                // Aim at the mesh so that most rays hit something.
                (mesh.positions[rng.gen_range(0..mesh.positions.len())] - origin).normalize()
            } else {
                random_dir(&mut rng)
            };
            let ray = LocalRay::new(origin, dir);

            let mut brute = TriangleQuery::new(&mesh, &ray, 0.0, f32::MAX);
            brute.brute_force();
            let mut walked = TriangleQuery::new(&mesh, &ray, 0.0, f32::MAX);
            grid.traverse(&ray, &mut walked);

            match (brute.hit, walked.hit) {
                (None, None) => {}
                (Some(b), Some(w)) => {
                    assert!((b.t - w.t).abs() < 1e-4, "ray {}: t {} vs {}", i, b.t, w.t);
                    if (b.t - w.t).abs() < 1e-6 {
                        continue;
                    }
                    assert_eq!(b.triangle, w.triangle, "ray {}", i);
                }
                (b, w) => panic!("ray {}: brute force {:?}, grid {:?}", i, b, w),
            }
        }
    }

    #[test]
    fn test_grid_respects_length_and_any_hit() {
        let mesh = Mesh::plane(Vec2::splat(-2.0), Vec2::splat(2.0), 8, 8);
        let grid = UniformGrid::build(&mesh);
        let ray = LocalRay::new(Vec3::new(0.3, 0.1, 5.0), Vec3::NEG_Z);

        let mut short = TriangleQuery::new(&mesh, &ray, 0.0, 4.0);
        assert!(!grid.traverse(&ray, &mut short));

        let mut any = TriangleQuery::new(&mesh, &ray, 0.0, f32::MAX).any_hit(true);
        assert!(grid.traverse(&ray, &mut any));
        assert!((any.t_max - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_grazing_ray_along_plane() {
        // A ray inside the plane of a flat mesh is parallel to every
        // triangle and must report no hit without looping forever.
        let mesh = Mesh::plane(Vec2::splat(-2.0), Vec2::splat(2.0), 8, 8);
        let grid = UniformGrid::build(&mesh);
        let ray = LocalRay::new(Vec3::new(-5.0, 0.3, 0.0), Vec3::X);
        let mut query = TriangleQuery::new(&mesh, &ray, 0.0, f32::MAX);
        assert!(!grid.traverse(&ray, &mut query));
    }
}
