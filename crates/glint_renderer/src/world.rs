//! Render-ready scene: the scene graph plus one acceleration structure per
//! mesh, and the hit dispatcher that walks them.
//!
//! The dispatcher descends the node arena recursively. At every node the
//! ray is moved into the node's object space and tested against the node's
//! cached subtree box; only then are children, referenced nodes or the
//! mesh's grid visited. Directions are transformed without renormalizing,
//! so the ray's `length` stays comparable in every space.

use glint_core::{Camera, MeshId, NodeId, NodeKind, Scene, SceneError};
use glint_math::Mat4;

use crate::grid::{UniformGrid, MIN_GRID_TRIANGLES};
use crate::ray::{Hit, LocalRay, PrimitiveRef, Ray};
use crate::stats::RenderStats;
use crate::triangle::TriangleQuery;

/// A scene prepared for ray queries.
pub struct World {
    scene: Scene,
    grids: Vec<Option<UniformGrid>>,
}

impl World {
    /// Update the scene's transforms and bounds and build the mesh grids.
    pub fn new(mut scene: Scene) -> Result<Self, SceneError> {
        scene.update()?;

        let grids: Vec<Option<UniformGrid>> = scene
            .meshes()
            .iter()
            .map(|mesh| {
                if mesh.triangle_count() >= MIN_GRID_TRIANGLES {
                    Some(UniformGrid::build(mesh))
                } else {
                    None
                }
            })
            .collect();

        log::info!(
            "World ready: {} nodes, {} meshes ({} with grids), {} triangles, {} lights",
            scene.node_count(),
            scene.meshes().len(),
            grids.iter().filter(|g| g.is_some()).count(),
            scene.triangle_count(),
            scene.lights().len()
        );

        Ok(Self { scene, grids })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Give the scene back, for example to edit geometry and rebuild.
    pub fn into_scene(self) -> Scene {
        self.scene
    }

    /// Move the camera. Geometry stays untouched.
    pub fn set_camera(&mut self, camera: Camera) {
        self.scene.camera = Some(camera);
    }

    /// Grid of a mesh, if it has enough triangles for one.
    pub fn grid(&self, mesh: MeshId) -> Option<&UniformGrid> {
        self.grids.get(mesh.index()).and_then(Option::as_ref)
    }

    /// Intersect `ray` with the scene.
    ///
    /// Closest-hit for all rays except shadow rays, which stop at the first
    /// occluder. On success `ray.length` and `ray.hit` describe the hit.
    pub fn hit(&self, ray: &mut Ray, stats: &mut RenderStats) -> bool {
        if !ray.is_valid() {
            return false;
        }
        self.hit_node(self.scene.root(), ray, &Mat4::IDENTITY, None, stats)
    }

    fn hit_node(
        &self,
        id: NodeId,
        ray: &mut Ray,
        to_parent: &Mat4,
        attributed: Option<NodeId>,
        stats: &mut RenderStats,
    ) -> bool {
        let node = self.scene.node(id);
        let bounds = node.bounds();
        if node.hidden || !bounds.visible || bounds.is_empty() {
            return false;
        }

        let to_object = *node.local_inv() * *to_parent;
        let local = ray.to_object(&to_object);
        let span = bounds.os.slab(local.origin, local.inv_dir, local.sign);
        if span.is_empty() || span.max <= ray.t_min || span.min >= ray.length {
            return false;
        }

        match &node.kind {
            NodeKind::Group { children } => {
                let shadow = ray.is_shadow();
                let mut hit = false;
                for &child in children {
                    if self.hit_node(child, ray, &to_object, attributed, stats) {
                        hit = true;
                        if shadow {
                            return true;
                        }
                    }
                }
                hit
            }
            NodeKind::Reference { target } => {
                self.hit_node(*target, ray, &to_object, attributed.or(Some(id)), stats)
            }
            NodeKind::Shape { mesh } => {
                self.hit_shape(attributed.unwrap_or(id), id, *mesh, ray, &local, &to_object, stats)
            }
        }
    }

    /// Intersect the mesh of `shape`, drawn as `node`.
    #[allow(clippy::too_many_arguments)]
    fn hit_shape(
        &self,
        node: NodeId,
        shape: NodeId,
        mesh_id: MeshId,
        ray: &mut Ray,
        local: &LocalRay,
        to_object: &Mat4,
        stats: &mut RenderStats,
    ) -> bool {
        let from_here = ray.source.filter(|s| s.node == node && s.shape == shape);

        // Shadow rays never test the shape they start on.
        if ray.is_shadow() && from_here.is_some() {
            return false;
        }
        // A ray travelling inside a closed volume can only leave through it.
        if !ray.is_outside && from_here.is_none() {
            return false;
        }

        let mesh = self.scene.mesh(mesh_id);
        let skip = from_here.map(|s| s.triangle);
        let mut query = TriangleQuery::new(mesh, local, ray.t_min, ray.length)
            .with_culling(ray.is_outside && mesh.is_volume)
            .skipping(skip)
            .any_hit(ray.is_shadow());

        let found = match &self.grids[mesh_id.index()] {
            Some(grid) => grid.traverse(local, &mut query),
            None => query.brute_force(),
        };
        stats.intersection_tests += query.tests;

        match query.hit {
            Some(h) if found => {
                stats.intersections += 1;
                ray.record(
                    h.t,
                    Hit {
                        primitive: PrimitiveRef {
                            node,
                            shape,
                            mesh: mesh_id,
                            triangle: h.triangle,
                        },
                        u: h.u,
                        v: h.v,
                        world_to_object: *to_object,
                    },
                );
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ray::RayRole;
    use glint_core::{Material, Mesh};
    use glint_math::{Vec2, Vec3};

    fn quad_scene() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let mesh = scene
            .add_mesh(Mesh::rectangle(Vec2::splat(-0.5), Vec2::splat(0.5)))
            .unwrap();
        let root = scene.root();
        let quad = scene
            .add_shape(Some(root), "quad", mesh, Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)))
            .unwrap();
        (scene, quad)
    }

    #[test]
    fn test_hit_transformed_shape() {
        let (scene, quad) = quad_scene();
        let world = World::new(scene).unwrap();
        let mut stats = RenderStats::default();

        let mut ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, RayRole::Primary);
        assert!(world.hit(&mut ray, &mut stats), "Ray should hit the quad");
        assert!((ray.length - 3.0).abs() < 1e-5);
        assert_eq!(ray.hit.unwrap().primitive.node, quad);
        assert!(stats.intersection_tests > 0);
        assert_eq!(stats.intersections, 1);

        let mut miss = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, -1.0), RayRole::Primary);
        assert!(!world.hit(&mut miss, &mut stats));
        assert_eq!(miss.length, f32::MAX);
    }

    #[test]
    fn test_scaled_shape_keeps_world_distance() {
        let mut scene = Scene::new();
        let mesh = scene
            .add_mesh(Mesh::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0)))
            .unwrap();
        let root = scene.root();
        let local = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)) * Mat4::from_scale(Vec3::splat(3.0));
        scene.add_shape(Some(root), "box", mesh, local).unwrap();
        let world = World::new(scene).unwrap();

        let mut ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, RayRole::Primary);
        assert!(world.hit(&mut ray, &mut RenderStats::default()));
        // Front face at z = -7
        assert!((ray.length - 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_references_share_geometry() {
        let mut scene = Scene::new();
        let mesh = scene
            .add_mesh(Mesh::rectangle(Vec2::splat(-0.5), Vec2::splat(0.5)))
            .unwrap();
        let proto = scene.add_shape(None, "proto", mesh, Mat4::IDENTITY).unwrap();
        let root = scene.root();
        let left = scene
            .add_reference(Some(root), "left", proto, Mat4::from_translation(Vec3::new(-2.0, 0.0, -5.0)))
            .unwrap();
        let right = scene
            .add_reference(Some(root), "right", proto, Mat4::from_translation(Vec3::new(2.0, 0.0, -5.0)))
            .unwrap();
        let world = World::new(scene).unwrap();
        let mut stats = RenderStats::default();

        let mut ray = Ray::new(Vec3::new(-2.0, 0.0, 0.0), Vec3::NEG_Z, RayRole::Primary);
        assert!(world.hit(&mut ray, &mut stats));
        assert_eq!(ray.hit.unwrap().primitive.node, left);

        let mut ray = Ray::new(Vec3::new(2.0, 0.0, 0.0), Vec3::NEG_Z, RayRole::Primary);
        assert!(world.hit(&mut ray, &mut stats));
        assert_eq!(ray.hit.unwrap().primitive.node, right);
        assert!((ray.length - 5.0).abs() < 1e-5);

        let mut ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, RayRole::Primary);
        assert!(!world.hit(&mut ray, &mut stats), "Prototype itself is not drawn");
    }

    #[test]
    fn test_nested_references_attribute_outermost() {
        let mut scene = Scene::new();
        let mesh = scene
            .add_mesh(Mesh::rectangle(Vec2::splat(-0.5), Vec2::splat(0.5)))
            .unwrap();
        let proto = scene.add_shape(None, "proto", mesh, Mat4::IDENTITY).unwrap();
        let inner = scene
            .add_reference(None, "inner", proto, Mat4::from_translation(Vec3::X))
            .unwrap();
        let root = scene.root();
        let outer = scene
            .add_reference(Some(root), "outer", inner, Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0)))
            .unwrap();
        let world = World::new(scene).unwrap();

        let mut ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::NEG_Z, RayRole::Primary);
        assert!(world.hit(&mut ray, &mut RenderStats::default()));
        let hit = ray.hit.unwrap();
        assert_eq!(hit.primitive.node, outer);
        assert_eq!(hit.primitive.mesh, mesh);
        assert!((ray.length - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_hidden_nodes_are_skipped() {
        let (mut scene, quad) = quad_scene();
        scene.set_hidden(quad, true).unwrap();
        let world = World::new(scene).unwrap();
        let mut ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z, RayRole::Primary);
        assert!(!world.hit(&mut ray, &mut RenderStats::default()));
    }

    #[test]
    fn test_shadow_ray_skips_source_and_respects_length() {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::new("grey", Vec3::splat(0.5)));
        let mesh = scene
            .add_mesh(Mesh::rectangle(Vec2::splat(-1.0), Vec2::splat(1.0)).with_material(mat))
            .unwrap();
        let root = scene.root();
        let floor = scene
            .add_shape(Some(root), "floor", mesh, Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2))
            .unwrap();
        scene
            .add_shape(Some(root), "blocker", mesh, Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)) * Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2))
            .unwrap();
        let world = World::new(scene).unwrap();
        let mut stats = RenderStats::default();

        // Primary ray down onto the floor.
        let mut primary = Ray::new(Vec3::new(0.2, 5.0, 0.3), Vec3::NEG_Y, RayRole::Primary);
        // The blocker is hit first from above.
        assert!(world.hit(&mut primary, &mut stats));
        assert_ne!(primary.hit.unwrap().primitive.node, floor);

        // Start below the blocker instead.
        let mut primary = Ray::new(Vec3::new(0.2, 1.0, 0.3), Vec3::NEG_Y, RayRole::Primary);
        assert!(world.hit(&mut primary, &mut stats));
        assert_eq!(primary.hit.unwrap().primitive.node, floor);
        let point = primary.at(primary.length);

        let mut blocked = primary.shadow(point, Vec3::Y, 10.0);
        assert!(world.hit(&mut blocked, &mut stats), "Blocker occludes the light");

        let mut short = primary.shadow(point, Vec3::Y, 1.5);
        assert!(!world.hit(&mut short, &mut stats), "Light sits below the blocker");
    }

    /// A floor and a blocker two units above it, sharing one mesh, in a
    /// detached group drawn once through a reference at x = 5.
    fn instanced_pair() -> (World, NodeId, NodeId, NodeId) {
        let mut scene = Scene::new();
        let mesh = scene
            .add_mesh(Mesh::rectangle(Vec2::splat(-1.0), Vec2::splat(1.0)))
            .unwrap();
        let pair = scene.add_group(None, "pair", Mat4::IDENTITY).unwrap();
        let flat = Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2);
        let floor = scene.add_shape(Some(pair), "floor", mesh, flat).unwrap();
        let blocker = scene
            .add_shape(Some(pair), "blocker", mesh, Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)) * flat)
            .unwrap();
        let root = scene.root();
        let instance = scene
            .add_reference(Some(root), "instance", pair, Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)))
            .unwrap();
        (World::new(scene).unwrap(), instance, floor, blocker)
    }

    #[test]
    fn test_shapes_in_one_instance_shadow_each_other() {
        let (world, instance, floor, _) = instanced_pair();
        let mut stats = RenderStats::default();

        let mut primary = Ray::new(Vec3::new(5.2, 1.0, 0.3), Vec3::NEG_Y, RayRole::Primary);
        assert!(world.hit(&mut primary, &mut stats));
        let hit = primary.hit.unwrap().primitive;
        assert_eq!((hit.node, hit.shape), (instance, floor));

        let point = primary.at(primary.length);
        let mut shadow = primary.shadow(point, Vec3::Y, 4.0);
        assert!(world.hit(&mut shadow, &mut stats), "Blocker in the same instance occludes the light");
    }

    #[test]
    fn test_ray_leaving_instanced_shape_hits_sibling_with_same_mesh() {
        let (world, instance, floor, blocker) = instanced_pair();
        let mut stats = RenderStats::default();

        let mut primary = Ray::new(Vec3::new(5.2, 5.0, 0.3), Vec3::NEG_Y, RayRole::Primary);
        assert!(world.hit(&mut primary, &mut stats));
        let first = primary.hit.unwrap().primitive;
        assert_eq!((first.node, first.shape), (instance, blocker));

        // An open surface lets the refracted ray continue straight down.
        let point = primary.at(primary.length);
        let (mut through, _) = primary.refracted(point, Vec3::Y, 1.0, false, 1.0);
        assert!(world.hit(&mut through, &mut stats), "Ray passed through the floor");
        let second = through.hit.unwrap().primitive;
        assert_eq!((second.node, second.shape), (instance, floor));
        assert_eq!(second.triangle, first.triangle);
        assert!((through.length - 2.0).abs() < 1e-4);
    }
}
