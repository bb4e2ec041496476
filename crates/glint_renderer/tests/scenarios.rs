//! End-to-end renders of small scenes.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicU32, Ordering};

use glint_core::{Camera, Light, Material, Mesh, Scene};
use glint_math::{Color, Mat4, Vec2, Vec3};
use glint_renderer::{ImageBuffer, RenderConfig, RenderProgress, RenderState, Raytracer, ViewPlane, World};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn camera() -> Camera {
    Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO).with_fov(45.0)
}

#[test]
fn red_sphere_under_point_light() {
    init_logger();
    let background = Color::new(0.1, 0.1, 0.3);
    let mut scene = Scene::new().with_camera(camera()).with_background(background);
    let red = scene.add_material(Material::new("red", Color::new(1.0, 0.0, 0.0)));
    let sphere = scene
        .add_mesh(Mesh::sphere(1.0, 48, 24).with_material(red))
        .unwrap();
    let root = scene.root();
    scene.add_shape(Some(root), "sphere", sphere, Mat4::IDENTITY).unwrap();
    scene.add_light(Light::point(Vec3::new(0.0, 5.0, 5.0)).with_attenuation(1.0, 0.0, 0.0));
    let world = World::new(scene).unwrap();

    let config = RenderConfig::default()
        .with_resolution(64, 64)
        .with_max_depth(1)
        .with_aa(1, 0.3);
    let (image, outcome) = Raytracer::new(config).render(&world).unwrap();

    let center = image.get(32, 32);
    assert!(center.x > 0.0, "center pixel is {center}");
    assert_eq!(center.y, 0.0);
    assert_eq!(center.z, 0.0);
    for (x, y) in [(0, 0), (63, 0), (0, 63), (63, 63)] {
        assert_eq!(image.get(x, y), background, "corner ({x}, {y})");
    }

    assert_eq!(outcome.state, RenderState::Finished);
    assert_eq!(outcome.stats.primary_rays, 64 * 64);
    assert_eq!(outcome.stats.reflected_rays, 0);
    assert_eq!(outcome.stats.max_depth_reached, 1);
    assert!(outcome.stats.shadow_rays > 0);
}

/// Where the reflection of the primary ray through `(x, y)` off an ideal
/// unit sphere meets the plane `z = wall_z`, if it hits the sphere at all.
fn predicted_wall_point(view: &ViewPlane, x: u32, y: u32, wall_z: f32) -> Option<Vec3> {
    let d = view.direction(x as f32, y as f32).normalize();
    let e = view.eye;
    let b = e.dot(d);
    let disc = b * b - (e.length_squared() - 1.0);
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    let p = e + t * d;
    let n = p.normalize();
    let r = d - 2.0 * d.dot(n) * n;
    if r.z <= 0.0 {
        return Some(Vec3::splat(f32::INFINITY));
    }
    Some(p + (wall_z - p.z) / r.z * r)
}

#[test]
fn mirror_sphere_reflects_wall() {
    init_logger();
    let background = Color::new(0.2, 0.2, 0.8);
    let green = Color::new(0.0, 1.0, 0.0);
    let wall_z = 8.0;
    let wall_half = 6.0;

    let mut scene = Scene::new()
        .with_camera(camera())
        .with_background(background)
        .with_global_ambient(Color::ZERO);
    let mirror = scene.add_material(Material::mirror("mirror"));
    let glow = scene.add_material(Material::emissive("wall", green));
    let sphere = scene
        .add_mesh(Mesh::sphere(1.0, 96, 48).with_material(mirror))
        .unwrap();
    let wall = scene
        .add_mesh(Mesh::rectangle(Vec2::splat(-wall_half), Vec2::splat(wall_half)).with_material(glow))
        .unwrap();
    let root = scene.root();
    scene.add_shape(Some(root), "mirror", sphere, Mat4::IDENTITY).unwrap();
    scene
        .add_shape(
            Some(root),
            "wall",
            wall,
            Mat4::from_translation(Vec3::new(0.0, 0.0, wall_z)) * Mat4::from_rotation_y(PI),
        )
        .unwrap();
    let world = World::new(scene).unwrap();

    let config = RenderConfig::default().with_resolution(64, 64).with_aa(1, 0.3);
    let (image, outcome) = Raytracer::new(config).render(&world).unwrap();
    assert!(outcome.stats.reflected_rays > 0);
    assert!((image.get(32, 32) - green).length() < 1e-4);

    // Compare every pixel on the middle row with the ideal sphere, skipping
    // two pixels on either side of each predicted edge.
    let view = ViewPlane::new(&camera(), 64, 64);
    let y = 32;
    let predicted: Vec<Option<bool>> = (0..64)
        .map(|x| {
            predicted_wall_point(&view, x, y, wall_z)
                .map(|p| p.x.abs() < wall_half && p.y.abs() < wall_half)
        })
        .collect();
    let mut checked = 0;
    for x in 2..62usize {
        let window = &predicted[x - 2..=x + 2];
        if window.iter().any(|p| *p != predicted[x]) {
            continue;
        }
        let color = image.get(x as u32, y);
        match predicted[x] {
            Some(true) => assert!((color - green).length() < 1e-4, "pixel {x} should show the wall, got {color}"),
            Some(false) => assert!((color - background).length() < 1e-4, "pixel {x} should show the sky, got {color}"),
            None => assert_eq!(color, background, "pixel {x} should miss the sphere"),
        }
        checked += 1;
    }
    assert!(checked > 30);
}

#[test]
fn cancellation_leaves_remaining_rows_untouched() {
    init_logger();
    let background = Color::splat(0.5);
    let mut scene = Scene::new().with_camera(camera()).with_background(background);
    let white = scene.add_material(Material::new("white", Color::ONE));
    let quad = scene
        .add_mesh(Mesh::rectangle(Vec2::splat(-1.0), Vec2::splat(1.0)).with_material(white))
        .unwrap();
    let root = scene.root();
    scene.add_shape(Some(root), "quad", quad, Mat4::IDENTITY).unwrap();
    scene.add_light(Light::point(Vec3::new(0.0, 0.0, 5.0)));
    let world = World::new(scene).unwrap();

    let config = RenderConfig {
        progress_interval: 10,
        ..RenderConfig::default().with_resolution(64, 1000).with_threads(1)
    };
    let raytracer = Raytracer::new(config);
    let handle = raytracer.handle();
    let cancelled_at = AtomicU32::new(0);
    let on_progress = |progress: RenderProgress| {
        if progress.rows_completed >= 500 {
            handle.cancel();
            let _ = cancelled_at.compare_exchange(0, progress.rows_completed, Ordering::Relaxed, Ordering::Relaxed);
        }
    };

    let mut image = ImageBuffer::new(64, 1000);
    let outcome = raytracer.render_into(&world, &mut image, Some(&on_progress)).unwrap();
    let cancelled_at = cancelled_at.load(Ordering::Relaxed);

    assert!(outcome.cancelled);
    assert_eq!(cancelled_at, 500);
    assert!(outcome.rows_completed >= cancelled_at);
    assert!(outcome.rows_completed <= cancelled_at + 1);
    assert_eq!(outcome.state, RenderState::Finished);
    assert_eq!(outcome.stats.subsampled_pixels, 0);

    for y in 0..1000 {
        let untouched = image.row(y).iter().all(|&c| c == Color::ZERO);
        if y < outcome.rows_completed {
            assert!(!untouched, "row {y} was not rendered");
        } else {
            assert!(untouched, "row {y} was rendered after cancellation");
        }
    }
}

#[test]
fn instanced_spheres_share_one_mesh() {
    init_logger();
    let mut scene = Scene::new()
        .with_camera(Camera::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO).with_fov(45.0))
        .with_background(Color::ZERO);
    let blue = scene.add_material(Material::new("blue", Color::new(0.0, 0.0, 1.0)));
    let mesh = scene
        .add_mesh(Mesh::sphere(0.8, 32, 16).with_material(blue))
        .unwrap();
    let prototype = scene.add_shape(None, "ball", mesh, Mat4::IDENTITY).unwrap();
    let root = scene.root();
    for (i, x) in [-2.5f32, 0.0, 2.5].into_iter().enumerate() {
        scene
            .add_reference(Some(root), format!("ball{i}"), prototype, Mat4::from_translation(Vec3::new(x, 0.0, 0.0)))
            .unwrap();
    }
    scene.add_light(Light::point(Vec3::new(0.0, 5.0, 10.0)));
    let world = World::new(scene).unwrap();
    assert_eq!(world.scene().meshes().len(), 1);

    let config = RenderConfig::default().with_resolution(96, 32).with_aa(1, 0.3);
    let (image, _) = Raytracer::new(config).render(&world).unwrap();

    let view = ViewPlane::new(world.scene().camera.as_ref().unwrap(), 96, 32);
    for x in [-2.5f32, 0.0, 2.5] {
        // Project the instance center onto the image.
        let dir = Vec3::new(x, 0.0, 0.0) - view.eye;
        let on_plane = dir * (view.top_left.z / dir.z);
        let px = ((on_plane - view.top_left).dot(view.right) / view.pixel_size).round() as u32;
        let color = image.get(px, 16);
        assert!(color.z > 0.1, "instance at {x} missing at pixel {px}: {color}");
    }
    // Gaps between the instances show the background.
    assert_eq!(image.get(0, 16), Color::ZERO);
}
