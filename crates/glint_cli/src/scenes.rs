//! Built-in demo scenes.

use std::f32::consts::FRAC_PI_2;

use clap::ValueEnum;
use glint_core::{Camera, Fog, FogMode, Light, Material, Mesh, MeshId, Scene, SceneResult};
use glint_math::{Color, Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoScene {
    /// Diffuse, mirror and glass spheres on a floor under a soft rect light
    Spheres,
    /// A mirror sphere surrounded by colored balls
    Mirror,
    /// A glass sphere in front of a striped wall, with fog
    Glass,
    /// One sphere drawn many times through references
    Instances,
}

impl DemoScene {
    pub fn build(self) -> SceneResult<Scene> {
        match self {
            DemoScene::Spheres => spheres(),
            DemoScene::Mirror => mirror(),
            DemoScene::Glass => glass(),
            DemoScene::Instances => instances(),
        }
    }
}

/// A floor in the XZ plane facing +Y.
fn add_floor(scene: &mut Scene, half: f32, color: Color) -> SceneResult<MeshId> {
    let material = scene.add_material(Material::new("floor", color).with_ambient(color * 0.5));
    let mesh = Mesh::plane(Vec2::splat(-half), Vec2::splat(half), 8, 8)
        .with_name("floor")
        .with_material(material);
    let mesh = scene.add_mesh(mesh)?;
    let root = scene.root();
    scene.add_shape(Some(root), "floor", mesh, Mat4::from_rotation_x(-FRAC_PI_2))?;
    Ok(mesh)
}

fn spheres() -> SceneResult<Scene> {
    let camera = Camera::new(Vec3::new(0.0, 2.5, 9.0), Vec3::new(0.0, 0.8, 0.0)).with_fov(40.0);
    let mut scene = Scene::new()
        .with_camera(camera)
        .with_background(Color::new(0.05, 0.07, 0.12));
    add_floor(&mut scene, 10.0, Color::splat(0.7))?;

    let red = scene.add_material(
        Material::new("red", Color::new(0.8, 0.1, 0.1)).with_specular(Color::splat(0.5), 40.0),
    );
    let chrome = scene.add_material(Material::mirror("chrome"));
    let glass = scene.add_material(Material::glass("glass", 1.5));

    let root = scene.root();
    for (name, material, x) in [("red", red, -2.2), ("chrome", chrome, 0.0), ("glass", glass, 2.2)] {
        let mesh = scene.add_mesh(Mesh::sphere(1.0, 48, 24).with_name(name).with_material(material))?;
        scene.add_shape(Some(root), name, mesh, Mat4::from_translation(Vec3::new(x, 1.0, 0.0)))?;
    }

    let panel = Mat4::from_translation(Vec3::new(0.0, 6.0, 2.0)) * Mat4::from_rotation_x(-FRAC_PI_2);
    scene.add_light(Light::rect(panel, 3.0, 3.0, [5, 5]).with_attenuation(1.0, 0.02, 0.0));
    scene.add_light(
        Light::point(Vec3::new(-6.0, 4.0, 6.0))
            .with_colors(Color::ZERO, Color::splat(0.3), Color::splat(0.3)),
    );
    Ok(scene)
}

fn mirror() -> SceneResult<Scene> {
    let camera = Camera::new(Vec3::new(0.0, 1.5, 7.0), Vec3::new(0.0, 1.0, 0.0)).with_fov(45.0);
    let mut scene = Scene::new()
        .with_camera(camera)
        .with_background(Color::new(0.3, 0.4, 0.6));
    add_floor(&mut scene, 12.0, Color::splat(0.6))?;

    let chrome = scene.add_material(Material::mirror("chrome").with_reflectivity(0.9));
    let center = scene.add_mesh(Mesh::sphere(1.2, 64, 32).with_material(chrome))?;
    let root = scene.root();
    scene.add_shape(Some(root), "mirror", center, Mat4::from_translation(Vec3::new(0.0, 1.2, 0.0)))?;

    let colors = [
        Color::new(0.9, 0.2, 0.2),
        Color::new(0.2, 0.9, 0.2),
        Color::new(0.2, 0.3, 0.9),
        Color::new(0.9, 0.8, 0.2),
        Color::new(0.8, 0.3, 0.9),
        Color::new(0.2, 0.8, 0.8),
    ];
    for (i, color) in colors.into_iter().enumerate() {
        let angle = i as f32 / colors.len() as f32 * std::f32::consts::TAU;
        let position = Vec3::new(3.0 * angle.cos(), 0.5, 3.0 * angle.sin());
        let material = scene.add_material(Material::new(format!("ball{i}"), color).with_specular(Color::ONE, 60.0));
        let mesh = scene.add_mesh(Mesh::sphere(0.5, 24, 12).with_material(material))?;
        scene.add_shape(Some(root), format!("ball{i}"), mesh, Mat4::from_translation(position))?;
    }

    scene.add_light(Light::sphere(Vec3::new(3.0, 6.0, 4.0), 0.5, [3, 8]));
    Ok(scene)
}

fn glass() -> SceneResult<Scene> {
    let camera = Camera::new(Vec3::new(0.0, 1.0, 6.0), Vec3::new(0.0, 1.0, 0.0))
        .with_fov(45.0)
        .with_clip(0.1, 40.0);
    let mut scene = Scene::new()
        .with_camera(camera)
        .with_background(Color::splat(0.6));
    scene.fog = Some(Fog::new(FogMode::Exp { density: 0.04 }, Color::splat(0.6)));
    add_floor(&mut scene, 15.0, Color::splat(0.8))?;

    let root = scene.root();
    let wall = scene.add_group(Some(root), "wall", Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)))?;
    for i in 0..6 {
        let color = if i % 2 == 0 { Color::new(0.9, 0.2, 0.1) } else { Color::new(0.95, 0.95, 0.9) };
        let material = scene.add_material(Material::new(format!("stripe{i}"), color));
        let x = -3.0 + i as f32;
        let mesh = Mesh::cuboid(Vec3::new(x, 0.0, -0.1), Vec3::new(x + 1.0, 3.0, 0.1)).with_material(material);
        let mesh = scene.add_mesh(mesh)?;
        scene.add_shape(Some(wall), format!("stripe{i}"), mesh, Mat4::IDENTITY)?;
    }

    let glass = scene.add_material(Material::glass("glass", 1.5));
    let ball = scene.add_mesh(Mesh::sphere(0.9, 64, 32).with_material(glass))?;
    scene.add_shape(Some(root), "glass", ball, Mat4::from_translation(Vec3::new(0.0, 0.9, 0.5)))?;

    scene.add_light(Light::point(Vec3::new(2.0, 5.0, 5.0)).with_attenuation(1.0, 0.0, 0.005));
    Ok(scene)
}

fn instances() -> SceneResult<Scene> {
    let camera = Camera::new(Vec3::new(0.0, 7.0, 10.0), Vec3::ZERO).with_fov(45.0);
    let mut scene = Scene::new()
        .with_camera(camera)
        .with_background(Color::new(0.02, 0.02, 0.05));
    add_floor(&mut scene, 12.0, Color::splat(0.5))?;

    let gold = scene.add_material(
        Material::new("gold", Color::new(0.8, 0.6, 0.2))
            .with_specular(Color::new(1.0, 0.9, 0.6), 80.0)
            .with_reflectivity(0.3),
    );
    let mesh = scene.add_mesh(Mesh::sphere(0.4, 32, 16).with_name("ball").with_material(gold))?;
    let prototype = scene.add_shape(None, "ball", mesh, Mat4::from_translation(Vec3::new(0.0, 0.4, 0.0)))?;

    let root = scene.root();
    let grid = scene.add_group(Some(root), "grid", Mat4::IDENTITY)?;
    for row in -2..=2 {
        for col in -2..=2 {
            let offset = Vec3::new(col as f32 * 1.5, 0.0, row as f32 * 1.5);
            scene.add_reference(Some(grid), format!("ball_{row}_{col}"), prototype, Mat4::from_translation(offset))?;
        }
    }

    scene.add_light(Light::point(Vec3::new(0.0, 8.0, 0.0)).with_spot(Vec3::ZERO, 40.0, 4.0));
    scene.add_light(
        Light::point(Vec3::new(6.0, 5.0, 8.0))
            .with_colors(Color::splat(0.05), Color::splat(0.25), Color::ZERO),
    );
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_demo_builds() {
        for demo in DemoScene::value_variants() {
            let mut scene = demo.build().unwrap();
            scene.update().unwrap();
            assert!(scene.camera.is_some(), "{demo:?} has no camera");
            assert!(scene.has_geometry(), "{demo:?} has no geometry");
            assert!(!scene.lights().is_empty(), "{demo:?} has no lights");
        }
    }

    #[test]
    fn test_instances_share_one_sphere() {
        let scene = DemoScene::Instances.build().unwrap();
        let balls = scene.meshes().iter().filter(|m| m.name == "ball").count();
        assert_eq!(balls, 1);
        assert!(scene.find("ball_2_2").is_some());
    }
}
