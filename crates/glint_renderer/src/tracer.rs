//! Whitted-style shading.
//!
//! Implements the recursive tracing of one ray:
//! - OpenGL-style local illumination (emission, ambient, diffuse, specular)
//! - Hard and soft shadows for sphere and rectangle lights
//! - Mirror reflection, refraction mixed with Schlick's Fresnel term
//! - Distance fog
//!
//! A [`Tracer`] is cheap to create and is owned by one worker. It carries the
//! worker's counters so nothing is shared on the hot path.

use glint_core::{Light, LightKind, Material};
use glint_math::{Color, Mat3, Vec3, EPSILON};

use crate::config::RenderConfig;
use crate::ray::Ray;
use crate::sampling::disc_point;
use crate::stats::RenderStats;
use crate::world::World;

/// Schlick's approximation of the Fresnel reflectance.
///
/// `cos_theta` is the cosine between the incoming ray and the normal.
pub fn schlick(f0: f32, cos_theta: f32) -> f32 {
    let c = 1.0 - cos_theta.clamp(0.0, 1.0);
    f0 + (1.0 - f0) * c.powi(5)
}

/// Shading data at a hit point.
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoint<'w> {
    pub point: Vec3,
    /// Unit world-space shading normal on the side the ray came from
    pub normal: Vec3,
    pub material: &'w Material,
    pub is_volume: bool,
}

/// Traces rays through a [`World`].
pub struct Tracer<'a> {
    world: &'a World,
    config: &'a RenderConfig,
    clip_far: f32,
    /// Counters of everything traced so far
    pub stats: RenderStats,
    depth_reached: u32,
}

impl<'a> Tracer<'a> {
    pub fn new(world: &'a World, config: &'a RenderConfig) -> Self {
        let clip_far = world
            .scene()
            .camera
            .as_ref()
            .map_or(f32::MAX, |camera| camera.clip_far);
        Self {
            world,
            config,
            clip_far,
            stats: RenderStats::default(),
            depth_reached: 0,
        }
    }

    /// Trace a primary ray and record its recursion depth.
    pub fn trace_primary(&mut self, mut ray: Ray) -> Color {
        self.depth_reached = 0;
        let color = self.trace(&mut ray);
        self.stats.primary_rays += 1;
        self.stats.depth_sum += u64::from(self.depth_reached);
        self.stats.max_depth_reached = self.stats.max_depth_reached.max(self.depth_reached);
        color
    }

    /// Color seen along `ray`, clamped to [0, 1].
    pub fn trace(&mut self, ray: &mut Ray) -> Color {
        self.depth_reached = self.depth_reached.max(ray.depth);
        let world = self.world;
        let scene = world.scene();
        let mut color = scene.background;

        if world.hit(ray, &mut self.stats) {
            if let Some(surface) = self.surface(ray) {
                color = self.shade(ray, &surface);

                if ray.depth < self.config.max_depth && ray.contrib > self.config.min_contribution {
                    color += self.secondary(ray, &surface);
                }
            }
        }

        if let Some(fog) = &scene.fog {
            color = fog.blend(color, ray.length.min(self.clip_far));
        }

        color.clamp(Color::ZERO, Color::ONE)
    }

    /// Reflected and refracted light at a hit.
    fn secondary(&mut self, ray: &Ray, surface: &SurfacePoint) -> Color {
        let mat = surface.material;
        let (point, normal) = (surface.point, surface.normal);

        if mat.opacity < 1.0 {
            let weight = 1.0 - mat.opacity;
            let (mut refracted, tir) = ray.refracted(point, normal, mat.kn, surface.is_volume, weight);
            self.count_refraction(tir);
            weight * self.trace(&mut refracted)
        } else if mat.kt > 0.0 {
            let fresnel = schlick(mat.kr, -ray.dir.dot(normal));

            let (mut refracted, tir) = ray.refracted(point, normal, mat.kn, surface.is_volume, 1.0 - fresnel);
            self.count_refraction(tir);
            let refr = self.trace(&mut refracted);

            let mut reflected = ray.reflected(point, normal, fresnel);
            self.stats.reflected_rays += 1;
            let refl = self.trace(&mut reflected);

            refr * (1.0 - fresnel) + refl * fresnel
        } else if mat.kr > 0.0 {
            let mut reflected = ray.reflected(point, normal, mat.kr);
            self.stats.reflected_rays += 1;
            mat.kr * self.trace(&mut reflected)
        } else {
            Color::ZERO
        }
    }

    fn count_refraction(&mut self, tir: bool) {
        self.stats.refracted_rays += 1;
        if tir {
            self.stats.tir_rays += 1;
        }
    }

    /// Hit point, shading normal and material of the hit recorded in `ray`.
    ///
    /// Closed volumes flip the normal while the ray is inside them, open
    /// surfaces flip it toward the ray.
    pub fn surface(&self, ray: &Ray) -> Option<SurfacePoint<'a>> {
        let hit = ray.hit?;
        let scene = self.world.scene();
        let mesh = scene.mesh(hit.primitive.mesh);

        let n_os = mesh.shading_normal(hit.primitive.triangle as usize, hit.u, hit.v);
        let normal_matrix = Mat3::from_mat4(hit.world_to_object).transpose();
        let mut normal = (normal_matrix * n_os).normalize_or_zero();

        let flip = if mesh.is_volume {
            !ray.is_outside
        } else {
            ray.dir.dot(normal) > 0.0
        };
        if flip {
            normal = -normal;
        }

        Some(SurfacePoint {
            point: ray.at(ray.length),
            normal,
            material: scene.material(mesh.material),
            is_volume: mesh.is_volume,
        })
    }

    /// Local illumination at a hit, clamped to [0, 1].
    pub fn shade(&mut self, ray: &Ray, surface: &SurfacePoint) -> Color {
        let world = self.world;
        let scene = world.scene();
        let mat = surface.material;
        let n = surface.normal;

        let mut color = mat.emission + mat.ambient * scene.global_ambient;
        let mut specular = Color::ZERO;

        for light in scene.lights().iter().filter(|l| l.on) {
            let to_light = light.position_ws() - surface.point;
            let dist = to_light.length();
            let l = to_light.normalize_or_zero();
            let l_dot_n = l.dot(n);

            let mut lighted = if l_dot_n > 0.0 {
                self.shadow_test(ray, surface.point, light, l, dist)
            } else {
                0.0
            };

            let mut amdi = light.ambient * mat.ambient;
            let mut spec = Color::ZERO;

            let mut spot_effect = 1.0;
            if lighted > 0.0 && light.is_spot() {
                let l_dot_s = (-l.dot(light.spot_dir_ws())).max(0.0);
                if l_dot_s > light.spot_cos_cut() {
                    spot_effect = l_dot_s.powf(light.spot_exponent);
                } else {
                    lighted = 0.0;
                    spot_effect = 0.0;
                }
            }

            if lighted > 0.0 {
                let h = (l - ray.dir).normalize_or_zero();
                let diffuse = l_dot_n.max(0.0);
                let n_dot_h = n.dot(h).max(0.0);
                let shine = n_dot_h.powf(mat.shininess);

                amdi += lighted * diffuse * light.diffuse * mat.diffuse;
                spec = lighted * shine * light.specular * mat.specular;
            }

            let att = light.attenuation(dist) * spot_effect;
            color += att * amdi;
            specular += att * spec;
        }

        (color + specular).clamp(Color::ZERO, Color::ONE)
    }

    /// Fraction of `light` visible from `point`: 0 is fully shadowed, 1 is
    /// fully lit. `l` is the unit direction to the light center, `dist` its
    /// distance.
    pub fn shadow_test(&mut self, ray: &Ray, point: Vec3, light: &Light, l: Vec3, dist: f32) -> f32 {
        if light.sample_count() <= 1 {
            return self.single_shadow(ray, point, l, dist);
        }
        match light.kind {
            LightKind::Sphere { radius, samples } => self.sphere_shadow(ray, point, light, l, dist, radius, samples),
            LightKind::Rect {
                width,
                height,
                samples,
            } => self.rect_shadow(ray, point, light, width, height, samples),
        }
    }

    /// One shadow ray. Transparent occluders let part of the light through.
    fn single_shadow(&mut self, ray: &Ray, point: Vec3, l: Vec3, dist: f32) -> f32 {
        let mut shadow = ray.shadow(point, l, dist);
        self.stats.shadow_rays += 1;
        if !self.world.hit(&mut shadow, &mut self.stats) {
            return 1.0;
        }
        match self.surface(&shadow) {
            Some(occluder) if occluder.material.is_transparent() => {
                shadow.dir.dot(occluder.normal).abs() * occluder.material.kt
            }
            _ => 0.0,
        }
    }

    /// True if nothing blocks the segment from `point` toward `dir`.
    fn unblocked(&mut self, ray: &Ray, point: Vec3, dir: Vec3, dist: f32) -> bool {
        let mut shadow = ray.shadow(point, dir, dist);
        self.stats.shadow_rays += 1;
        !self.world.hit(&mut shadow, &mut self.stats)
    }

    /// Soft shadow of a sphere light sampled on a disc facing the point.
    ///
    /// Rings are tested from the rim inward. A fully lit rim means the light
    /// is fully visible; a fully blocked ring ends the test early.
    #[allow(clippy::too_many_arguments)]
    fn sphere_shadow(
        &mut self,
        ray: &Ray,
        point: Vec3,
        light: &Light,
        l: Vec3,
        dist: f32,
        radius: f32,
        samples: [u32; 2],
    ) -> f32 {
        let center = light.position_ws();
        let light_x = if l.x.abs() >= l.y.abs() {
            Vec3::new(l.z, 0.0, -l.x).normalize_or_zero()
        } else {
            Vec3::new(0.0, l.z, -l.y).normalize_or_zero()
        };
        let light_y = l.cross(light_x) * radius;
        let light_x = light_x * radius;

        let [rings, sectors] = samples;
        let inv_samples = 1.0 / (rings * sectors) as f32;
        let mut lighted = 0.0;

        for ring in (0..rings).rev() {
            let mut ring_lit = true;
            let mut ring_dark = true;
            for sector in (0..sectors).rev() {
                let disc = disc_point(ring, sector, rings, sectors);
                let target = center + disc.x * light_x + disc.y * light_y;
                let dir = (target - point).normalize_or_zero();
                if self.unblocked(ray, point, dir, dist) {
                    lighted += inv_samples;
                    ring_dark = false;
                } else {
                    ring_lit = false;
                }
            }
            if ring == rings - 1 && ring_lit {
                return 1.0;
            }
            if ring_dark {
                return lighted;
            }
        }
        lighted
    }

    /// Soft shadow of a rectangle light sampled on its grid.
    ///
    /// The corners, edge midpoints and center are tested first. The rest of
    /// the grid is only sampled if one of them is blocked.
    fn rect_shadow(&mut self, ray: &Ray, point: Vec3, light: &Light, width: f32, height: f32, samples: [u32; 2]) -> f32 {
        let [nx, ny] = samples;
        let (hx, hy) = ((nx / 2) as i32, (ny / 2) as i32);
        let dw = width / nx as f32;
        let dl = height / ny as f32;
        let inv_samples = 1.0 / (nx * ny) as f32;

        let mut sampled = vec![false; (nx * ny) as usize];
        let mut lighted = 0.0;
        let mut important_lit = true;

        let visible = |tracer: &mut Self, x: i32, y: i32| -> bool {
            let local = Vec3::new(x as f32 * dw, y as f32 * dl, 0.0);
            let to_sample = light.transform.transform_point3(local) - point;
            let sample_dist = to_sample.length();
            let dir = to_sample.normalize_or_zero();
            tracer.unblocked(ray, point, dir, sample_dist - EPSILON)
        };

        let important = |h: i32| if h == 0 { vec![0] } else { vec![-h, 0, h] };
        for &y in &important(hy) {
            for &x in &important(hx) {
                sampled[((y + hy) * nx as i32 + x + hx) as usize] = true;
                if visible(self, x, y) {
                    lighted += inv_samples;
                } else {
                    important_lit = false;
                }
            }
        }

        if important_lit {
            return 1.0;
        }

        for y in -hy..=hy {
            for x in -hx..=hx {
                if !sampled[((y + hy) * nx as i32 + x + hx) as usize] && visible(self, x, y) {
                    lighted += inv_samples;
                }
            }
        }
        lighted
    }
}
