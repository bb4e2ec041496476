//! Frame orchestration.
//!
//! A frame is rendered in two passes:
//! 1. Every scanline is traced in parallel on a rayon pool. Each worker owns
//!    its [`Tracer`] and writes only its own row of the image.
//! 2. Adaptive anti-aliasing compares every pixel with its left and upper
//!    neighbour and resamples contrasting pairs with a jittered n x n mask.
//!
//! A shared [`RenderHandle`] exposes the render state, the progress
//! percentage and a cancellation flag that is checked once per scanline.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use glint_core::Camera;
use glint_math::{Color, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::image::ImageBuffer;
use crate::ray::Ray;
use crate::sampling::jittered_disc_point;
use crate::stats::RenderStats;
use crate::tracer::Tracer;
use crate::world::World;

/// Lifecycle of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RenderState {
    /// Idle, a new frame can start
    Ready = 0,
    Busy = 1,
    /// The last frame completed (or was cancelled) and its statistics are final
    Finished = 2,
    /// The camera moves: the in-flight frame is cancelled and the host
    /// restarts once the motion stops
    CameraMoving = 3,
}

impl RenderState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RenderState::Busy,
            2 => RenderState::Finished,
            3 => RenderState::CameraMoving,
            _ => RenderState::Ready,
        }
    }
}

/// State, progress and cancellation shared between a render and its host.
#[derive(Debug)]
pub struct RenderHandle {
    state: AtomicU8,
    cancel: AtomicBool,
    percent: AtomicU32,
}

impl Default for RenderHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderHandle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(RenderState::Ready as u8),
            cancel: AtomicBool::new(false),
            percent: AtomicU32::new(0),
        }
    }

    /// Stop the render. Scanlines in flight finish, no new ones start.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// The camera started moving: cancel the current frame.
    pub fn camera_moving(&self) {
        self.state.store(RenderState::CameraMoving as u8, Ordering::Release);
        self.cancel();
    }

    /// The camera came to rest: a new frame may start. Has no effect unless
    /// the camera was moving.
    pub fn camera_stopped(&self) {
        let stopped = self.state.compare_exchange(
            RenderState::CameraMoving as u8,
            RenderState::Ready as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if stopped.is_ok() {
            self.cancel.store(false, Ordering::Relaxed);
        }
    }

    pub fn state(&self) -> RenderState {
        RenderState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Rendered percentage, 0 to 100.
    pub fn progress(&self) -> u32 {
        self.percent.load(Ordering::Relaxed)
    }

    fn begin(&self) {
        if self.state() == RenderState::CameraMoving {
            return;
        }
        self.cancel.store(false, Ordering::Relaxed);
        self.percent.store(0, Ordering::Relaxed);
        self.state.store(RenderState::Busy as u8, Ordering::Release);
    }

    /// Leave the busy state. A camera move that happened meanwhile wins.
    fn finish(&self, target: RenderState) -> RenderState {
        match self.state.compare_exchange(
            RenderState::Busy as u8,
            target as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => target,
            Err(current) => RenderState::from_u8(current),
        }
    }
}

/// Progress report sent every few finished scanlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderProgress {
    pub rows_completed: u32,
    pub total_rows: u32,
    pub percent: u32,
}

/// Receiver of progress reports. Called from worker threads.
pub trait ProgressSink: Sync {
    fn report(&self, progress: RenderProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(RenderProgress) + Sync,
{
    fn report(&self, progress: RenderProgress) {
        self(progress)
    }
}

/// Forwards progress reports into a channel.
pub struct ChannelProgress(Mutex<Sender<RenderProgress>>);

impl ChannelProgress {
    pub fn new(sender: Sender<RenderProgress>) -> Self {
        Self(Mutex::new(sender))
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, progress: RenderProgress) {
        if let Ok(sender) = self.0.lock() {
            // A dropped receiver only means nobody listens anymore.
            let _ = sender.send(progress);
        }
    }
}

/// Result of a render call.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub stats: RenderStats,
    /// State the handle was left in
    pub state: RenderState,
    /// Scanlines of the first pass that were traced
    pub rows_completed: u32,
    pub cancelled: bool,
    /// The camera moved during the render; render again once it stops
    pub restart_requested: bool,
}

/// Image plane of a camera, one pixel wide steps along `right` and `up`.
#[derive(Debug, Clone, Copy)]
pub struct ViewPlane {
    pub eye: Vec3,
    pub look: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    /// Direction from the eye to the center of the top-left pixel
    pub top_left: Vec3,
    pub pixel_size: f32,
    /// Distance of the near clip plane along `look`
    pub clip_near: f32,
}

impl ViewPlane {
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        let basis = camera.basis();
        let focal = if camera.focal_dist > 0.0 { camera.focal_dist } else { 1.0 };
        let half_height = (camera.fov.to_radians() * 0.5).tan() * focal;
        let half_width = half_height * width as f32 / height as f32;
        let pixel_size = 2.0 * half_width / width as f32;

        let top_left = basis.look * focal - half_width * basis.right
            + half_height * basis.up
            + 0.5 * pixel_size * basis.right
            - 0.5 * pixel_size * basis.up;

        Self {
            eye: basis.eye,
            look: basis.look,
            right: basis.right,
            up: basis.up,
            top_left,
            pixel_size,
            clip_near: camera.clip_near.max(0.0),
        }
    }

    /// Direction through image position `(x, y)` in pixels, pixel centers at
    /// whole numbers. Not normalized: it ends on the focal plane.
    #[inline]
    pub fn direction(&self, x: f32, y: f32) -> Vec3 {
        self.top_left + self.pixel_size * (x * self.right - y * self.up)
    }

    /// Primary ray for pixel `(x, y)` from `origin` (the eye or a point on
    /// the lens) along `dir`. Hits in front of the near clip plane are
    /// ignored.
    pub fn primary_ray(&self, origin: Vec3, dir: Vec3, x: u32, y: u32) -> Ray {
        let mut ray = Ray::primary(origin, dir, x, y);
        let along = ray.dir.dot(self.look);
        if along > 0.0 {
            ray.t_min = self.clip_near / along;
        }
        ray
    }
}

/// Pixels whose color differs from their left or upper neighbour by more
/// than `threshold` (summed absolute RGB difference), together with that
/// neighbour. Every pixel appears at most once.
pub fn pixels_to_resample(image: &ImageBuffer, threshold: f32) -> Vec<(u32, u32)> {
    let diff = |a: Color, b: Color| (a - b).abs().element_sum();
    let mut marked = Vec::new();
    // Whether the pixel of this column in the current (or, before it is
    // visited, the previous) row is already marked.
    let mut got_sampled = vec![false; image.width as usize];

    for y in 0..image.height {
        for x in 0..image.width {
            let color = image.get(x, y);
            let xi = x as usize;
            let mut is_sampled = false;

            if x > 0 && diff(color, image.get(x - 1, y)) > threshold {
                if !got_sampled[xi - 1] {
                    marked.push((x - 1, y));
                    got_sampled[xi - 1] = true;
                }
                marked.push((x, y));
                is_sampled = true;
            }
            if y > 0 && diff(color, image.get(x, y - 1)) > threshold {
                if !got_sampled[xi] {
                    marked.push((x, y - 1));
                }
                if !is_sampled {
                    marked.push((x, y));
                    is_sampled = true;
                }
            }
            got_sampled[xi] = is_sampled;
        }
    }
    marked
}

fn row_seed(seed: u64, y: u32) -> u64 {
    seed ^ (u64::from(y) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn pixel_seed(seed: u64, x: u32, y: u32) -> u64 {
    seed ^ ((u64::from(y) << 32 | u64::from(x)) + 1).wrapping_mul(0xD1B5_4A32_D192_ED03)
}

/// Whitted ray tracer driving a frame over a [`World`].
pub struct Raytracer {
    config: RenderConfig,
    handle: Arc<RenderHandle>,
}

impl Raytracer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            handle: Arc::new(RenderHandle::new()),
        }
    }

    /// Use a handle shared with the host.
    pub fn with_handle(mut self, handle: Arc<RenderHandle>) -> Self {
        self.handle = handle;
        self
    }

    pub fn handle(&self) -> Arc<RenderHandle> {
        Arc::clone(&self.handle)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a frame into a new black image.
    pub fn render(&self, world: &World) -> RenderResult<(ImageBuffer, RenderOutcome)> {
        let mut image = ImageBuffer::new(self.config.width, self.config.height);
        let outcome = self.render_into(world, &mut image, None)?;
        Ok((image, outcome))
    }

    /// Render a frame into `image`.
    ///
    /// Rows skipped because of a cancellation keep their previous content.
    /// An image of the wrong size is replaced by a black one.
    pub fn render_into(
        &self,
        world: &World,
        image: &mut ImageBuffer,
        progress: Option<&dyn ProgressSink>,
    ) -> RenderResult<RenderOutcome> {
        let config = self.config.clone().validated()?;
        let camera = world.scene().camera.clone().ok_or(RenderError::NoCamera)?;
        if !world.scene().has_geometry() {
            return Err(RenderError::NoGeometry);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()?;

        if image.width != config.width || image.height != config.height {
            log::debug!(
                "Resizing target image from {}x{} to {}x{}",
                image.width,
                image.height,
                config.width,
                config.height
            );
            *image = ImageBuffer::new(config.width, config.height);
        }

        let handle = self.handle.as_ref();
        handle.begin();
        let start = Instant::now();
        let view = ViewPlane::new(&camera, config.width, config.height);

        let lens_rings = config.lens_samples;
        let use_lens = config.lens_sample_count() > 1 && camera.lens_diameter > 0.0;
        let aa_follows = !config.continuous && config.aa_samples > 1 && !use_lens;

        log::info!(
            "Rendering {}x{} on {} threads (depth {}, AA {}x{}, lens samples {})",
            config.width,
            config.height,
            pool.current_num_threads(),
            config.max_depth,
            config.aa_samples,
            config.aa_samples,
            if use_lens { config.lens_sample_count() } else { 1 }
        );

        // Pass 1: one primary ray (or one lens disc of rays) per pixel
        let total_rows = config.height;
        let pc_max = if aa_follows { 50 } else { 100 };
        let rows_done = AtomicU32::new(0);
        let lens_radius = camera.lens_diameter * 0.5;

        let mut stats = pool.install(|| {
            image
                .pixels
                .par_chunks_mut(config.width as usize)
                .enumerate()
                .map(|(y, row)| {
                    let mut tracer = Tracer::new(world, &config);
                    if handle.is_cancelled() {
                        return tracer.stats;
                    }
                    let y = y as u32;
                    let mut rng = StdRng::seed_from_u64(row_seed(config.seed, y));

                    for (x, pixel) in row.iter_mut().enumerate() {
                        let x = x as u32;
                        let dir = view.direction(x as f32, y as f32);
                        *pixel = if use_lens {
                            let focal_point = view.eye + dir;
                            let [rings, sectors] = lens_rings;
                            let mut color = Color::ZERO;
                            for ring in (0..rings).rev() {
                                for sector in (0..sectors).rev() {
                                    let disc = jittered_disc_point(ring, sector, rings, sectors, &mut rng);
                                    let lens_pos = view.eye + lens_radius * (disc.x * view.right + disc.y * view.up);
                                    color += tracer.trace_primary(view.primary_ray(lens_pos, focal_point - lens_pos, x, y));
                                }
                            }
                            color / (rings * sectors) as f32
                        } else {
                            tracer.trace_primary(view.primary_ray(view.eye, dir, x, y))
                        };
                    }

                    tracer.stats.rows_completed = 1;
                    let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
                    let percent = done * pc_max / total_rows;
                    handle.percent.store(percent, Ordering::Relaxed);
                    if let Some(sink) = progress {
                        if done % config.progress_interval == 0 || done == total_rows {
                            sink.report(RenderProgress {
                                rows_completed: done,
                                total_rows,
                                percent,
                            });
                        }
                    }
                    tracer.stats
                })
                .reduce(RenderStats::default, RenderStats::merge)
        });
        let rows_completed = stats.rows_completed;

        // Pass 2: adaptive anti-aliasing
        if aa_follows && !handle.is_cancelled() {
            stats += self.anti_alias(&pool, world, &config, &view, image, progress);
        }

        let cancelled = handle.is_cancelled();
        stats.width = config.width;
        stats.height = config.height;
        stats.threads = pool.current_num_threads();
        stats.elapsed_secs = start.elapsed().as_secs_f64();

        let target = if config.continuous && !cancelled {
            RenderState::Ready
        } else {
            RenderState::Finished
        };
        let state = handle.finish(target);
        if !cancelled {
            handle.percent.store(100, Ordering::Relaxed);
        }

        if cancelled {
            log::info!(
                "Render cancelled after {} of {} rows ({:.2} sec.)",
                rows_completed,
                total_rows,
                stats.elapsed_secs
            );
        }
        if state == RenderState::Finished {
            stats.log_summary(config.max_depth, config.aa_samples, config.aa_threshold);
        }

        Ok(RenderOutcome {
            stats,
            state,
            rows_completed,
            cancelled,
            restart_requested: state == RenderState::CameraMoving,
        })
    }

    /// Resample the pixels that contrast with a neighbour.
    fn anti_alias(
        &self,
        pool: &rayon::ThreadPool,
        world: &World,
        config: &RenderConfig,
        view: &ViewPlane,
        image: &mut ImageBuffer,
        progress: Option<&dyn ProgressSink>,
    ) -> RenderStats {
        let marked = pixels_to_resample(image, config.aa_threshold);
        log::debug!("Anti-aliasing {} pixels", marked.len());
        if marked.is_empty() {
            return RenderStats::default();
        }

        let handle = self.handle.as_ref();
        let n = config.aa_samples;
        let total = marked.len() as u32;
        let done = AtomicU32::new(0);
        let source: &ImageBuffer = image;

        let (colors, stats) = pool.install(|| {
            marked
                .par_iter()
                .map(|&(x, y)| {
                    let mut tracer = Tracer::new(world, config);
                    if handle.is_cancelled() {
                        return (None, tracer.stats);
                    }
                    let mut rng = StdRng::seed_from_u64(pixel_seed(config.seed, x, y));
                    let color = sub_sample(&mut tracer, view, n, x, y, source.get(x, y), &mut rng);
                    tracer.stats.subsampled_rays += u64::from(n * n);
                    tracer.stats.subsampled_pixels += 1;

                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    let percent = 50 + finished * 50 / total;
                    handle.percent.store(percent, Ordering::Relaxed);
                    if let Some(sink) = progress {
                        if finished % (total / 20).max(1) == 0 {
                            sink.report(RenderProgress {
                                rows_completed: config.height,
                                total_rows: config.height,
                                percent,
                            });
                        }
                    }
                    (Some((x, y, color)), tracer.stats)
                })
                .fold(
                    || (Vec::new(), RenderStats::default()),
                    |(mut colors, stats), (color, pixel_stats)| {
                        colors.extend(color);
                        (colors, stats.merge(pixel_stats))
                    },
                )
                .reduce(
                    || (Vec::new(), RenderStats::default()),
                    |(mut a, sa), (b, sb)| {
                        a.extend(b);
                        (a, sa.merge(sb))
                    },
                )
        });

        for (x, y, color) in colors {
            image.set(x, y, color);
        }
        stats
    }
}

/// Average of an n x n jittered mask over pixel `(x, y)`. The already
/// traced pixel color stands in for the center sample.
fn sub_sample(
    tracer: &mut Tracer,
    view: &ViewPlane,
    n: u32,
    x: u32,
    y: u32,
    center: Color,
    rng: &mut StdRng,
) -> Color {
    let c = (n / 2) as i32;
    let f = 1.0 / n as f32;
    let mut color = Color::ZERO;

    for j in 0..n as i32 {
        for i in 0..n as i32 {
            if i == c && j == c {
                color += center;
                continue;
            }
            let sx = x as f32 + (i - c) as f32 * f + (rng.gen::<f32>() - 0.5) * f;
            let sy = y as f32 + (j - c) as f32 * f + (rng.gen::<f32>() - 0.5) * f;
            let mut ray = view.primary_ray(view.eye, view.direction(sx, sy), x, y);
            color += tracer.trace(&mut ray);
        }
    }
    color / (n * n) as f32
}
