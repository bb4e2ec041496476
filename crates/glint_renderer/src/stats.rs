//! Per-render counters.
//!
//! Every worker owns its own [`RenderStats`]; the orchestrator merges them
//! after each pass so no counter is shared between threads.

use std::ops::AddAssign;

/// Ray and intersection counters of one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    pub width: u32,
    pub height: u32,
    pub threads: usize,
    pub primary_rays: u64,
    pub reflected_rays: u64,
    pub refracted_rays: u64,
    /// Refractions turned into reflections
    pub tir_rays: u64,
    pub shadow_rays: u64,
    /// Rays cast by the anti-aliasing pass (center samples included)
    pub subsampled_rays: u64,
    pub subsampled_pixels: u64,
    /// Triangle tests
    pub intersection_tests: u64,
    /// Confirmed closer hits
    pub intersections: u64,
    /// Deepest recursion of any primary ray
    pub max_depth_reached: u32,
    /// Sum of the deepest recursion over all primary rays
    pub depth_sum: u64,
    pub rows_completed: u32,
    pub elapsed_secs: f64,
}

impl RenderStats {
    pub fn total_rays(&self) -> u64 {
        self.primary_rays
            + self.reflected_rays
            + self.refracted_rays
            + self.shadow_rays
            + self.subsampled_rays
    }

    pub fn average_depth(&self) -> f64 {
        if self.primary_rays == 0 {
            0.0
        } else {
            self.depth_sum as f64 / self.primary_rays as f64
        }
    }

    pub fn rays_per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.total_rays() as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Counters of `other` added to `self`.
    pub fn merge(mut self, other: RenderStats) -> RenderStats {
        self += other;
        self
    }

    /// Log the summary block at info level.
    pub fn log_summary(&self, max_depth: u32, aa_samples: u32, aa_threshold: f32) {
        let total = self.total_rays().max(1) as f64;
        let pixels = (self.width as f64 * self.height as f64).max(1.0);
        let pct = |n: u64| n as f64 / total * 100.0;

        log::info!("Rendering time    : {:10.2} sec.", self.elapsed_secs);
        log::info!("Image size        : {:10} x {}", self.width, self.height);
        log::info!("Num. threads      : {:10}", self.threads);
        log::info!("Allowed depth     : {:10}", max_depth);
        log::info!("Maximum depth     : {:10}", self.max_depth_reached);
        log::info!("Average depth     : {:10.6}", self.average_depth());
        log::info!("AA threshold      : {:10.1}", aa_threshold);
        log::info!("AA subsampling    : {:8}x{}", aa_samples, aa_samples);
        log::info!(
            "Subsampled pixels : {:10}, {:4.1}% of total",
            self.subsampled_pixels,
            self.subsampled_pixels as f64 / pixels * 100.0
        );
        log::info!("Primary rays      : {:10}, {:4.1}% of total", self.primary_rays, pct(self.primary_rays));
        log::info!("Reflected rays    : {:10}, {:4.1}% of total", self.reflected_rays, pct(self.reflected_rays));
        log::info!("Transmitted rays  : {:10}, {:4.1}% of total", self.refracted_rays, pct(self.refracted_rays));
        log::info!("TIR rays          : {:10}, {:4.1}% of total", self.tir_rays, pct(self.tir_rays));
        log::info!("Shadow rays       : {:10}, {:4.1}% of total", self.shadow_rays, pct(self.shadow_rays));
        log::info!("AA subsampled rays: {:10}, {:4.1}% of total", self.subsampled_rays, pct(self.subsampled_rays));
        log::info!("Total rays        : {:10}, 100.0%", self.total_rays());
        log::info!("Rays per second   : {:10.0}", self.rays_per_second());
        log::info!("Intersection tests: {:10}", self.intersection_tests);
        log::info!(
            "Intersections     : {:10}, {:4.1}%",
            self.intersections,
            if self.intersection_tests > 0 {
                self.intersections as f64 / self.intersection_tests as f64 * 100.0
            } else {
                0.0
            }
        );
    }
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: RenderStats) {
        self.primary_rays += other.primary_rays;
        self.reflected_rays += other.reflected_rays;
        self.refracted_rays += other.refracted_rays;
        self.tir_rays += other.tir_rays;
        self.shadow_rays += other.shadow_rays;
        self.subsampled_rays += other.subsampled_rays;
        self.subsampled_pixels += other.subsampled_pixels;
        self.intersection_tests += other.intersection_tests;
        self.intersections += other.intersections;
        self.max_depth_reached = self.max_depth_reached.max(other.max_depth_reached);
        self.depth_sum += other.depth_sum;
        self.rows_completed += other.rows_completed;
    }
}
