//! Render settings.
//!
//! [`RenderConfig`] can be built in code or loaded from JSON. Missing JSON
//! fields take their default value.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Maximum recursion depth; primary rays have depth 1
    pub max_depth: u32,
    /// Secondary rays are only spawned while the ray weight is above this
    pub min_contribution: f32,
    /// Anti-aliasing mask size n (n x n sub-samples); 1 disables AA
    pub aa_samples: u32,
    /// Summed absolute RGB difference above which a pixel pair is resampled
    pub aa_threshold: f32,
    /// Interactive mode: skip the AA pass and return to Ready when done
    pub continuous: bool,
    /// Rings and sectors of the lens disc; more than one sample enables
    /// depth of field
    pub lens_samples: [u32; 2],
    /// Worker threads, 0 picks the rayon default
    pub num_threads: usize,
    /// Progress is reported every this many finished scanlines
    pub progress_interval: u32,
    /// Base seed of the per-scanline random generators
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            max_depth: 5,
            min_contribution: 1.0 / 256.0,
            aa_samples: 3,
            aa_threshold: 0.3,
            continuous: false,
            lens_samples: [1, 1],
            num_threads: 0,
            progress_interval: 16,
            seed: 0,
        }
    }
}

impl RenderConfig {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_aa(mut self, samples: u32, threshold: f32) -> Self {
        self.aa_samples = samples;
        self.aa_threshold = threshold;
        self
    }

    pub fn with_lens_samples(mut self, rings: u32, sectors: u32) -> Self {
        self.lens_samples = [rings, sectors];
        self
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loading render config from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check the values and normalize those that have an obvious fix.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid {
                field: "width/height",
                message: format!("{}x{} is empty", self.width, self.height),
            });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_depth",
                message: "must be at least 1".to_string(),
            });
        }
        if !(self.min_contribution >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "min_contribution",
                message: format!("{} is negative", self.min_contribution),
            });
        }
        if !(self.aa_threshold >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "aa_threshold",
                message: format!("{} is negative", self.aa_threshold),
            });
        }
        if self.aa_samples == 0 {
            self.aa_samples = 1;
        }
        if self.aa_samples % 2 == 0 {
            log::warn!(
                "AA mask size {} is even, using {}",
                self.aa_samples,
                self.aa_samples + 1
            );
            self.aa_samples += 1;
        }
        self.lens_samples = [self.lens_samples[0].max(1), self.lens_samples[1].max(1)];
        self.progress_interval = self.progress_interval.max(1);
        Ok(self)
    }

    /// Number of primary rays per pixel for depth of field.
    pub fn lens_sample_count(&self) -> u32 {
        self.lens_samples[0] * self.lens_samples[1]
    }
}
