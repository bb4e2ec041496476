//! Render errors.

use glint_core::SceneError;
use thiserror::Error;

use crate::config::ConfigError;

/// Conditions that abort a render before any worker starts.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Scene has no camera")]
    NoCamera,

    #[error("Scene has no visible geometry")]
    NoGeometry,

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Invalid render configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type RenderResult<T> = Result<T, RenderError>;
