//! Errors raised while building or updating a scene.

use thiserror::Error;

/// Errors that can occur when editing the scene graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("Unknown node handle: {0}")]
    UnknownNode(usize),

    #[error("Unknown mesh handle: {0}")]
    UnknownMesh(usize),

    #[error("Unknown material handle: {0}")]
    UnknownMaterial(usize),

    #[error("Node '{0}' is not a group and cannot have children")]
    NotAGroup(String),

    #[error("Circular reference through node '{0}'")]
    Cycle(String),

    #[error("Mesh '{mesh}' has index {index} but only {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },

    #[error("Mesh '{mesh}': {message}")]
    InvalidMesh { mesh: String, message: String },
}

/// Result alias for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
