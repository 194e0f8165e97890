//! Error taxonomy for library parsing, mesh handling and placement.
//!
//! Library and probability parsing errors abort library construction.
//! Mesh errors are raised per placement and only cost that one object;
//! the scene keeps going. Application plumbing wraps these in `anyhow`.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Error)]
pub enum SceneError {
    /// A library description or probability line could not be parsed.
    #[error("malformed entry in {}:{line}: {reason}", .path.display())]
    MalformedDescriptor {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Tried to draw from a size category or class with nothing in it.
    #[error("cannot draw a {category} object{}", of_class(.class))]
    EmptyCategory {
        category: &'static str,
        class: Option<String>,
    },

    /// The bounding box volume of a mesh is not strictly positive.
    #[error("degenerate mesh {}: bounding box volume is {volume}", .path.display())]
    DegenerateMesh { path: PathBuf, volume: f32 },

    #[error("failed to load mesh {}: {reason}", .path.display())]
    MeshLoad { path: PathBuf, reason: String },

    /// The physics engine refused a body.
    #[error("physics engine error: {0}")]
    Physics(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn of_class(class: &Option<String>) -> String {
    match class {
        Some(class) => format!(" of class '{class}'"),
        None => String::new(),
    }
}

impl SceneError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        SceneError::MalformedDescriptor {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}
