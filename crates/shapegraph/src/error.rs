//! Error types for page processing.
//!
//! This module provides the error type [`PipelineError`]. Every variant is
//! fatal for the page being processed; no partial graph is returned.

use thiserror::Error;

use shapegraph_core::{geometry::GeometryError, shape::ShapeId, source::HierarchyError};

/// The error type for page processing.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid geometry on shape {shape}: {source}")]
    Geometry {
        shape: ShapeId,
        #[source]
        source: GeometryError,
    },

    #[error("Edge of shape {shape} has neither endpoint at that shape")]
    InconsistentEdge { shape: ShapeId },

    #[error("Shape {shape} has no live record and no live ancestor")]
    UnresolvedShape { shape: ShapeId },

    #[error("Shape {shape} appears more than once in the page")]
    DuplicateShape { shape: ShapeId },

    #[error("Config error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Create a new `Geometry` error for the given shape.
    pub fn geometry(shape: ShapeId, source: GeometryError) -> Self {
        Self::Geometry { shape, source }
    }
}

impl From<HierarchyError> for PipelineError {
    fn from(error: HierarchyError) -> Self {
        match error {
            HierarchyError::DuplicateShape(shape) => Self::DuplicateShape { shape },
        }
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(error: toml::de::Error) -> Self {
        Self::Config(error.to_string())
    }
}
