//! Canvas error types

use thiserror::Error;

use crate::ids::NodeId;

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported document version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CanvasError {
    /// Races against a reset or import surface as missing nodes.
    pub fn is_missing_reference(&self) -> bool {
        matches!(self, CanvasError::NodeNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CanvasError>;
