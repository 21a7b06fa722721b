//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Content not found: {0}")]
    ContentNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload rejected ({status}): {body}")]
    Upload { status: u16, body: String },

    #[error("Gateway returned {status} for {cid}")]
    Gateway { status: u16, cid: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Canvas(#[from] canvas_core::CanvasError),
}

pub type Result<T> = std::result::Result<T, StorageError>;
