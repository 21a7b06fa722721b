//! # Canvas Storage
//!
//! Durable homes for canvases: content-addressed blob stores, a project
//! registry, and the save/load workflow that ties them to a `Canvas`.

pub mod content;
pub mod error;
pub mod metadata;
pub mod project;
pub mod registry;

// Re-exports
pub use content::{
    get_json, put_json, shorten_cid, ContentId, ContentStore, FileContentStore,
    GatewayContentStore, InMemoryContentStore,
};
pub use error::{Result, StorageError};
pub use metadata::{MetadataAttribute, ProjectMetadata};
pub use project::{ProjectService, SaveRequest, SavedProject};
pub use registry::{
    FileProjectRegistry, InMemoryProjectRegistry, NftStatus, ProjectRecord, ProjectRegistry,
};
