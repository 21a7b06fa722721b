//! canvas_core - conversation trees and the branching engine
//!
//! This crate holds the in-memory model shared by every other canvas crate:
//! - `store` - GraphStore, the node map and edge list
//! - `factory` - NodeFactory for root and child nodes
//! - `appender` - MessageAppender and the pending-turn accumulator
//! - `branch` - BranchEngine (fork, fork-on-selection)
//! - `serializer` - versioned project documents
//! - `canvas` - command-dispatch controller tying the above together

pub mod appender;
pub mod branch;
pub mod canvas;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod ids;
pub mod models;
pub mod paths;
pub mod serializer;
pub mod store;
pub mod structs;
pub mod transcript;
pub mod view;

// Re-export commonly used types
pub use appender::{MessageAppender, PendingTurn};
pub use branch::{BranchEngine, ForkOutcome};
pub use canvas::{Canvas, Command, CommandOutcome, CommandResult};
pub use config::CanvasConfig;
pub use error::{CanvasError, Result};
pub use events::{GraphUpdate, Notice, NoticeLevel};
pub use factory::NodeFactory;
pub use ids::{MessageId, NodeId};
pub use models::{model_info, ModelInfo, ModelProvider, DEFAULT_MODEL, MODELS};
pub use serializer::{NodeExport, ProjectStats, SerializedProject, SCHEMA_VERSION};
pub use store::GraphStore;
pub use structs::edge::Edge;
pub use structs::message::{Attachment, Message, Role};
pub use structs::node::{ConversationNode, Position};
pub use view::{GraphView, NodeCard};
