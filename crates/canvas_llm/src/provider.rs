use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use thiserror::Error;

use canvas_core::{ConversationNode, Role};

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error(transparent)]
    Canvas(#[from] canvas_core::CanvasError),
}

pub type Result<T> = std::result::Result<T, InferenceError>;

/// Text deltas of one assistant reply, in arrival order.
pub type InferenceStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// One history entry as sent to the model.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    /// Full history of a node, system messages included.
    pub fn history_of(node: &ConversationNode) -> Vec<ChatTurn> {
        node.messages
            .iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Stream a reply to `history` from `model`.
    async fn chat_stream(&self, history: &[ChatTurn], model: &str) -> Result<InferenceStream>;
}
