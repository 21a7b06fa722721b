use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, NodeId};
use crate::structs::message::Message;

/// Canvas coordinate of a node. Layout only; carries no tree meaning.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// JSON has no encoding for NaN or infinity.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One chat thread in the tree, with its own history and model choice.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationNode {
    pub id: NodeId,
    pub title: String,
    pub model: String,
    pub messages: Vec<Message>,
    /// Node this one was forked from. Set once at creation.
    pub parent_id: Option<NodeId>,
    pub position: Position,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl ConversationNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Messages that may be shown to a user (system messages excluded).
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role.is_visible())
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn contains_message(&self, message_id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == message_id)
    }
}
