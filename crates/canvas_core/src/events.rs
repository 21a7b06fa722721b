//! Updates emitted by the graph store so a view layer can stay in sync
//! without holding references into node records.

use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, NodeId};

/// A single mutation applied to the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphUpdate {
    /// A node was inserted or its record replaced.
    NodeUpserted { node_id: NodeId },

    /// An edge between two existing nodes was inserted.
    EdgeAdded { source: NodeId, target: NodeId },

    /// A message landed on a node. `replaced` names the partial
    /// assistant message it superseded, if any.
    MessageAppended {
        node_id: NodeId,
        message_id: MessageId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replaced: Option<MessageId>,
    },

    /// A partial assistant message was withdrawn after a failed stream.
    MessageWithdrawn {
        node_id: NodeId,
        message_id: MessageId,
    },

    /// Every node and edge was removed.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A user-facing toast-style message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
