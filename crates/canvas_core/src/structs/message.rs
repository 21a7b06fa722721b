use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// Who authored a message.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// System messages are kept in storage but never shown.
    pub fn is_visible(&self) -> bool {
        !matches!(self, Role::System)
    }
}

/// A file reference carried alongside a message.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub url: String,
}

/// One turn in a conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            timestamp,
            attachments: None,
        }
    }

    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Role::User, content, timestamp)
    }

    pub fn assistant(content: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Role::Assistant, content, timestamp)
    }

    pub fn system(content: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Role::System, content, timestamp)
    }
}
