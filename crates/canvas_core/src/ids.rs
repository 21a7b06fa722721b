//! Identifiers for nodes and messages.
//!
//! Ids are opaque strings so that documents written by older exports
//! (which used `node-<millis>` style ids) still load. Fresh ids are always
//! minted from a v4 UUID, never from the wall clock.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a conversation node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Mint a fresh, unique node id.
    pub fn generate() -> Self {
        Self(format!("node-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single message inside a node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Mint a fresh, unique message id.
    pub fn generate() -> Self {
        Self(format!("msg-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_node_ids_are_distinct_back_to_back() {
        let ids: HashSet<NodeId> = (0..10_000).map(|_| NodeId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn node_id_serializes_as_plain_string() {
        let id = NodeId::from("node-1712345678901");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"node-1712345678901\"");
    }

    #[test]
    fn message_ids_carry_prefix() {
        assert!(MessageId::generate().as_str().starts_with("msg-"));
        assert!(NodeId::generate().as_str().starts_with("node-"));
    }
}
