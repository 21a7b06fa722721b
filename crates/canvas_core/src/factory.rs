//! NodeFactory - mints root and child nodes with fresh identifiers.

use std::collections::HashSet;

use chrono::Utc;

use crate::error::{CanvasError, Result};
use crate::ids::NodeId;
use crate::models::DEFAULT_MODEL;
use crate::store::GraphStore;
use crate::structs::message::Message;
use crate::structs::node::{ConversationNode, Position};

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone)]
pub struct NodeFactory {
    default_model: String,
}

impl Default for NodeFactory {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl NodeFactory {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Create a node with no parent and no messages.
    pub fn create_root(&self, store: &mut GraphStore, position: Position) -> Result<NodeId> {
        let node = self.build(store, None, position, Vec::new());
        let node_id = node.id.clone();
        store.put(node)?;

        tracing::info!(node_id = %node_id, "NodeFactory: root created");
        Ok(node_id)
    }

    /// Create a child of `parent_id`, seeded with `initial_messages`.
    /// The store links it to its parent.
    pub fn create_child(
        &self,
        store: &mut GraphStore,
        parent_id: &NodeId,
        position: Position,
        initial_messages: Vec<Message>,
    ) -> Result<NodeId> {
        if !store.contains(parent_id) {
            return Err(CanvasError::NodeNotFound(parent_id.clone()));
        }

        let mut seen = HashSet::new();
        if !initial_messages.iter().all(|m| seen.insert(&m.id)) {
            return Err(CanvasError::Validation(
                "initial messages contain duplicate ids".to_string(),
            ));
        }

        let node = self.build(store, Some(parent_id.clone()), position, initial_messages);
        let node_id = node.id.clone();
        let message_count = node.messages.len();

        store.put(node)?;

        tracing::info!(
            node_id = %node_id,
            parent_id = %parent_id,
            message_count,
            "NodeFactory: child created"
        );
        Ok(node_id)
    }

    fn build(
        &self,
        store: &GraphStore,
        parent_id: Option<NodeId>,
        position: Position,
        messages: Vec<Message>,
    ) -> ConversationNode {
        ConversationNode {
            id: NodeId::generate(),
            title: format!("untitled{}", store.len() + 1),
            model: self.default_model.clone(),
            messages,
            parent_id,
            position,
            created_at: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_gets_sequential_title_and_default_model() {
        let mut store = GraphStore::new();
        let factory = NodeFactory::default();

        let first = factory.create_root(&mut store, Position::new(400.0, 250.0)).unwrap();
        let second = factory.create_root(&mut store, Position::default()).unwrap();

        let first = store.get(&first).unwrap();
        assert_eq!(first.title, "untitled1");
        assert_eq!(first.model, DEFAULT_MODEL);
        assert!(first.messages.is_empty());
        assert!(first.is_root());
        assert_eq!(store.get(&second).unwrap().title, "untitled2");
    }

    #[test]
    fn child_requires_existing_parent() {
        let mut store = GraphStore::new();
        let factory = NodeFactory::default();

        let err = factory
            .create_child(&mut store, &NodeId::from("ghost"), Position::default(), Vec::new())
            .unwrap_err();

        assert!(err.is_missing_reference());
        assert!(store.is_empty());
        assert!(store.edges().is_empty());
    }

    #[test]
    fn child_is_linked_to_parent() {
        let mut store = GraphStore::new();
        let factory = NodeFactory::new("mixtral-8x7b-32768");
        let root = factory.create_root(&mut store, Position::default()).unwrap();

        let child = factory
            .create_child(&mut store, &root, Position::new(450.0, 0.0), Vec::new())
            .unwrap();

        assert_eq!(store.get(&child).unwrap().parent_id.as_ref(), Some(&root));
        assert_eq!(store.get(&child).unwrap().model, "mixtral-8x7b-32768");
        assert_eq!(store.edges().len(), 1);
        store.check_consistency().unwrap();
    }

    #[test]
    fn child_rejects_duplicate_seed_messages() {
        let mut store = GraphStore::new();
        let factory = NodeFactory::default();
        let root = factory.create_root(&mut store, Position::default()).unwrap();
        let message = Message::user("hello", 1);

        let result = factory.create_child(
            &mut store,
            &root,
            Position::default(),
            vec![message.clone(), message],
        );

        assert!(matches!(result, Err(CanvasError::Validation(_))));
        assert_eq!(store.len(), 1);
    }
}
