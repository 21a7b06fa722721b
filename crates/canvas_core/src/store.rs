//! GraphStore - the single source of truth for nodes and edges.
//!
//! Reads are open to anyone. Writes go through `put`, `add_edge` and
//! `reset`, or through the factory, branch engine and appender, which
//! keep the node map and the edge list in step.

use std::collections::{HashMap, HashSet};

use crate::error::{CanvasError, Result};
use crate::events::GraphUpdate;
use crate::ids::{MessageId, NodeId};
use crate::structs::edge::Edge;
use crate::structs::message::Message;
use crate::structs::node::ConversationNode;

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: HashMap<NodeId, ConversationNode>,
    /// Insertion order of `nodes`, so exports are stable.
    order: Vec<NodeId>,
    edges: Vec<Edge>,
    /// Uncommitted input seeded by a fork-on-selection. Never serialized.
    drafts: HashMap<NodeId, String>,
    updates: Vec<GraphUpdate>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a node up. Absence is not an error: callers racing a reset
    /// simply get `None`.
    pub fn get(&self, node_id: &NodeId) -> Option<&ConversationNode> {
        self.nodes.get(node_id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Insert a new node or replace an existing record with the same id.
    ///
    /// A new node's parent must already exist, and a replacement may not
    /// change the parent it was created with. Inserting a child also
    /// links it to its parent.
    pub fn put(&mut self, node: ConversationNode) -> Result<()> {
        if !node.position.is_finite() {
            return Err(CanvasError::Validation(format!(
                "node {} has a non-finite position ({}, {})",
                node.id, node.position.x, node.position.y
            )));
        }
        let mut message_ids = HashSet::with_capacity(node.messages.len());
        if !node.messages.iter().all(|m| message_ids.insert(&m.id)) {
            return Err(CanvasError::Validation(format!(
                "node {} repeats a message id",
                node.id
            )));
        }

        let mut new_link = None;
        match self.nodes.get(&node.id) {
            Some(existing) => {
                if existing.parent_id != node.parent_id {
                    return Err(CanvasError::Validation(format!(
                        "parent of node {} cannot change",
                        node.id
                    )));
                }
            }
            None => {
                if let Some(parent_id) = &node.parent_id {
                    if !self.nodes.contains_key(parent_id) {
                        tracing::warn!(
                            node_id = %node.id,
                            parent_id = %parent_id,
                            "GraphStore: rejecting node with dangling parent"
                        );
                        return Err(CanvasError::NodeNotFound(parent_id.clone()));
                    }
                }
                self.order.push(node.id.clone());
                new_link = node.parent_id.clone();
            }
        }

        let node_id = node.id.clone();
        tracing::debug!(
            node_id = %node_id,
            message_count = node.messages.len(),
            "GraphStore: put node"
        );
        self.nodes.insert(node_id.clone(), node);
        self.updates.push(GraphUpdate::NodeUpserted {
            node_id: node_id.clone(),
        });
        if let Some(parent_id) = new_link {
            self.add_edge(&parent_id, &node_id)?;
        }
        Ok(())
    }

    /// Link `source` to `target`. Both endpoints must exist and `target`
    /// must have been created as a child of `source`. Adding an edge that
    /// is already present is a no-op.
    pub fn add_edge(&mut self, source: &NodeId, target: &NodeId) -> Result<()> {
        for endpoint in [source, target] {
            if !self.nodes.contains_key(endpoint) {
                tracing::warn!(
                    source = %source,
                    target = %target,
                    missing = %endpoint,
                    "GraphStore: edge endpoint not found"
                );
                return Err(CanvasError::NodeNotFound(endpoint.clone()));
            }
        }

        let child_parent = self.nodes.get(target).and_then(|n| n.parent_id.as_ref());
        if child_parent != Some(source) {
            return Err(CanvasError::Validation(format!(
                "node {target} is not a child of {source}"
            )));
        }

        if self.edges.iter().any(|e| e.connects(source, target)) {
            return Ok(());
        }

        self.edges.push(Edge::new(source.clone(), target.clone()));
        self.updates.push(GraphUpdate::EdgeAdded {
            source: source.clone(),
            target: target.clone(),
        });
        Ok(())
    }

    /// Drop every node, edge and draft.
    pub fn reset(&mut self) {
        tracing::info!(
            node_count = self.nodes.len(),
            edge_count = self.edges.len(),
            "GraphStore: reset"
        );
        self.nodes.clear();
        self.order.clear();
        self.edges.clear();
        self.drafts.clear();
        self.updates.push(GraphUpdate::Reset);
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &ConversationNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn total_messages(&self) -> usize {
        self.nodes.values().map(|n| n.messages.len()).sum()
    }

    pub fn children_of<'a>(
        &'a self,
        parent_id: &'a NodeId,
    ) -> impl Iterator<Item = &'a ConversationNode> + 'a {
        self.nodes()
            .filter(move |n| n.parent_id.as_ref() == Some(parent_id))
    }

    pub fn draft(&self, node_id: &NodeId) -> Option<&str> {
        self.drafts.get(node_id).map(String::as_str)
    }

    /// Pending drafts in node creation order.
    pub fn drafts(&self) -> impl Iterator<Item = (&NodeId, &str)> {
        self.order
            .iter()
            .filter_map(|id| self.drafts.get_key_value(id))
            .map(|(id, text)| (id, text.as_str()))
    }

    /// Hand the draft input over to the caller, clearing it.
    pub fn take_draft(&mut self, node_id: &NodeId) -> Option<String> {
        self.drafts.remove(node_id)
    }

    /// Everything that changed since the last drain, oldest first.
    pub fn drain_updates(&mut self) -> Vec<GraphUpdate> {
        std::mem::take(&mut self.updates)
    }

    /// Verify that the edge list is exactly the set of parent links.
    pub fn check_consistency(&self) -> Result<()> {
        let expected: HashSet<(&NodeId, &NodeId)> = self
            .nodes
            .values()
            .filter_map(|n| n.parent_id.as_ref().map(|p| (p, &n.id)))
            .collect();
        let actual: HashSet<(&NodeId, &NodeId)> =
            self.edges.iter().map(|e| (&e.source, &e.target)).collect();

        if actual.len() != self.edges.len() {
            return Err(CanvasError::InvalidDocument("duplicate edge".to_string()));
        }
        if expected != actual {
            return Err(CanvasError::InvalidDocument(format!(
                "{} parent links but {} matching edges",
                expected.len(),
                expected.intersection(&actual).count()
            )));
        }
        Ok(())
    }

    pub(crate) fn set_draft(&mut self, node_id: &NodeId, text: String) {
        self.drafts.insert(node_id.clone(), text);
    }

    /// Append `message`, first removing `replaces` if it is still present.
    pub(crate) fn push_message(
        &mut self,
        node_id: &NodeId,
        message: Message,
        replaces: Option<&MessageId>,
    ) -> Result<()> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| CanvasError::NodeNotFound(node_id.clone()))?;

        if node.contains_message(&message.id) {
            return Err(CanvasError::Validation(format!(
                "message {} already present on node {}",
                message.id, node_id
            )));
        }

        let mut replaced = None;
        if let Some(old_id) = replaces {
            if let Some(index) = node.messages.iter().position(|m| &m.id == old_id) {
                node.messages.remove(index);
                replaced = Some(old_id.clone());
            }
        }

        let message_id = message.id.clone();
        node.messages.push(message);
        self.updates.push(GraphUpdate::MessageAppended {
            node_id: node_id.clone(),
            message_id,
            replaced,
        });
        Ok(())
    }

    pub(crate) fn withdraw_message(&mut self, node_id: &NodeId, message_id: &MessageId) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return false;
        };
        let Some(index) = node.messages.iter().position(|m| &m.id == message_id) else {
            return false;
        };
        node.messages.remove(index);
        self.updates.push(GraphUpdate::MessageWithdrawn {
            node_id: node_id.clone(),
            message_id: message_id.clone(),
        });
        true
    }
}
