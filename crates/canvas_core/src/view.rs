//! Derived view model. Rebuilt from the store on demand; nothing here is
//! cached or written back.

use serde::Serialize;

use crate::ids::NodeId;
use crate::models::model_info;
use crate::store::GraphStore;
use crate::structs::edge::Edge;
use crate::structs::message::Message;
use crate::structs::node::{ConversationNode, Position};

const PREVIEW_CHARS: usize = 160;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeCard {
    pub id: NodeId,
    pub title: String,
    pub model_name: String,
    /// Visible (non-system) messages only.
    pub message_count: usize,
    pub preview: Option<String>,
    pub position: Position,
    pub has_draft: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GraphView {
    pub nodes: Vec<NodeCard>,
    pub edges: Vec<Edge>,
}

impl GraphView {
    pub fn build(store: &GraphStore) -> Self {
        Self {
            nodes: store.nodes().map(|n| card(store, n)).collect(),
            edges: store.edges().to_vec(),
        }
    }

    pub fn card(&self, node_id: &NodeId) -> Option<&NodeCard> {
        self.nodes.iter().find(|c| &c.id == node_id)
    }
}

fn card(store: &GraphStore, node: &ConversationNode) -> NodeCard {
    NodeCard {
        id: node.id.clone(),
        title: node.title.clone(),
        model_name: model_info(&node.model).name.to_string(),
        message_count: node.visible_messages().count(),
        preview: node.visible_messages().last().map(preview),
        position: node.position,
        has_draft: store.draft(&node.id).is_some(),
    }
}

fn preview(message: &Message) -> String {
    let mut chars = message.content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
