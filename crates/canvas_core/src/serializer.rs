//! GraphSerializer - versioned project documents for export, import and
//! durable storage.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, Result};
use crate::ids::NodeId;
use crate::store::GraphStore;
use crate::structs::edge::Edge;
use crate::structs::node::ConversationNode;

/// Version tag written into every document.
pub const SCHEMA_VERSION: &str = "1.0.0";

const SUPPORTED_VERSIONS: &[&str] = &[SCHEMA_VERSION];

/// Summary counts, recomputed on every serialize.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_messages: usize,
}

impl ProjectStats {
    pub fn compute(nodes: &[ConversationNode], edges: &[Edge]) -> Self {
        Self {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            total_messages: nodes.iter().map(|n| n.messages.len()).sum(),
        }
    }
}

/// The whole graph as a persistable document.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedProject {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub nodes: Vec<ConversationNode>,
    pub edges: Vec<Edge>,
    pub metadata: ProjectStats,
}

/// A single conversation exported on its own.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeExport {
    pub node: ConversationNode,
    pub exported_at: DateTime<Utc>,
}

/// Snapshot the store into a document.
pub fn serialize(store: &GraphStore) -> SerializedProject {
    let nodes: Vec<ConversationNode> = store.nodes().cloned().collect();
    let edges = store.edges().to_vec();
    let metadata = ProjectStats::compute(&nodes, &edges);

    SerializedProject {
        version: SCHEMA_VERSION.to_string(),
        exported_at: Utc::now(),
        nodes,
        edges,
        metadata,
    }
}

/// Validate a document and hand back its nodes and edges.
///
/// Rejects unknown versions, duplicate node ids, parents that do not
/// resolve, and edge lists that disagree with the parent links.
pub fn deserialize(document: SerializedProject) -> Result<(Vec<ConversationNode>, Vec<Edge>)> {
    check_version(&document.version)?;
    validate(&document)?;
    Ok((document.nodes, document.edges))
}

fn validate(document: &SerializedProject) -> Result<()> {
    let mut ids: HashSet<&NodeId> = HashSet::with_capacity(document.nodes.len());
    for node in &document.nodes {
        if !ids.insert(&node.id) {
            return Err(CanvasError::InvalidDocument(format!(
                "duplicate node id {}",
                node.id
            )));
        }
        let mut message_ids = HashSet::with_capacity(node.messages.len());
        if !node.messages.iter().all(|m| message_ids.insert(&m.id)) {
            return Err(CanvasError::InvalidDocument(format!(
                "node {} repeats a message id",
                node.id
            )));
        }
    }

    let mut links: HashSet<(&NodeId, &NodeId)> = HashSet::new();
    for node in &document.nodes {
        if let Some(parent_id) = &node.parent_id {
            if !ids.contains(parent_id) {
                return Err(CanvasError::InvalidDocument(format!(
                    "node {} references missing parent {}",
                    node.id, parent_id
                )));
            }
            links.insert((parent_id, &node.id));
        }
    }

    let mut seen_edges: HashSet<(&NodeId, &NodeId)> = HashSet::new();
    for edge in &document.edges {
        let pair = (&edge.source, &edge.target);
        if !links.contains(&pair) || !seen_edges.insert(pair) {
            return Err(CanvasError::InvalidDocument(format!(
                "edge {} does not match a parent link",
                edge.id
            )));
        }
    }
    if seen_edges.len() != links.len() {
        return Err(CanvasError::InvalidDocument(format!(
            "{} parent links but only {} edges",
            links.len(),
            seen_edges.len()
        )));
    }

    let recomputed = ProjectStats::compute(&document.nodes, &document.edges);
    if recomputed != document.metadata {
        tracing::warn!(
            declared = ?document.metadata,
            actual = ?recomputed,
            "GraphSerializer: metadata counts disagree with contents"
        );
    }
    Ok(())
}

/// Replace the store contents with a validated document. On any error the
/// store is left exactly as it was.
pub fn import_into(store: &mut GraphStore, document: SerializedProject) -> Result<ProjectStats> {
    let (nodes, _) = deserialize(document)?;

    // Parents are inserted before children regardless of document order.
    let mut staged = GraphStore::new();
    let mut pending = nodes;
    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        for node in pending {
            let ready = node
                .parent_id
                .as_ref()
                .map_or(true, |parent| staged.contains(parent));
            if ready {
                staged.put(node)?;
            } else {
                deferred.push(node);
            }
        }
        if deferred.len() == before {
            return Err(CanvasError::InvalidDocument(
                "parent links form a cycle".to_string(),
            ));
        }
        pending = deferred;
    }
    // Every validated edge mirrors a parent link, so `put` has recreated it.
    staged.check_consistency()?;

    store.reset();
    let ordered: Vec<ConversationNode> = staged.nodes().cloned().collect();
    for node in ordered {
        store.put(node)?;
    }

    let stats = ProjectStats {
        total_nodes: store.len(),
        total_edges: store.edges().len(),
        total_messages: store.total_messages(),
    };
    tracing::info!(
        total_nodes = stats.total_nodes,
        total_edges = stats.total_edges,
        total_messages = stats.total_messages,
        "GraphSerializer: document imported"
    );
    Ok(stats)
}

pub fn to_json(document: &SerializedProject) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Parse a document, checking the version tag before the body so that
/// documents from a newer schema fail with a clear version error.
pub fn from_json(json: &str) -> Result<SerializedProject> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let version = value
        .get("version")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| CanvasError::InvalidDocument("missing version tag".to_string()))?;
    check_version(version)?;
    Ok(serde_json::from_value(value)?)
}

pub fn export_node(node: &ConversationNode) -> NodeExport {
    NodeExport {
        node: node.clone(),
        exported_at: Utc::now(),
    }
}

fn check_version(version: &str) -> Result<()> {
    if SUPPORTED_VERSIONS.contains(&version) {
        Ok(())
    } else {
        Err(CanvasError::UnsupportedVersion(version.to_string()))
    }
}
