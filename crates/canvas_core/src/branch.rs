//! BranchEngine - forks a node into a new child.
//!
//! A plain fork copies the source history into the child. A fork on a
//! text selection starts the child empty and parks the selection as a
//! draft input for it instead.

use rand::Rng;

use crate::error::{CanvasError, Result};
use crate::factory::NodeFactory;
use crate::ids::NodeId;
use crate::store::GraphStore;
use crate::structs::node::Position;

/// Horizontal distance between a source node and its forks.
pub const FORK_OFFSET_X: f64 = 450.0;

/// Forks land within this many units above or below their source.
pub const FORK_JITTER_Y: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ForkOutcome {
    pub node_id: NodeId,
    /// Pre-filled, uncommitted input for the new node.
    pub draft_input: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BranchEngine;

impl BranchEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn fork(
        &self,
        store: &mut GraphStore,
        factory: &NodeFactory,
        source_id: &NodeId,
        position: Option<Position>,
        selected_text: Option<&str>,
    ) -> Result<ForkOutcome> {
        let source = store
            .get(source_id)
            .ok_or_else(|| CanvasError::NodeNotFound(source_id.clone()))?;

        let selection = selected_text
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        // Independent copy: later appends to either side stay local.
        let initial_messages = match &selection {
            Some(_) => Vec::new(),
            None => source.messages.clone(),
        };
        let position = position.unwrap_or_else(|| Self::default_position(&source.position));

        let node_id = factory.create_child(store, source_id, position, initial_messages)?;

        if let Some(text) = &selection {
            store.set_draft(&node_id, text.clone());
        }

        tracing::info!(
            source_id = %source_id,
            node_id = %node_id,
            from_selection = selection.is_some(),
            "BranchEngine: fork created"
        );

        Ok(ForkOutcome {
            node_id,
            draft_input: selection,
        })
    }

    /// To the right of the source, with a little vertical jitter.
    pub fn default_position(source: &Position) -> Position {
        let jitter = rand::thread_rng().gen_range(-FORK_JITTER_Y..FORK_JITTER_Y);
        Position::new(source.x + FORK_OFFSET_X, source.y + jitter)
    }
}
