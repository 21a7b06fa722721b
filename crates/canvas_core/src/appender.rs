//! MessageAppender - adds turns to a node's history.
//!
//! Streamed assistant output is tracked by a [`PendingTurn`] that owns the
//! running content and the id of the message currently standing in for it.
//! Each chunk replaces that message wholesale with a fresh one; nothing is
//! mutated in place and no positional scanning is involved.

use chrono::{DateTime, Utc};

use crate::error::{CanvasError, Result};
use crate::factory::now_millis;
use crate::ids::{MessageId, NodeId};
use crate::store::GraphStore;
use crate::structs::message::{Message, Role};

/// Accumulator for one in-flight assistant reply.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    node_id: NodeId,
    content: String,
    shown: Option<MessageId>,
    chunks: u64,
    started_at: DateTime<Utc>,
}

impl PendingTurn {
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Everything received so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Id of the message currently displayed for this turn.
    pub fn message_id(&self) -> Option<&MessageId> {
        self.shown.as_ref()
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunks
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MessageAppender;

impl MessageAppender {
    pub fn new() -> Self {
        Self
    }

    /// Append a user turn. Content is trimmed; blank content is rejected.
    pub fn append_user_message(
        &self,
        store: &mut GraphStore,
        node_id: &NodeId,
        content: &str,
    ) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CanvasError::Validation(
                "message content cannot be empty".to_string(),
            ));
        }
        self.append(store, node_id, Role::User, content)
    }

    /// Append a system instruction. Kept in storage, hidden from display.
    pub fn append_system_message(
        &self,
        store: &mut GraphStore,
        node_id: &NodeId,
        content: &str,
    ) -> Result<Message> {
        if content.trim().is_empty() {
            return Err(CanvasError::Validation(
                "message content cannot be empty".to_string(),
            ));
        }
        self.append(store, node_id, Role::System, content)
    }

    /// Open an assistant turn on `node_id`. Nothing is written until the
    /// first chunk arrives.
    pub fn begin_turn(&self, store: &GraphStore, node_id: &NodeId) -> Result<PendingTurn> {
        if !store.contains(node_id) {
            return Err(CanvasError::NodeNotFound(node_id.clone()));
        }
        tracing::debug!(node_id = %node_id, "MessageAppender: turn opened");
        Ok(PendingTurn {
            node_id: node_id.clone(),
            content: String::new(),
            shown: None,
            chunks: 0,
            started_at: Utc::now(),
        })
    }

    /// Reflect the running content of a streamed reply. The message shown
    /// for the turn is replaced by a new message with a fresh id.
    pub fn append_assistant_chunk(
        &self,
        store: &mut GraphStore,
        turn: &mut PendingTurn,
        running_content: impl Into<String>,
    ) -> Result<Message> {
        let running_content = running_content.into();
        let timestamp = next_timestamp(store, &turn.node_id)?;
        let message = Message::assistant(running_content.clone(), timestamp);

        store.push_message(&turn.node_id, message.clone(), turn.shown.as_ref())?;

        turn.shown = Some(message.id.clone());
        turn.content = running_content;
        turn.chunks += 1;

        tracing::trace!(
            node_id = %turn.node_id,
            message_id = %message.id,
            sequence = turn.chunks,
            accumulated_chars = turn.content.len(),
            "MessageAppender: chunk applied"
        );
        Ok(message)
    }

    /// Add an incremental `delta` to the turn. Empty deltas are ignored.
    pub fn push_delta(
        &self,
        store: &mut GraphStore,
        turn: &mut PendingTurn,
        delta: &str,
    ) -> Result<Option<Message>> {
        if delta.is_empty() {
            return Ok(None);
        }
        let running = format!("{}{}", turn.content, delta);
        self.append_assistant_chunk(store, turn, running).map(Some)
    }

    /// Close a turn. The last shown message becomes the final reply.
    pub fn finish_turn(&self, turn: PendingTurn) -> Option<MessageId> {
        let elapsed_ms = (Utc::now() - turn.started_at).num_milliseconds();
        tracing::info!(
            node_id = %turn.node_id,
            chunks = turn.chunks,
            content_len = turn.content.len(),
            elapsed_ms,
            "MessageAppender: turn finished"
        );
        turn.shown
    }

    /// Withdraw whatever partial reply the turn has shown. Returns whether
    /// a message was removed.
    pub fn abort_turn(&self, store: &mut GraphStore, turn: PendingTurn) -> bool {
        let Some(message_id) = turn.shown else {
            return false;
        };
        let removed = store.withdraw_message(&turn.node_id, &message_id);
        tracing::warn!(
            node_id = %turn.node_id,
            message_id = %message_id,
            removed,
            "MessageAppender: turn aborted"
        );
        removed
    }

    fn append(
        &self,
        store: &mut GraphStore,
        node_id: &NodeId,
        role: Role,
        content: &str,
    ) -> Result<Message> {
        let timestamp = next_timestamp(store, node_id)?;
        let message = Message::new(role, content, timestamp);
        store.push_message(node_id, message.clone(), None)?;

        tracing::debug!(
            node_id = %node_id,
            message_id = %message.id,
            role = role.as_str(),
            content_len = content.len(),
            "MessageAppender: message appended"
        );
        Ok(message)
    }
}

/// Current time, clamped so a node's timestamps never go backwards.
fn next_timestamp(store: &GraphStore, node_id: &NodeId) -> Result<i64> {
    let node = store
        .get(node_id)
        .ok_or_else(|| CanvasError::NodeNotFound(node_id.clone()))?;
    let now = now_millis();
    Ok(node
        .last_message()
        .map_or(now, |last| last.timestamp.max(now)))
}
