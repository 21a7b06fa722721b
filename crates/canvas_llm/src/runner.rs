//! Drive one user turn through a provider and into the canvas.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::RwLock;

use canvas_core::{Canvas, CanvasError, Message, MessageId, NodeId};

use crate::provider::{ChatTurn, InferenceProvider, Result};

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The reply was merged into the node. `message_id` is `None` when the
    /// model produced no text.
    Completed {
        user_message: Message,
        message_id: Option<MessageId>,
        content: String,
    },
    /// The node was removed while the reply was streaming.
    Abandoned { user_message: Message },
}

pub struct TurnRunner<P: InferenceProvider> {
    canvas: Arc<RwLock<Canvas>>,
    provider: Arc<P>,
}

impl<P: InferenceProvider> TurnRunner<P> {
    pub fn new(canvas: Arc<RwLock<Canvas>>, provider: Arc<P>) -> Self {
        Self { canvas, provider }
    }

    /// Append `content` as a user message on `node_id` and stream the
    /// assistant reply into that node.
    ///
    /// The canvas lock is held only while touching the graph, never across
    /// an await on the provider, so other commands (forks included) run
    /// while a reply streams. Each chunk is merged into whatever the node
    /// looks like at that moment.
    pub async fn run(&self, node_id: &NodeId, content: &str) -> Result<TurnOutcome> {
        self.run_with(node_id, content, |_| {}).await
    }

    /// Like [`TurnRunner::run`], calling `on_delta` with each text delta
    /// after it has been merged.
    pub async fn run_with<F>(
        &self,
        node_id: &NodeId,
        content: &str,
        mut on_delta: F,
    ) -> Result<TurnOutcome>
    where
        F: FnMut(&str) + Send,
    {
        let (user_message, history, model, mut turn) = {
            let mut canvas = self.canvas.write().await;
            let user_message = canvas.send_user_message(node_id, content)?;
            let node = canvas
                .node(node_id)
                .ok_or_else(|| CanvasError::NodeNotFound(node_id.clone()))?;
            let history = ChatTurn::history_of(node);
            let model = node.model.clone();
            let turn = canvas.begin_turn(node_id)?;
            (user_message, history, model, turn)
        };

        tracing::info!(
            node_id = %node_id,
            model = %model,
            history_len = history.len(),
            "TurnRunner: requesting reply"
        );
        let mut stream = self.provider.chat_stream(&history, &model).await?;

        while let Some(item) = stream.next().await {
            let mut canvas = self.canvas.write().await;
            let delta = match item {
                Ok(delta) => delta,
                Err(err) => {
                    let withdrawn = canvas.abort_turn(turn);
                    tracing::warn!(
                        node_id = %node_id,
                        withdrawn,
                        error = %err,
                        "TurnRunner: stream failed"
                    );
                    return Err(err);
                }
            };

            match canvas.push_delta(&mut turn, &delta) {
                Ok(_) => on_delta(&delta),
                Err(err) if err.is_missing_reference() => {
                    tracing::info!(node_id = %node_id, "TurnRunner: node gone, abandoning turn");
                    return Ok(TurnOutcome::Abandoned { user_message });
                }
                Err(err) => {
                    canvas.abort_turn(turn);
                    return Err(err.into());
                }
            }
        }

        let content = turn.content().to_string();
        let canvas = self.canvas.read().await;
        if !canvas.store().contains(node_id) {
            return Ok(TurnOutcome::Abandoned { user_message });
        }
        let message_id = canvas.finish_turn(turn);
        tracing::debug!(
            node_id = %node_id,
            reply_len = content.len(),
            "TurnRunner: reply complete"
        );
        Ok(TurnOutcome::Completed {
            user_message,
            message_id,
            content,
        })
    }
}
