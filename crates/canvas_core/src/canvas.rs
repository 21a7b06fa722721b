//! Canvas - command-dispatch controller over the graph store.
//!
//! The view layer sends a [`Command`] naming a node id and a payload; the
//! controller performs the mutation and answers with the result, the
//! updates it produced, and a notice for the user. Failed commands leave
//! the store unchanged and never panic.

use serde::{Deserialize, Serialize};

use crate::appender::{MessageAppender, PendingTurn};
use crate::branch::{BranchEngine, ForkOutcome};
use crate::error::{CanvasError, Result};
use crate::events::{GraphUpdate, Notice};
use crate::factory::NodeFactory;
use crate::ids::{MessageId, NodeId};
use crate::serializer::{self, ProjectStats, SerializedProject};
use crate::store::GraphStore;
use crate::structs::message::Message;
use crate::structs::node::{ConversationNode, Position};
use crate::transcript::transcript;
use crate::view::GraphView;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    CreateRoot {
        position: Position,
    },
    Fork {
        node_id: NodeId,
        #[serde(default)]
        position: Option<Position>,
        #[serde(default)]
        selected_text: Option<String>,
    },
    SendUserMessage {
        node_id: NodeId,
        content: String,
    },
    Rename {
        node_id: NodeId,
        title: String,
    },
    SetModel {
        node_id: NodeId,
        model: String,
    },
    Move {
        node_id: NodeId,
        position: Position,
    },
    Import {
        document: SerializedProject,
    },
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    NodeCreated(ForkOutcome),
    MessageAppended(Message),
    NodeUpdated(NodeId),
    Imported(ProjectStats),
    Cleared,
}

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// `None` when the command was refused.
    pub result: Option<CommandResult>,
    pub updates: Vec<GraphUpdate>,
    pub notice: Option<Notice>,
}

impl CommandOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Canvas {
    store: GraphStore,
    factory: NodeFactory,
    branches: BranchEngine,
    appender: MessageAppender,
}

impl Canvas {
    pub fn new(factory: NodeFactory) -> Self {
        Self {
            store: GraphStore::new(),
            factory,
            branches: BranchEngine::new(),
            appender: MessageAppender::new(),
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn node(&self, node_id: &NodeId) -> Option<&ConversationNode> {
        self.store.get(node_id)
    }

    pub fn dispatch(&mut self, command: Command) -> CommandOutcome {
        let label = command_label(&command);
        let result = match command {
            Command::CreateRoot { position } => self
                .create_root(position)
                .map(|node_id| {
                    CommandResult::NodeCreated(ForkOutcome {
                        node_id,
                        draft_input: None,
                    })
                }),
            Command::Fork {
                node_id,
                position,
                selected_text,
            } => self
                .fork(&node_id, position, selected_text.as_deref())
                .map(CommandResult::NodeCreated),
            Command::SendUserMessage { node_id, content } => self
                .send_user_message(&node_id, &content)
                .map(CommandResult::MessageAppended),
            Command::Rename { node_id, title } => self
                .rename(&node_id, &title)
                .map(|_| CommandResult::NodeUpdated(node_id)),
            Command::SetModel { node_id, model } => self
                .set_model(&node_id, &model)
                .map(|_| CommandResult::NodeUpdated(node_id)),
            Command::Move { node_id, position } => self
                .move_node(&node_id, position)
                .map(|_| CommandResult::NodeUpdated(node_id)),
            Command::Import { document } => self.import(document).map(CommandResult::Imported),
            Command::Reset => {
                self.store.reset();
                Ok(CommandResult::Cleared)
            }
        };

        let updates = self.store.drain_updates();
        match result {
            Ok(result) => CommandOutcome {
                notice: success_notice(&result),
                result: Some(result),
                updates,
            },
            Err(err) => {
                tracing::warn!(command = label, error = %err, "Canvas: command refused");
                CommandOutcome {
                    result: None,
                    updates,
                    notice: Some(failure_notice(&err)),
                }
            }
        }
    }

    pub fn create_root(&mut self, position: Position) -> Result<NodeId> {
        self.factory.create_root(&mut self.store, position)
    }

    pub fn fork(
        &mut self,
        source_id: &NodeId,
        position: Option<Position>,
        selected_text: Option<&str>,
    ) -> Result<ForkOutcome> {
        self.branches
            .fork(&mut self.store, &self.factory, source_id, position, selected_text)
    }

    pub fn send_user_message(&mut self, node_id: &NodeId, content: &str) -> Result<Message> {
        let message = self
            .appender
            .append_user_message(&mut self.store, node_id, content)?;
        // A committed message consumes any draft seeded by a fork.
        self.store.take_draft(node_id);
        Ok(message)
    }

    pub fn add_system_message(&mut self, node_id: &NodeId, content: &str) -> Result<Message> {
        self.appender
            .append_system_message(&mut self.store, node_id, content)
    }

    pub fn rename(&mut self, node_id: &NodeId, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CanvasError::Validation("title cannot be empty".to_string()));
        }
        self.update_node(node_id, |node| node.title = title.to_string())
    }

    pub fn set_model(&mut self, node_id: &NodeId, model: &str) -> Result<()> {
        let model = model.trim();
        if model.is_empty() {
            return Err(CanvasError::Validation("model cannot be empty".to_string()));
        }
        self.update_node(node_id, |node| node.model = model.to_string())
    }

    pub fn move_node(&mut self, node_id: &NodeId, position: Position) -> Result<()> {
        self.update_node(node_id, |node| node.position = position)
    }

    pub fn import(&mut self, document: SerializedProject) -> Result<ProjectStats> {
        serializer::import_into(&mut self.store, document)
    }

    pub fn export(&self) -> SerializedProject {
        serializer::serialize(&self.store)
    }

    pub fn reset(&mut self) {
        self.store.reset();
    }

    pub fn view(&self) -> GraphView {
        GraphView::build(&self.store)
    }

    pub fn transcript(&self, node_id: &NodeId) -> Result<String> {
        self.store
            .get(node_id)
            .map(transcript)
            .ok_or_else(|| CanvasError::NodeNotFound(node_id.clone()))
    }

    pub fn draft(&self, node_id: &NodeId) -> Option<&str> {
        self.store.draft(node_id)
    }

    /// Put back a draft kept outside the project document.
    pub fn restore_draft(&mut self, node_id: &NodeId, text: &str) -> Result<()> {
        if !self.store.contains(node_id) {
            return Err(CanvasError::NodeNotFound(node_id.clone()));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(CanvasError::Validation("draft cannot be empty".to_string()));
        }
        self.store.set_draft(node_id, text.to_string());
        Ok(())
    }

    pub fn drain_updates(&mut self) -> Vec<GraphUpdate> {
        self.store.drain_updates()
    }

    pub fn begin_turn(&self, node_id: &NodeId) -> Result<PendingTurn> {
        self.appender.begin_turn(&self.store, node_id)
    }

    pub fn push_delta(&mut self, turn: &mut PendingTurn, delta: &str) -> Result<Option<Message>> {
        self.appender.push_delta(&mut self.store, turn, delta)
    }

    pub fn finish_turn(&self, turn: PendingTurn) -> Option<MessageId> {
        self.appender.finish_turn(turn)
    }

    pub fn abort_turn(&mut self, turn: PendingTurn) -> bool {
        self.appender.abort_turn(&mut self.store, turn)
    }

    fn update_node<F>(&mut self, node_id: &NodeId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ConversationNode),
    {
        let mut node = self
            .store
            .get(node_id)
            .cloned()
            .ok_or_else(|| CanvasError::NodeNotFound(node_id.clone()))?;
        apply(&mut node);
        self.store.put(node)
    }
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::CreateRoot { .. } => "create_root",
        Command::Fork { .. } => "fork",
        Command::SendUserMessage { .. } => "send_user_message",
        Command::Rename { .. } => "rename",
        Command::SetModel { .. } => "set_model",
        Command::Move { .. } => "move",
        Command::Import { .. } => "import",
        Command::Reset => "reset",
    }
}

fn success_notice(result: &CommandResult) -> Option<Notice> {
    match result {
        CommandResult::NodeCreated(outcome) if outcome.draft_input.is_some() => {
            Some(Notice::success("Created new branch from selection"))
        }
        CommandResult::NodeCreated(_) => Some(Notice::success("Created new conversation")),
        CommandResult::Imported(stats) => Some(Notice::success(format!(
            "Graph imported: {} nodes, {} edges",
            stats.total_nodes, stats.total_edges
        ))),
        CommandResult::Cleared => Some(Notice::success("Canvas cleared")),
        CommandResult::MessageAppended(_) | CommandResult::NodeUpdated(_) => None,
    }
}

fn failure_notice(err: &CanvasError) -> Notice {
    match err {
        CanvasError::NodeNotFound(_) => Notice::warning(err.to_string()),
        _ => Notice::error(err.to_string()),
    }
}
