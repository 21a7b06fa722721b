//! The working canvas kept as a project document on disk.
//!
//! Fork drafts are not part of the document, so they live in a sidecar
//! file next to it until a message is sent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use canvas_core::serializer::{from_json, to_json};
use canvas_core::{Canvas, NodeFactory, NodeId};

pub struct GraphFile {
    path: PathBuf,
}

impl GraphFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn drafts_path(&self) -> PathBuf {
        self.path.with_extension("drafts.json")
    }

    /// Load the canvas, or start an empty one if no file exists yet.
    pub fn load(&self, factory: NodeFactory) -> anyhow::Result<Canvas> {
        let mut canvas = Canvas::new(factory);
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "GraphFile: starting empty canvas");
            return Ok(canvas);
        }

        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let document =
            from_json(&json).with_context(|| format!("parsing {}", self.path.display()))?;
        canvas.import(document)?;
        self.restore_drafts(&mut canvas)?;
        canvas.drain_updates();
        Ok(canvas)
    }

    fn restore_drafts(&self, canvas: &mut Canvas) -> anyhow::Result<()> {
        let path = self.drafts_path();
        if !path.exists() {
            return Ok(());
        }
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let drafts: BTreeMap<String, String> =
            serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;

        for (node_id, text) in drafts {
            let node_id = NodeId::from(node_id);
            if let Err(err) = canvas.restore_draft(&node_id, &text) {
                tracing::debug!(node_id = %node_id, error = %err, "GraphFile: dropping stale draft");
            }
        }
        Ok(())
    }

    pub fn save(&self, canvas: &Canvas) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = to_json(&canvas.export())?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;

        let drafts: BTreeMap<&str, &str> = canvas
            .store()
            .drafts()
            .map(|(id, text)| (id.as_str(), text))
            .collect();
        let drafts_path = self.drafts_path();
        if drafts.is_empty() {
            if drafts_path.exists() {
                std::fs::remove_file(&drafts_path)?;
            }
        } else {
            std::fs::write(&drafts_path, serde_json::to_string_pretty(&drafts)?)
                .with_context(|| format!("writing {}", drafts_path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::Position;

    #[test]
    fn missing_file_gives_empty_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let file = GraphFile::new(dir.path().join("graph.json"));

        let canvas = file.load(NodeFactory::default()).unwrap();
        assert!(canvas.store().is_empty());
    }

    #[test]
    fn save_then_load_keeps_graph() {
        let dir = tempfile::tempdir().unwrap();
        let file = GraphFile::new(dir.path().join("nested").join("graph.json"));

        let mut canvas = Canvas::default();
        let root = canvas.create_root(Position::new(10.0, 20.0)).unwrap();
        canvas.send_user_message(&root, "hello").unwrap();
        canvas.fork(&root, None, None).unwrap();
        file.save(&canvas).unwrap();

        let loaded = file.load(NodeFactory::default()).unwrap();
        assert_eq!(loaded.export().nodes, canvas.export().nodes);
        assert_eq!(loaded.export().edges, canvas.export().edges);
    }

    #[test]
    fn fork_draft_survives_until_message_is_sent() {
        let dir = tempfile::tempdir().unwrap();
        let file = GraphFile::new(dir.path().join("graph.json"));

        let mut canvas = Canvas::default();
        let root = canvas.create_root(Position::default()).unwrap();
        let child = canvas
            .fork(&root, None, Some("chlorophyll"))
            .unwrap()
            .node_id;
        file.save(&canvas).unwrap();
        assert!(file.drafts_path().exists());

        let mut loaded = file.load(NodeFactory::default()).unwrap();
        assert_eq!(loaded.draft(&child), Some("chlorophyll"));
        assert!(loaded.drain_updates().is_empty());

        loaded.send_user_message(&child, "chlorophyll").unwrap();
        file.save(&loaded).unwrap();
        assert!(!file.drafts_path().exists());
        assert!(file.load(NodeFactory::default()).unwrap().draft(&child).is_none());
    }

    #[test]
    fn draft_for_missing_node_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let file = GraphFile::new(dir.path().join("graph.json"));
        let mut canvas = Canvas::default();
        canvas.create_root(Position::default()).unwrap();
        file.save(&canvas).unwrap();
        std::fs::write(file.drafts_path(), r#"{"node-gone":"quote"}"#).unwrap();

        let loaded = file.load(NodeFactory::default()).unwrap();
        assert_eq!(loaded.store().drafts().count(), 0);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, "{\"version\":\"1.0.0\"").unwrap();

        assert!(GraphFile::new(path).load(NodeFactory::default()).is_err());
    }
}
