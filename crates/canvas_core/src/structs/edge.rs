use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

/// Parent to child link between two nodes, derived from the child's `parent_id`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: Self::id_for(&source, &target),
            source,
            target,
        }
    }

    /// Edge ids are a pure function of their endpoints.
    pub fn id_for(source: &NodeId, target: &NodeId) -> String {
        format!("edge-{source}-{target}")
    }

    pub fn connects(&self, source: &NodeId, target: &NodeId) -> bool {
        &self.source == source && &self.target == target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_id_is_derived_from_endpoints() {
        let edge = Edge::new(NodeId::from("a"), NodeId::from("b"));
        assert_eq!(edge.id, "edge-a-b");
        assert!(edge.connects(&NodeId::from("a"), &NodeId::from("b")));
        assert!(!edge.connects(&NodeId::from("b"), &NodeId::from("a")));
    }

    #[test]
    fn extra_wire_fields_are_ignored() {
        let edge: Edge = serde_json::from_str(
            r#"{"id":"edge-a-b","source":"a","target":"b","animated":true,"style":{"strokeWidth":2}}"#,
        )
        .unwrap();
        assert_eq!(edge.target, NodeId::from("b"));
    }
}
