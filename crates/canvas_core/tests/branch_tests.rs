//! Tests for forking and tree invariants

use std::collections::HashSet;

use canvas_core::{
    BranchEngine, Canvas, GraphStore, MessageAppender, NodeFactory, NodeId, Position, Role,
};

fn edge_pairs(store: &GraphStore) -> HashSet<(NodeId, NodeId)> {
    store
        .edges()
        .iter()
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect()
}

fn parent_links(store: &GraphStore) -> HashSet<(NodeId, NodeId)> {
    store
        .nodes()
        .filter_map(|n| n.parent_id.clone().map(|p| (p, n.id.clone())))
        .collect()
}

#[test]
fn test_root_and_two_forks_scenario() {
    let mut canvas = Canvas::default();
    let root = canvas.create_root(Position::new(400.0, 250.0)).unwrap();
    canvas
        .send_user_message(&root, "What is photosynthesis?")
        .unwrap();
    let mut turn = canvas.begin_turn(&root).unwrap();
    canvas.push_delta(&mut turn, "Photosynthesis is...").unwrap();
    canvas.finish_turn(turn);
    assert_eq!(canvas.node(&root).unwrap().messages.len(), 2);

    let a = canvas.fork(&root, None, None).unwrap().node_id;
    let node_a = canvas.node(&a).unwrap();
    assert_eq!(node_a.messages, canvas.node(&root).unwrap().messages);
    assert_eq!(node_a.parent_id.as_ref(), Some(&root));
    assert_eq!(canvas.store().edges().len(), 1);
    assert!(canvas.store().edges()[0].connects(&root, &a));

    let b = canvas.fork(&root, None, Some("chlorophyll")).unwrap().node_id;
    let node_b = canvas.node(&b).unwrap();
    assert!(node_b.messages.is_empty());
    assert_eq!(node_b.parent_id.as_ref(), Some(&root));
    assert_eq!(canvas.store().edges().len(), 2);
    assert_eq!(canvas.store().len(), 3);
}

#[test]
fn test_fork_isolation_both_directions() {
    let mut store = GraphStore::new();
    let factory = NodeFactory::default();
    let appender = MessageAppender::new();
    let source = factory.create_root(&mut store, Position::default()).unwrap();
    let m1 = appender.append_user_message(&mut store, &source, "m1").unwrap();
    let m2 = appender.append_user_message(&mut store, &source, "m2").unwrap();

    let child = BranchEngine::new()
        .fork(&mut store, &factory, &source, None, None)
        .unwrap()
        .node_id;
    assert_eq!(store.get(&child).unwrap().messages, vec![m1.clone(), m2.clone()]);

    let m3 = appender.append_user_message(&mut store, &source, "m3").unwrap();
    assert_eq!(store.get(&child).unwrap().messages, vec![m1.clone(), m2.clone()]);

    let m4 = appender.append_user_message(&mut store, &child, "m4").unwrap();
    assert_eq!(store.get(&source).unwrap().messages, vec![m1.clone(), m2.clone(), m3]);
    assert_eq!(store.get(&child).unwrap().messages, vec![m1, m2, m4]);
}

#[test]
fn test_fork_with_selection_is_empty_regardless_of_history() {
    let mut canvas = Canvas::default();
    let root = canvas.create_root(Position::default()).unwrap();
    for i in 0..7 {
        canvas.send_user_message(&root, &format!("turn {i}")).unwrap();
    }

    let outcome = canvas.fork(&root, None, Some("a quoted span")).unwrap();

    assert!(canvas.node(&outcome.node_id).unwrap().messages.is_empty());
    assert_eq!(outcome.draft_input.as_deref(), Some("a quoted span"));
    assert_eq!(canvas.node(&root).unwrap().messages.len(), 7);
}

#[test]
fn test_node_ids_unique_under_rapid_creation() {
    let mut canvas = Canvas::default();
    let root = canvas.create_root(Position::default()).unwrap();
    let mut ids = HashSet::from([root.clone()]);

    for _ in 0..500 {
        ids.insert(canvas.create_root(Position::default()).unwrap());
        ids.insert(canvas.fork(&root, None, None).unwrap().node_id);
    }

    assert_eq!(ids.len(), 1001);
    assert_eq!(canvas.store().len(), 1001);
}

#[test]
fn test_edges_track_parent_links_through_mixed_operations() {
    let mut canvas = Canvas::default();
    let root = canvas.create_root(Position::default()).unwrap();
    let mut frontier = vec![root];

    for step in 0..40 {
        let source = frontier[step % frontier.len()].clone();
        match step % 4 {
            0 => frontier.push(canvas.fork(&source, None, None).unwrap().node_id),
            1 => frontier.push(canvas.fork(&source, None, Some("quote")).unwrap().node_id),
            2 => {
                canvas.send_user_message(&source, "more").unwrap();
            }
            _ => frontier.push(canvas.create_root(Position::default()).unwrap()),
        }
        // Failed operations must not disturb the correspondence either.
        assert!(canvas.fork(&NodeId::from("missing"), None, None).is_err());

        let store = canvas.store();
        assert_eq!(edge_pairs(store), parent_links(store));
        assert_eq!(store.edges().len(), parent_links(store).len());
        store.check_consistency().unwrap();
    }
}

#[test]
fn test_streamed_reply_keeps_message_ids_distinct() {
    let mut canvas = Canvas::default();
    let root = canvas.create_root(Position::default()).unwrap();
    canvas.send_user_message(&root, "hi").unwrap();

    let mut turn = canvas.begin_turn(&root).unwrap();
    for delta in ["Hel", "lo", " there", "!"] {
        canvas.push_delta(&mut turn, delta).unwrap();
    }
    let final_id = canvas.finish_turn(turn).unwrap();

    let messages = &canvas.node(&root).unwrap().messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].id, final_id);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hello there!");
    let ids: HashSet<_> = messages.iter().map(|m| &m.id).collect();
    assert_eq!(ids.len(), messages.len());
}

#[test]
fn test_turn_on_reset_node_is_benign() {
    let mut canvas = Canvas::default();
    let root = canvas.create_root(Position::default()).unwrap();
    let mut turn = canvas.begin_turn(&root).unwrap();
    canvas.reset();

    let err = canvas.push_delta(&mut turn, "late chunk").unwrap_err();
    assert!(err.is_missing_reference());
    assert!(!canvas.abort_turn(turn));
    assert!(canvas.store().is_empty());
}
