//! Integration tests: clipboard copy/paste through the session.

use nodall_core::*;
use nodall_editor::*;
use pretty_assertions::assert_eq;
use std::collections::HashSet;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session_with(board: Board) -> BoardSession {
    init_logging();
    let store = BoardStore::with_board(board, Box::new(MemoryStorage::new()), BoardConfig::default());
    BoardSession::new(store, Viewport::default()).with_id_generator(IdGenerator::starting_at(500))
}

fn selected(mut node: Node) -> Node {
    node.selected = true;
    node
}

/// Three task lists in a row, the first two selected, connected a→b→c.
fn chain() -> Board {
    Board {
        nodes: vec![
            selected(Node::task_list("a", Position::new(10.0, 20.0))),
            selected(Node::task_list("b", Position::new(310.0, 80.0))),
            Node::task_list("c", Position::new(610.0, 20.0)),
        ],
        edges: vec![Edge::new("ab", "a", "b"), Edge::new("bc", "b", "c")],
    }
}

fn ids(nodes: &[Node]) -> HashSet<NodeId> {
    nodes.iter().map(|n| n.id).collect()
}

#[test]
fn paste_preserves_topology_and_relative_layout() {
    let mut s = session_with(chain());
    assert_eq!(s.copy(), 2);
    let before = s.board().clone();

    let new_ids = s.paste_at(Position::new(1000.0, 1000.0));
    assert_eq!(new_ids.len(), 2);
    assert_eq!(s.board().nodes.len(), before.nodes.len() + 2);
    assert_eq!(s.board().edges.len(), before.edges.len() + 1);

    let fresh: HashSet<NodeId> = new_ids.iter().copied().collect();
    assert!(fresh.is_disjoint(&ids(&before.nodes)));
    let new_edge = s.board().edges.last().unwrap();
    assert!(fresh.contains(&new_edge.source) && fresh.contains(&new_edge.target));
    assert_eq!(new_edge.id.as_str(), "ab-500");

    let pos = |id: &str| s.board().node(NodeId::intern(id)).unwrap().position;
    assert_eq!(pos("a-500"), Position::new(1000.0, 1000.0));
    assert_eq!(pos("b-500") - pos("a-500"), pos("b") - pos("a"));
}

#[test]
fn copy_excludes_boundary_edges() {
    let mut s = session_with(chain());
    s.copy();
    let edges: Vec<&str> = s.clipboard().edges().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(edges, vec!["ab"]);
}

#[test]
fn paste_selects_only_the_new_nodes() {
    let mut s = session_with(chain());
    s.copy();
    let new_ids = s.paste_at(Position::ORIGIN);
    let selected: HashSet<NodeId> = s.canvas().selected_nodes(s.board()).into_iter().collect();
    assert_eq!(selected, new_ids.into_iter().collect::<HashSet<_>>());
}

#[test]
fn paste_is_repeatable_with_fresh_ids() {
    let mut s = session_with(chain());
    s.copy();
    let first = s.paste_at(Position::new(0.0, 500.0));
    let second = s.paste_at(Position::new(0.0, 900.0));
    assert!(first.iter().all(|id| !second.contains(id)));
    assert_eq!(s.board().nodes.len(), 7);
    assert_eq!(s.board().edges.len(), 4);
}

#[test]
fn keyboard_paste_lands_under_pointer() {
    let mut s = session_with(chain());
    s.canvas_mut().pan_by(-100.0, 0.0);
    assert!(!s.handle(&InputEvent::key("c", Modifiers::CTRL)));
    s.handle(&InputEvent::pointer_move(200.0, 300.0));
    assert!(s.handle(&InputEvent::key("v", Modifiers::CTRL)));

    let pasted = s.board().node(NodeId::intern("a-500")).unwrap();
    assert_eq!(pasted.position, Position::new(300.0, 300.0));
}

#[test]
fn cut_leaves_board_untouched() {
    let mut s = session_with(chain());
    let before = s.store().snapshot();
    assert!(!s.handle(&InputEvent::key("x", Modifiers::META)));
    assert_eq!(s.clipboard().nodes().len(), 2);
    assert!(std::sync::Arc::ptr_eq(&before, &s.store().snapshot()));
}

#[test]
fn copying_a_frame_keeps_its_children_nested() {
    let mut s = session_with(Board {
        nodes: vec![
            selected(Node::group("frame", Position::new(100.0, 100.0))),
            selected(Node::task_list("card", Position::new(25.0, 25.0)).with_parent("frame")),
            Node::task_list("loose", Position::new(800.0, 0.0)),
        ],
        edges: vec![],
    });
    s.copy();
    s.paste_at(Position::new(400.0, 400.0));

    let card = s.board().node(NodeId::intern("card-500")).unwrap();
    assert_eq!(card.parent_id, Some(NodeId::intern("frame-500")));
    assert_eq!(card.position, Position::new(25.0, 25.0));
    assert_eq!(
        layout::absolute_position(s.board(), card.id),
        Some(Position::new(425.0, 425.0))
    );
    assert!(layout::is_paint_ordered(s.board()));
}

#[test]
fn copying_only_a_child_pastes_it_top_level() {
    let mut s = session_with(Board {
        nodes: vec![
            Node::group("frame", Position::new(100.0, 100.0)),
            selected(Node::task_list("card", Position::new(25.0, 25.0)).with_parent("frame")),
        ],
        edges: vec![],
    });
    s.copy();
    s.paste_at(Position::new(0.0, 0.0));
    let card = s.board().node(NodeId::intern("card-500")).unwrap();
    assert_eq!(card.parent_id, None);
    assert_eq!(card.position, Position::ORIGIN);
}
