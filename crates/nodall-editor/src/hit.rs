//! Hit testing: point → node and rectangle → nodes lookups.
//!
//! The node collection is in paint order, so walking it in reverse visits
//! the topmost node first.

use nodall_core::layout::Bounds;
use nodall_core::model::*;
use nodall_core::NodeId;
use std::collections::HashMap;

/// Find the topmost node at `point` (board coordinates).
/// Returns `None` if no node is hit (empty pane).
pub fn hit_test(board: &Board, bounds: &HashMap<NodeId, Bounds>, point: Position) -> Option<NodeId> {
    hit_test_where(board, bounds, point, |_| true)
}

/// Like [`hit_test`], restricted to nodes accepted by `filter`.
pub fn hit_test_where(
    board: &Board,
    bounds: &HashMap<NodeId, Bounds>,
    point: Position,
    filter: impl Fn(&Node) -> bool,
) -> Option<NodeId> {
    board
        .nodes
        .iter()
        .rev()
        .filter(|&n| filter(n))
        .find(|n| bounds.get(&n.id).is_some_and(|b| b.contains(point)))
        .map(|n| n.id)
}

/// All nodes whose bounds strictly overlap `rect`, in paint order.
/// Used for marquee selection and drag-over queries.
pub fn hit_test_rect(board: &Board, bounds: &HashMap<NodeId, Bounds>, rect: &Bounds) -> Vec<NodeId> {
    board
        .nodes
        .iter()
        .filter(|n| bounds.get(&n.id).is_some_and(|b| b.intersects(rect)))
        .map(|n| n.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodall_core::{BoardConfig, layout};

    fn board() -> Board {
        Board {
            nodes: vec![
                Node::group("frame", Position::new(0.0, 0.0)),
                Node::task_list("card", Position::new(30.0, 30.0))
                    .with_parent("frame")
                    .with_size(100.0, 60.0),
                Node::task_list("far", Position::new(1000.0, 1000.0)).with_size(100.0, 60.0),
            ],
            edges: vec![],
        }
    }

    #[test]
    fn hit_topmost_first() {
        let board = board();
        let bounds = layout::resolve_bounds(&board, &BoardConfig::default());
        assert_eq!(
            hit_test(&board, &bounds, Position::new(50.0, 50.0)),
            Some(NodeId::intern("card"))
        );
        // Inside the frame margin but outside the card.
        assert_eq!(
            hit_test(&board, &bounds, Position::new(10.0, 10.0)),
            Some(NodeId::intern("frame"))
        );
    }

    #[test]
    fn hit_empty_pane() {
        let board = board();
        let bounds = layout::resolve_bounds(&board, &BoardConfig::default());
        assert_eq!(hit_test(&board, &bounds, Position::new(600.0, 600.0)), None);
    }

    #[test]
    fn hit_filter_skips_rejected_nodes() {
        let board = board();
        let bounds = layout::resolve_bounds(&board, &BoardConfig::default());
        assert_eq!(
            hit_test_where(&board, &bounds, Position::new(50.0, 50.0), Node::is_group),
            Some(NodeId::intern("frame"))
        );
    }

    #[test]
    fn rect_collects_overlaps_in_paint_order() {
        let board = board();
        let bounds = layout::resolve_bounds(&board, &BoardConfig::default());
        let hits = hit_test_rect(&board, &bounds, &Bounds::new(40.0, 40.0, 20.0, 20.0));
        assert_eq!(hits, vec![NodeId::intern("frame"), NodeId::intern("card")]);
        assert!(hit_test_rect(&board, &bounds, &Bounds::new(500.0, 500.0, 5.0, 5.0)).is_empty());
    }
}
