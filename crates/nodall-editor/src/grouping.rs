//! Grouping Engine: drag-to-attach and detach.
//!
//! A dragged node becomes a child of a group when, on drop, its rectangle
//! overlaps exactly one group other than its current parent. While dragging,
//! that group is only flagged (`pending_attach`); parents never change
//! mid-drag. Zero or several candidates mean no reparenting.
//!
//! Positions are converted between frames so the node stays where it was
//! dropped: `local = absolute - parent_origin`, clamped to the parent's
//! positive quadrant on attach.

use crate::canvas::{CanvasEngine, NodeFilter};
use crate::store::{BoardMutation, BoardStore};
use log::{debug, info};
use nodall_core::layout;
use nodall_core::model::*;
use nodall_core::NodeId;

/// The single group `node` would attach to if dropped now.
///
/// Groups nested inside `node` are never candidates, so a node cannot be
/// attached into its own subtree.
pub fn attach_target(board: &Board, canvas: &dyn CanvasEngine, node: NodeId) -> Option<NodeId> {
    let current_parent = board.node(node)?.parent_id;
    let candidates: Vec<NodeId> = canvas
        .intersecting_nodes(board, node, NodeFilter::Groups)
        .into_iter()
        .filter(|g| *g != node && !layout::is_ancestor_of(board, node, *g))
        .collect();
    match candidates.as_slice() {
        [only] if Some(*only) != current_parent => Some(*only),
        _ => None,
    }
}

/// Drag tick: move `node` to `position` (in its current frame) and flag the
/// group it would attach to. Returns the flagged group.
pub fn on_drag(
    store: &mut BoardStore,
    canvas: &dyn CanvasEngine,
    node: NodeId,
    position: Position,
) -> Option<NodeId> {
    if !store.board().contains_node(node) {
        debug!("on_drag: no node {node}");
        return None;
    }
    let moved = NodeChange::Position { id: node, position };
    let mut preview = store.board().clone();
    preview.apply_node_changes(std::slice::from_ref(&moved));
    let target = attach_target(&preview, canvas, node);

    store.apply(BoardMutation::Batch(vec![
        BoardMutation::NodeChanges(vec![moved]),
        BoardMutation::SetPendingAttach { target },
    ]));
    target
}

/// Drop: move `node` to `position`, then attach it to the single candidate
/// group, if any. Pending flags are cleared either way. Returns the new
/// parent when the node was attached.
pub fn on_drag_stop(
    store: &mut BoardStore,
    canvas: &dyn CanvasEngine,
    node: NodeId,
    position: Position,
) -> Option<NodeId> {
    if !store.board().contains_node(node) {
        debug!("on_drag_stop: no node {node}");
        return None;
    }
    let moved = NodeChange::Position { id: node, position };
    let mut preview = store.board().clone();
    preview.apply_node_changes(std::slice::from_ref(&moved));

    let mut batch = vec![BoardMutation::NodeChanges(vec![moved])];
    let target = attach_target(&preview, canvas, node);
    if let Some(group) = target
        && let Some(absolute) = layout::absolute_position(&preview, node)
        && let Some(origin) = layout::absolute_position(&preview, group)
    {
        info!("attaching {node} to group {group}");
        batch.push(BoardMutation::Reparent {
            id: node,
            parent: Some(group),
            position: (absolute - origin).clamp_non_negative(),
        });
    }
    batch.push(BoardMutation::SetPendingAttach { target: None });
    store.apply(BoardMutation::Batch(batch));
    target
}

/// Lift `ids` out of their parents, keeping their absolute positions. When
/// `remove_parent` is given, that node is deleted afterwards (along with any
/// children not listed in `ids`). Returns whether the board changed.
pub fn detach(store: &mut BoardStore, ids: &[NodeId], remove_parent: Option<NodeId>) -> bool {
    let board = store.board();
    let mut batch: Vec<BoardMutation> = ids
        .iter()
        .filter_map(|&id| {
            let node = board.node(id)?;
            node.parent_id?;
            let absolute = layout::absolute_position(board, id)?;
            Some(BoardMutation::Reparent {
                id,
                parent: None,
                position: absolute,
            })
        })
        .collect();
    if let Some(parent) = remove_parent {
        batch.push(BoardMutation::DeleteElements {
            nodes: vec![parent],
            edges: vec![],
        });
    }
    if batch.is_empty() {
        return false;
    }
    store.apply(BoardMutation::Batch(batch))
}

/// Detach every child of `frame`, then remove the frame.
pub fn ungroup(store: &mut BoardStore, frame: NodeId) -> bool {
    if !store.board().is_group(frame) {
        debug!("ungroup: {frame} is not a group");
        return false;
    }
    let children: Vec<NodeId> = store.board().children_of(frame).map(|n| n.id).collect();
    info!("ungrouping {frame} ({} children)", children.len());
    detach(store, &children, Some(frame))
}
