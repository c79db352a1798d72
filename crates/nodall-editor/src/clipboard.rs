//! Clipboard Buffer: copy a selection as a self-contained subgraph and paste
//! it back with fresh ids.
//!
//! The buffer is always closed under its own references:
//! - every edge has both endpoints in the buffer;
//! - every `parent_id` names a node in the buffer. Nodes whose parent was not
//!   selected are stored top-level at their absolute position.

use crate::canvas::CanvasEngine;
use crate::store::BoardStore;
use log::{debug, info};
use nodall_core::layout;
use nodall_core::model::*;
use nodall_core::NodeId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipboardBuffer {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl ClipboardBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Snapshot the selected nodes and the edges internal to them, replacing
    /// the previous contents. Returns the number of nodes copied.
    pub fn copy(&mut self, board: &Board, canvas: &dyn CanvasEngine) -> usize {
        let selected: HashSet<NodeId> = canvas.selected_nodes(board).into_iter().collect();

        self.nodes = board
            .nodes
            .iter()
            .filter(|n| selected.contains(&n.id))
            .map(|n| {
                let mut copy = n.clone();
                copy.pending_attach = false;
                if let Some(parent) = n.parent_id
                    && !selected.contains(&parent)
                {
                    copy.parent_id = None;
                    copy.position = layout::absolute_position(board, n.id).unwrap_or(n.position);
                }
                copy
            })
            .collect();
        self.edges = board
            .edges
            .iter()
            .filter(|e| selected.contains(&e.source) && selected.contains(&e.target))
            .cloned()
            .map(|mut e| {
                e.selected = false;
                e
            })
            .collect();

        debug!(
            "copied {} nodes, {} edges",
            self.nodes.len(),
            self.edges.len()
        );
        self.nodes.len()
    }

    /// Copy without removing anything from the board.
    pub fn cut(&mut self, board: &Board, canvas: &dyn CanvasEngine) -> usize {
        let copied = self.copy(board, canvas);
        info!("cut copied {copied} nodes; the selection stays on the board");
        copied
    }

    /// Build the subgraph a paste at `target` would insert, using `token`
    /// to derive fresh ids. Top-level nodes are translated so the buffer's
    /// top-left corner lands on `target`.
    pub fn instantiate(&self, target: Position, token: u64) -> (Vec<Node>, Vec<Edge>) {
        let top_level = self.nodes.iter().filter(|n| n.parent_id.is_none());
        let min = top_level.fold(None, |acc: Option<Position>, n| {
            Some(match acc {
                Some(m) => Position::new(m.x.min(n.position.x), m.y.min(n.position.y)),
                None => n.position,
            })
        });
        let Some(min) = min else {
            return (Vec::new(), Vec::new());
        };

        let ids: HashMap<NodeId, NodeId> = self
            .nodes
            .iter()
            .map(|n| (n.id, n.id.with_token(token)))
            .collect();
        let remap = |id: NodeId| ids.get(&id).copied().unwrap_or(id);

        let nodes = self
            .nodes
            .iter()
            .map(|n| {
                let mut fresh = n.clone();
                fresh.id = remap(n.id);
                match n.parent_id {
                    Some(parent) => fresh.parent_id = Some(remap(parent)),
                    None => fresh.position = target + (n.position - min),
                }
                fresh
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|e| Edge::new(e.id.with_token(token), remap(e.source), remap(e.target)))
            .collect();
        (nodes, edges)
    }

    /// Insert a fresh copy of the buffer at `target`. Existing nodes are
    /// deselected and the pasted ones selected. Returns the new node ids.
    pub fn paste(&self, store: &mut BoardStore, target: Position, token: u64) -> Vec<NodeId> {
        if self.is_empty() {
            debug!("paste: clipboard is empty");
            return Vec::new();
        }
        let (nodes, edges) = self.instantiate(target, token);
        let new_ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        store.insert_subgraph(nodes, edges);
        info!("pasted {} nodes at ({}, {})", new_ids.len(), target.x, target.y);
        new_ids
    }
}
