//! Gesture tools.
//!
//! Each tool turns a gesture into `BoardMutation`s for the `BoardStore`; none
//! of them touches the board directly.

use crate::canvas::CanvasEngine;
use crate::store::{BoardMutation, edge_id};
use log::debug;
use nodall_core::layout;
use nodall_core::model::*;
use nodall_core::{BoardConfig, NodeId};

// ─── Connect Tool ────────────────────────────────────────────────────────

/// Drag from a node's handle to connect it.
///
/// Releasing over another node connects the two. Releasing over the empty
/// pane creates a task-list node there and connects to it; node and edge
/// share the id `newNode_<token>`.
#[derive(Debug, Default)]
pub struct ConnectTool {
    source: Option<NodeId>,
}

impl ConnectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, source: NodeId) {
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<NodeId> {
        self.source
    }

    pub fn cancel(&mut self) {
        self.source = None;
    }

    /// Finish the gesture at `release` (board coordinates).
    pub fn end(
        &mut self,
        board: &Board,
        canvas: &dyn CanvasEngine,
        release: Position,
        token: u64,
    ) -> Vec<BoardMutation> {
        let Some(source) = self.source.take() else {
            return vec![];
        };
        if !board.contains_node(source) {
            debug!("connect: source {source} vanished mid-gesture");
            return vec![];
        }

        match canvas.node_at(board, release) {
            Some(target) if target == source => vec![],
            Some(target) => {
                let connection = Connection { source, target };
                vec![BoardMutation::Connect {
                    id: edge_id(&connection, token),
                    connection,
                }]
            }
            None => {
                let id = NodeId::intern(&format!("newNode_{token}"));
                let node = Node::task_list(id, release).with_steps([Step::new(0)]);
                vec![BoardMutation::Batch(vec![
                    BoardMutation::AddNode(Box::new(node)),
                    BoardMutation::Connect {
                        id,
                        connection: Connection { source, target: id },
                    },
                ])]
            }
        }
    }
}

// ─── Resize Tool ─────────────────────────────────────────────────────────

/// Resize handle on a node, clamped to the node's minimum size.
#[derive(Debug, Default)]
pub struct ResizeTool {
    target: Option<NodeId>,
}

impl ResizeTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, id: NodeId) {
        self.target = Some(id);
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn end(&mut self) {
        self.target = None;
    }

    /// Resize the active node to at least its minimum size.
    pub fn update(
        &self,
        board: &Board,
        config: &BoardConfig,
        width: f32,
        height: f32,
    ) -> Option<BoardMutation> {
        let id = self.target?;
        let (min_w, min_h) = min_size(board, config, id)?;
        Some(BoardMutation::NodeChanges(vec![NodeChange::Dimensions {
            id,
            width: width.max(min_w),
            height: height.max(min_h),
        }]))
    }
}

/// Minimum size for a resize: task lists have a fixed floor, groups must
/// still wrap their children with the margin. `None` for missing nodes.
pub fn min_size(board: &Board, config: &BoardConfig, id: NodeId) -> Option<(f32, f32)> {
    let node = board.node(id)?;
    Some(match &node.kind {
        NodeKind::TaskList { .. } => (config.task_list_min_width, config.task_list_min_height),
        NodeKind::Group {} => layout::min_group_size(board, id, config).unwrap_or((0.0, 0.0)),
    })
}
