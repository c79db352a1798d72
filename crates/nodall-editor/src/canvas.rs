//! Canvas Engine capability: screen projection, intersection queries and
//! selection state.
//!
//! Rendering lives outside this crate. Everything the editor needs from the
//! canvas goes through [`CanvasEngine`]; [`Viewport`] is a headless
//! implementation with pan and zoom.

use crate::hit;
use nodall_core::layout::{self, Bounds};
use nodall_core::model::*;
use nodall_core::{BoardConfig, NodeId};

/// Which nodes an intersection query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeFilter {
    #[default]
    All,
    Groups,
}

impl NodeFilter {
    pub fn accepts(self, node: &Node) -> bool {
        match self {
            NodeFilter::All => true,
            NodeFilter::Groups => node.is_group(),
        }
    }
}

pub trait CanvasEngine {
    /// Screen coordinates → board coordinates.
    fn project(&self, screen: Position) -> Position;

    /// Nodes (other than `id`) whose rectangles overlap the rectangle of `id`,
    /// in paint order. Empty when `id` is not on the board.
    fn intersecting_nodes(&self, board: &Board, id: NodeId, filter: NodeFilter) -> Vec<NodeId>;

    /// Currently selected nodes, in paint order.
    fn selected_nodes(&self, board: &Board) -> Vec<NodeId>;

    /// Topmost node under a board-space point.
    fn node_at(&self, board: &Board, point: Position) -> Option<NodeId>;
}

/// Pan/zoom viewport over the board.
///
/// `screen = board * zoom + pan`.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub pan: Position,
    pub zoom: f32,
    config: BoardConfig,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(BoardConfig::default())
    }
}

impl Viewport {
    pub const MIN_ZOOM: f32 = 0.1;
    pub const MAX_ZOOM: f32 = 4.0;

    pub fn new(config: BoardConfig) -> Self {
        Self {
            pan: Position::ORIGIN,
            zoom: 1.0,
            config,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Board coordinates → screen coordinates.
    pub fn to_screen(&self, board: Position) -> Position {
        Position::new(board.x * self.zoom + self.pan.x, board.y * self.zoom + self.pan.y)
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan = self.pan + Position::new(dx, dy);
    }

    /// Multiply the zoom by `factor`, keeping the board point under `anchor`
    /// (screen coordinates) fixed.
    pub fn zoom_at(&mut self, anchor: Position, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let fixed = self.project(anchor);
        self.zoom = (self.zoom * factor).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        self.pan = Position::new(anchor.x - fixed.x * self.zoom, anchor.y - fixed.y * self.zoom);
    }
}

impl CanvasEngine for Viewport {
    fn project(&self, screen: Position) -> Position {
        Position::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    fn intersecting_nodes(&self, board: &Board, id: NodeId, filter: NodeFilter) -> Vec<NodeId> {
        let bounds = layout::resolve_bounds(board, &self.config);
        let Some(rect) = bounds.get(&id).copied() else {
            return Vec::new();
        };
        hit::hit_test_rect(board, &bounds, &rect)
            .into_iter()
            .filter(|other| *other != id)
            .filter(|other| board.node(*other).is_some_and(|n| filter.accepts(n)))
            .collect()
    }

    fn selected_nodes(&self, board: &Board) -> Vec<NodeId> {
        board.selected_nodes().map(|n| n.id).collect()
    }

    fn node_at(&self, board: &Board, point: Position) -> Option<NodeId> {
        let bounds = layout::resolve_bounds(board, &self.config);
        hit::hit_test(board, &bounds, point)
    }
}

/// Rectangle of the visible board area for a screen of the given size.
pub fn visible_area(viewport: &Viewport, width: f32, height: f32) -> Bounds {
    let top_left = viewport.project(Position::ORIGIN);
    Bounds::at(top_left, (width / viewport.zoom, height / viewport.zoom))
}
