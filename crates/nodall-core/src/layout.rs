//! Board geometry.
//!
//! Nothing here is cached: absolute positions and group rectangles are
//! derived from the current board on every call. A group with children is
//! sized by the union of its children's rectangles grown by the configured
//! margin; an empty group falls back to its explicit or default size.

use crate::config::BoardConfig;
use crate::id::NodeId;
use crate::model::*;
use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet};

/// Absolute axis-aligned rectangle in board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn at(origin: Position, (width, height): (f32, f32)) -> Self {
        Self::new(origin.x, origin.y, width, height)
    }

    pub fn origin(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, p: Position) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Strict AABB overlap; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Grow by `margin` on every side.
    pub fn expand(&self, margin: f32) -> Bounds {
        Bounds::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }
}

// ─── Containment ─────────────────────────────────────────────────────────

/// Parent → child graph of the board. Edges only exist for parents that are
/// present on the board; neighbor order follows collection order.
pub fn containment(board: &Board) -> DiGraphMap<NodeId, ()> {
    let mut graph = DiGraphMap::with_capacity(board.nodes.len(), board.nodes.len());
    for node in &board.nodes {
        graph.add_node(node.id);
    }
    for node in &board.nodes {
        if let Some(parent) = node.parent_id
            && graph.contains_node(parent)
        {
            graph.add_edge(parent, node.id, ());
        }
    }
    graph
}

/// All nodes nested (at any depth) under `id`. Cycle-safe.
pub fn descendants(board: &Board, id: NodeId) -> Vec<NodeId> {
    let graph = containment(board);
    let mut out = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::from([id]);
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if !graph.contains_node(current) {
            continue;
        }
        for child in graph.neighbors_directed(current, Direction::Outgoing) {
            if seen.insert(child) {
                out.push(child);
                stack.push(child);
            }
        }
    }
    out
}

/// Whether `ancestor` is a parent/grandparent/etc. of `descendant`.
pub fn is_ancestor_of(board: &Board, ancestor: NodeId, descendant: NodeId) -> bool {
    ancestors(board, descendant).contains(&ancestor)
}

/// Parent chain of `id`, nearest first. Stops at a missing parent or a cycle.
fn ancestors(board: &Board, id: NodeId) -> Vec<NodeId> {
    let mut chain = Vec::new();
    let mut current = board.node(id).and_then(|n| n.parent_id);
    while let Some(parent) = current {
        if parent == id || chain.contains(&parent) {
            break;
        }
        let Some(node) = board.node(parent) else {
            break;
        };
        chain.push(parent);
        current = node.parent_id;
    }
    chain
}

/// Nesting depth: 0 for top-level nodes.
pub fn depth(board: &Board, id: NodeId) -> usize {
    ancestors(board, id).len()
}

/// Minimal re-order so every parent precedes its children in the collection
/// (and therefore in paint order). A node that appears before its parent is
/// moved to just after it; every other node keeps its relative position.
/// Returns whether the order changed.
pub fn sort_nodes(board: &mut Board) -> bool {
    if is_paint_ordered(board) {
        return false;
    }
    let index: HashMap<NodeId, usize> = board
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id, i))
        .collect();
    let mut waiting: HashMap<NodeId, Vec<usize>> = HashMap::new();
    let mut placed: HashSet<NodeId> = HashSet::new();
    let mut order: Vec<usize> = Vec::with_capacity(board.nodes.len());

    for (i, node) in board.nodes.iter().enumerate() {
        match node.parent_id {
            Some(parent) if index.contains_key(&parent) && !placed.contains(&parent) => {
                waiting.entry(parent).or_default().push(i);
            }
            _ => {
                let mut stack = vec![i];
                while let Some(at) = stack.pop() {
                    let id = board.nodes[at].id;
                    order.push(at);
                    placed.insert(id);
                    if let Some(children) = waiting.remove(&id) {
                        stack.extend(children.into_iter().rev());
                    }
                }
            }
        }
    }
    // Nodes still waiting sit on a parent cycle; keep them in stored order.
    let mut stranded: Vec<usize> = waiting.into_values().flatten().collect();
    stranded.sort_unstable();
    order.extend(stranded);

    let mut slots: Vec<Option<Node>> = std::mem::take(&mut board.nodes)
        .into_iter()
        .map(Some)
        .collect();
    board.nodes = order.into_iter().filter_map(|i| slots[i].take()).collect();
    true
}

/// Whether every node's parent appears before it in the collection.
pub fn is_paint_ordered(board: &Board) -> bool {
    let mut seen: HashSet<NodeId> = HashSet::new();
    for node in &board.nodes {
        if let Some(parent) = node.parent_id
            && board.contains_node(parent)
            && !seen.contains(&parent)
        {
            return false;
        }
        seen.insert(node.id);
    }
    true
}

// ─── Positions & sizes ───────────────────────────────────────────────────

/// Absolute board position of a node: its position plus every ancestor's.
pub fn absolute_position(board: &Board, id: NodeId) -> Option<Position> {
    let node = board.node(id)?;
    let offset = ancestors(board, id)
        .into_iter()
        .filter_map(|a| board.node(a))
        .fold(Position::ORIGIN, |acc, a| acc + a.position);
    Some(node.position + offset)
}

/// Intrinsic size of a node, ignoring children.
pub fn intrinsic_size(node: &Node, config: &BoardConfig) -> (f32, f32) {
    match &node.kind {
        NodeKind::TaskList { steps } => (
            node.width.unwrap_or(config.task_list_width),
            node.height.unwrap_or(
                config.task_list_base_height + config.step_height * steps.len() as f32,
            ),
        ),
        NodeKind::Group {} => (
            node.width.unwrap_or(config.group_width),
            node.height.unwrap_or(config.group_height),
        ),
    }
}

/// Absolute rectangle of one node.
pub fn node_bounds(board: &Board, id: NodeId, config: &BoardConfig) -> Option<Bounds> {
    let graph = containment(board);
    let mut resolved = HashMap::new();
    resolve_node(board, &graph, id, config, &mut resolved, &mut HashSet::new())
}

/// Absolute rectangles for every node on the board.
pub fn resolve_bounds(board: &Board, config: &BoardConfig) -> HashMap<NodeId, Bounds> {
    let graph = containment(board);
    let mut resolved = HashMap::with_capacity(board.nodes.len());
    for node in &board.nodes {
        resolve_node(board, &graph, node.id, config, &mut resolved, &mut HashSet::new());
    }
    resolved
}

/// Union of the rectangles of a group's direct children, without margin.
pub fn children_extent(board: &Board, group: NodeId, config: &BoardConfig) -> Option<Bounds> {
    let graph = containment(board);
    let mut resolved = HashMap::new();
    let mut visiting = HashSet::from([group]);
    union_of_children(board, &graph, group, config, &mut resolved, &mut visiting)
}

/// Smallest size a group may be resized to: its children plus the margin
/// on both sides. `None` for groups without children.
pub fn min_group_size(board: &Board, group: NodeId, config: &BoardConfig) -> Option<(f32, f32)> {
    children_extent(board, group, config).map(|b| {
        (
            b.width + config.group_margin * 2.0,
            b.height + config.group_margin * 2.0,
        )
    })
}

fn resolve_node(
    board: &Board,
    graph: &DiGraphMap<NodeId, ()>,
    id: NodeId,
    config: &BoardConfig,
    resolved: &mut HashMap<NodeId, Bounds>,
    visiting: &mut HashSet<NodeId>,
) -> Option<Bounds> {
    if let Some(b) = resolved.get(&id) {
        return Some(*b);
    }
    let node = board.node(id)?;
    if !visiting.insert(id) {
        return None;
    }

    let origin = absolute_position(board, id)?;
    let own = Bounds::at(origin, intrinsic_size(node, config));
    let bounds = if node.is_group() {
        union_of_children(board, graph, id, config, resolved, visiting)
            .map(|children| children.expand(config.group_margin))
            .unwrap_or(own)
    } else {
        own
    };

    visiting.remove(&id);
    resolved.insert(id, bounds);
    Some(bounds)
}

fn union_of_children(
    board: &Board,
    graph: &DiGraphMap<NodeId, ()>,
    group: NodeId,
    config: &BoardConfig,
    resolved: &mut HashMap<NodeId, Bounds>,
    visiting: &mut HashSet<NodeId>,
) -> Option<Bounds> {
    if !graph.contains_node(group) {
        return None;
    }
    let children: Vec<NodeId> = graph
        .neighbors_directed(group, Direction::Outgoing)
        .collect();
    children
        .into_iter()
        .filter_map(|child| resolve_node(board, graph, child, config, resolved, visiting))
        .reduce(|acc, b| acc.union(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> BoardConfig {
        BoardConfig::default()
    }

    fn nested_board() -> Board {
        Board {
            nodes: vec![
                Node::group("outer", Position::new(100.0, 100.0)),
                Node::group("inner", Position::new(50.0, 50.0)).with_parent("outer"),
                Node::task_list("leaf", Position::new(10.0, 20.0))
                    .with_parent("inner")
                    .with_size(200.0, 60.0),
            ],
            edges: vec![],
        }
    }

    #[test]
    fn absolute_position_sums_ancestors() {
        let board = nested_board();
        let abs = absolute_position(&board, NodeId::intern("leaf")).unwrap();
        assert_eq!(abs, Position::new(160.0, 170.0));
    }

    #[test]
    fn group_bounds_wrap_children_with_margin() {
        let board = nested_board();
        let cfg = config();
        let inner = node_bounds(&board, NodeId::intern("inner"), &cfg).unwrap();
        let m = cfg.group_margin;
        assert_eq!(inner, Bounds::new(160.0 - m, 170.0 - m, 200.0 + 2.0 * m, 60.0 + 2.0 * m));

        let outer = node_bounds(&board, NodeId::intern("outer"), &cfg).unwrap();
        assert_eq!(outer, inner.expand(m));
    }

    #[test]
    fn empty_group_uses_explicit_size() {
        let board = Board {
            nodes: vec![Node::group("g", Position::new(5.0, 5.0)).with_size(300.0, 120.0)],
            edges: vec![],
        };
        let b = node_bounds(&board, NodeId::intern("g"), &config()).unwrap();
        assert_eq!(b, Bounds::new(5.0, 5.0, 300.0, 120.0));
    }

    #[test]
    fn task_list_height_grows_with_steps() {
        let cfg = config();
        let node = Node::task_list("t", Position::ORIGIN).with_steps([Step::new(0), Step::new(1)]);
        let (_, h) = intrinsic_size(&node, &cfg);
        assert_eq!(h, cfg.task_list_base_height + 2.0 * cfg.step_height);
    }

    #[test]
    fn sort_puts_parents_first() {
        let mut board = nested_board();
        board.nodes.reverse();
        assert!(!is_paint_ordered(&board));
        assert!(sort_nodes(&mut board));
        assert!(is_paint_ordered(&board));
        let ids: Vec<&str> = board.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["outer", "inner", "leaf"]);
        assert!(!sort_nodes(&mut board));
    }

    #[test]
    fn sort_only_moves_children_behind_parents() {
        let mut board = Board {
            nodes: vec![
                Node::task_list("a", Position::ORIGIN),
                Node::task_list("kid", Position::ORIGIN).with_parent("g"),
                Node::task_list("b", Position::ORIGIN),
                Node::group("g", Position::ORIGIN),
                Node::task_list("c", Position::ORIGIN),
            ],
            edges: vec![],
        };
        assert!(sort_nodes(&mut board));
        let ids: Vec<&str> = board.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "g", "kid", "c"]);
    }

    #[test]
    fn sort_leaves_valid_order_alone() {
        let mut board = Board {
            nodes: vec![
                Node::group("g", Position::ORIGIN),
                Node::task_list("kid", Position::ORIGIN).with_parent("g"),
                Node::task_list("top", Position::ORIGIN),
            ],
            edges: vec![],
        };
        let before = board.clone();
        assert!(!sort_nodes(&mut board));
        assert_eq!(board, before);
    }

    #[test]
    fn descendants_and_ancestry() {
        let board = nested_board();
        let mut below = descendants(&board, NodeId::intern("outer"));
        below.sort_by_key(|id| id.as_str().to_string());
        assert_eq!(below, vec![NodeId::intern("inner"), NodeId::intern("leaf")]);
        assert!(is_ancestor_of(&board, NodeId::intern("outer"), NodeId::intern("leaf")));
        assert!(!is_ancestor_of(&board, NodeId::intern("leaf"), NodeId::intern("outer")));
        assert_eq!(depth(&board, NodeId::intern("leaf")), 2);
    }

    #[test]
    fn parent_cycle_does_not_hang() {
        let board = Board {
            nodes: vec![
                Node::group("a", Position::new(1.0, 1.0)).with_parent("b"),
                Node::group("b", Position::new(2.0, 2.0)).with_parent("a"),
            ],
            edges: vec![],
        };
        assert!(absolute_position(&board, NodeId::intern("a")).is_some());
        let all = resolve_bounds(&board, &config());
        assert!(all.len() <= 2);
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Bounds::new(9.0, 9.0, 5.0, 5.0)));
    }
}
