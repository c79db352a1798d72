//! Core board data model.
//!
//! A board is a flat, ordered collection of nodes plus the edges connecting
//! them. Nesting is expressed through `parent_id`: a child's position lives
//! in its parent's local frame. The collection order doubles as paint order,
//! so parents must precede their children (see [`crate::layout::sort_nodes`]).
//!
//! Every mutation here is a pure in-place edit that reports whether anything
//! changed. Edits that name a missing node or edge are no-ops.

use crate::id::NodeId;
use crate::layout;
use log::debug;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::ops::{Add, Sub};

// ─── Geometry primitives ─────────────────────────────────────────────────

/// A point in logical board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Clamp both coordinates to be non-negative.
    pub fn clamp_non_negative(self) -> Self {
        Self {
            x: self.x.max(0.0),
            y: self.y.max(0.0),
        }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

// ─── Steps ───────────────────────────────────────────────────────────────

/// A single checklist item inside a task-list node.
///
/// `index` is an ordinal hint recorded at creation time. It is not kept in
/// sync with the step's position in the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub index: i64,
}

impl Step {
    /// An empty, unchecked step.
    pub fn new(index: i64) -> Self {
        Self {
            description: String::new(),
            completed: false,
            index,
        }
    }
}

/// Steps are usually a handful per node.
pub type Steps = SmallVec<[Step; 4]>;

// ─── Nodes ───────────────────────────────────────────────────────────────

/// Node payload, tagged by node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum NodeKind {
    /// Checklist node.
    TaskList {
        #[serde(default)]
        steps: Steps,
    },
    /// Frame that contains other nodes. Its size derives from its children.
    Group {},
}

/// A positioned node on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    #[serde(flatten)]
    pub kind: NodeKind,

    /// Parent-local when `parent_id` is set, board-global otherwise.
    pub position: Position,

    #[serde(
        rename = "parentNode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<NodeId>,

    /// Explicit width from a resize. `None` means the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,

    /// Explicit height from a resize. `None` means the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,

    #[serde(default)]
    pub selected: bool,

    /// Presentation flag: a dragged node would attach here on drop.
    #[serde(skip)]
    pub pending_attach: bool,
}

impl Node {
    fn new(id: NodeId, kind: NodeKind, position: Position) -> Self {
        Self {
            id,
            kind,
            position,
            parent_id: None,
            width: None,
            height: None,
            selected: false,
            pending_attach: false,
        }
    }

    /// A task-list node with no steps.
    pub fn task_list(id: impl Into<NodeId>, position: Position) -> Self {
        Self::new(
            id.into(),
            NodeKind::TaskList {
                steps: SmallVec::new(),
            },
            position,
        )
    }

    /// An empty group (frame) node.
    pub fn group(id: impl Into<NodeId>, position: Position) -> Self {
        Self::new(id.into(), NodeKind::Group {}, position)
    }

    pub fn with_steps(mut self, new_steps: impl IntoIterator<Item = Step>) -> Self {
        if let NodeKind::TaskList { steps } = &mut self.kind {
            steps.extend(new_steps);
        }
        self
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group {})
    }

    /// Steps of a task-list node; `None` for groups.
    pub fn steps(&self) -> Option<&Steps> {
        match &self.kind {
            NodeKind::TaskList { steps } => Some(steps),
            NodeKind::Group {} => None,
        }
    }

    fn steps_mut(&mut self) -> Option<&mut Steps> {
        match &mut self.kind {
            NodeKind::TaskList { steps } => Some(steps),
            NodeKind::Group {} => None,
        }
    }

    /// `(completed, total)` for task-list nodes.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.steps()
            .map(|steps| (steps.iter().filter(|s| s.completed).count(), steps.len()))
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: NodeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub selected: bool,
}

impl Edge {
    pub fn new(id: impl Into<NodeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            selected: false,
        }
    }
}

/// Source/target pair produced by a connect gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
}

// ─── Change sets ─────────────────────────────────────────────────────────

/// A single delta against the node collection.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Position { id: NodeId, position: Position },
    Dimensions { id: NodeId, width: f32, height: f32 },
    Select { id: NodeId, selected: bool },
    /// Removes the node, its descendants, and every edge touching them.
    Remove { id: NodeId },
    Add { node: Box<Node> },
}

/// A single delta against the edge collection.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    Select { id: NodeId, selected: bool },
    Remove { id: NodeId },
    Add { edge: Edge },
}

// ─── Board ───────────────────────────────────────────────────────────────

/// The full persisted board state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: NodeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Whether `id` names an existing group node.
    pub fn is_group(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(Node::is_group)
    }

    /// Direct children of `parent`, in collection order.
    pub fn children_of(&self, parent: NodeId) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(move |n| n.parent_id == Some(parent))
    }

    pub fn selected_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.selected)
    }

    // ─── Node collection ─────────────────────────────────────────────────

    /// Insert a node. Dropped when the id is taken or the parent is not an
    /// existing group.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.contains_node(node.id) {
            debug!("add_node: id {} already taken, insert dropped", node.id);
            return false;
        }
        if let Some(parent) = node.parent_id
            && !self.is_group(parent)
        {
            debug!("add_node: parent {parent} of {} is not a group", node.id);
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Apply a batch of node deltas. Unknown ids are skipped.
    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) -> bool {
        let mut changed = false;
        for change in changes {
            changed |= match change {
                NodeChange::Position { id, position } => match self.node_mut(*id) {
                    Some(node) if node.position != *position => {
                        node.position = *position;
                        true
                    }
                    _ => false,
                },
                NodeChange::Dimensions { id, width, height } => match self.node_mut(*id) {
                    Some(node) => {
                        let before = (node.width, node.height);
                        node.width = Some(*width);
                        node.height = Some(*height);
                        before != (node.width, node.height)
                    }
                    None => false,
                },
                NodeChange::Select { id, selected } => match self.node_mut(*id) {
                    Some(node) if node.selected != *selected => {
                        node.selected = *selected;
                        true
                    }
                    _ => false,
                },
                NodeChange::Remove { id } => self.remove_elements(&[*id], &[]),
                NodeChange::Add { node } => self.add_node((**node).clone()),
            };
        }
        changed
    }

    /// Replace the whole node collection.
    pub fn replace_nodes(&mut self, nodes: Vec<Node>) -> bool {
        if self.nodes == nodes {
            return false;
        }
        self.nodes = nodes;
        true
    }

    /// Set the selection flag on every node.
    pub fn select_all(&mut self, selected: bool) -> bool {
        let mut changed = false;
        for node in &mut self.nodes {
            changed |= node.selected != selected;
            node.selected = selected;
        }
        changed
    }

    // ─── Edge collection ─────────────────────────────────────────────────

    /// Append an edge. Dropped when the id is taken or an endpoint is missing.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.edge(edge.id).is_some() {
            debug!("add_edge: id {} already taken, insert dropped", edge.id);
            return false;
        }
        if !self.contains_node(edge.source) || !self.contains_node(edge.target) {
            debug!(
                "add_edge: {} -> {} names a missing node",
                edge.source, edge.target
            );
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Apply a batch of edge deltas. Unknown ids are skipped.
    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) -> bool {
        let mut changed = false;
        for change in changes {
            changed |= match change {
                EdgeChange::Select { id, selected } => {
                    match self.edges.iter_mut().find(|e| e.id == *id) {
                        Some(edge) if edge.selected != *selected => {
                            edge.selected = *selected;
                            true
                        }
                        _ => false,
                    }
                }
                EdgeChange::Remove { id } => self.remove_elements(&[], &[*id]),
                EdgeChange::Add { edge } => self.add_edge(edge.clone()),
            };
        }
        changed
    }

    /// Replace the whole edge collection.
    pub fn replace_edges(&mut self, edges: Vec<Edge>) -> bool {
        if self.edges == edges {
            return false;
        }
        self.edges = edges;
        true
    }

    // ─── Structural edits ────────────────────────────────────────────────

    /// Remove nodes (with their descendants) and edges. Edges touching any
    /// removed node go too, so no edge is left dangling.
    pub fn remove_elements(&mut self, node_ids: &[NodeId], edge_ids: &[NodeId]) -> bool {
        let mut doomed: HashSet<NodeId> = HashSet::new();
        for &id in node_ids {
            if self.contains_node(id) {
                doomed.insert(id);
                doomed.extend(layout::descendants(self, id));
            }
        }

        let nodes_before = self.nodes.len();
        let edges_before = self.edges.len();
        self.nodes.retain(|n| !doomed.contains(&n.id));
        self.edges.retain(|e| {
            !edge_ids.contains(&e.id) && !doomed.contains(&e.source) && !doomed.contains(&e.target)
        });
        nodes_before != self.nodes.len() || edges_before != self.edges.len()
    }

    /// Deselect every existing node, then append `nodes` as selected and
    /// `edges` after them. Colliding ids are dropped individually.
    pub fn insert_subgraph(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> bool {
        let mut changed = self.select_all(false);
        for mut node in nodes {
            node.selected = true;
            changed |= self.add_node(node);
        }
        for edge in edges {
            changed |= self.add_edge(edge);
        }
        changed
    }

    // ─── Steps ───────────────────────────────────────────────────────────

    fn edit_steps(&mut self, id: NodeId, edit: impl FnOnce(&mut Steps) -> bool) -> bool {
        match self.node_mut(id).and_then(Node::steps_mut) {
            Some(steps) => edit(steps),
            None => {
                debug!("step edit on {id}: no such task-list node");
                false
            }
        }
    }

    /// Append a step at the end of the node's list.
    pub fn add_step(&mut self, id: NodeId, step: Step) -> bool {
        self.edit_steps(id, |steps| {
            steps.push(step);
            true
        })
    }

    /// Remove the step at ordinal position `at`. Other steps keep their
    /// `index` fields untouched.
    pub fn delete_step(&mut self, id: NodeId, at: usize) -> bool {
        self.edit_steps(id, |steps| {
            if at < steps.len() {
                steps.remove(at);
                true
            } else {
                false
            }
        })
    }

    pub fn set_step_description(&mut self, id: NodeId, at: usize, description: &str) -> bool {
        self.edit_steps(id, |steps| match steps.get_mut(at) {
            Some(step) if step.description != description => {
                step.description = description.to_string();
                true
            }
            _ => false,
        })
    }

    pub fn set_step_completion(&mut self, id: NodeId, at: usize, completed: bool) -> bool {
        self.edit_steps(id, |steps| match steps.get_mut(at) {
            Some(step) if step.completed != completed => {
                step.completed = completed;
                true
            }
            _ => false,
        })
    }
}
