//! Graph store: the single source of truth for the board.
//!
//! - Every edit is a `BoardMutation`. It is applied to a private copy of the
//!   current snapshot, so a mutation is either fully visible or not at all.
//! - A mutation that changes the board swaps in the new `Arc<Board>`,
//!   persists the whole document, and notifies subscribers, in that order.
//! - Edits against missing ids are no-ops: the snapshot stays the same
//!   `Arc`, nothing is written, nobody is notified.

use log::{debug, error};
use nodall_core::model::*;
use nodall_core::persist::{self, KeyValueStore, StorageError};
use nodall_core::{BoardConfig, IdGenerator, NodeId, layout};
use std::sync::Arc;

/// A structural edit to the board.
#[derive(Debug, Clone)]
pub enum BoardMutation {
    NodeChanges(Vec<NodeChange>),
    EdgeChanges(Vec<EdgeChange>),
    /// Append an edge between two existing nodes. Parallel edges are allowed.
    Connect {
        id: NodeId,
        connection: Connection,
    },
    AddNode(Box<Node>),
    AddStep {
        node: NodeId,
        step: Step,
    },
    DeleteStep {
        node: NodeId,
        at: usize,
    },
    SetStepDescription {
        node: NodeId,
        at: usize,
        description: String,
    },
    SetStepCompletion {
        node: NodeId,
        at: usize,
        completed: bool,
    },
    /// Replace the whole node collection.
    ReplaceNodes(Vec<Node>),
    /// Replace the whole edge collection.
    ReplaceEdges(Vec<Edge>),
    /// Remove nodes (with descendants), touching edges, and listed edges.
    DeleteElements {
        nodes: Vec<NodeId>,
        edges: Vec<NodeId>,
    },
    /// Deselect all nodes, then append nodes (selected) and edges.
    InsertSubgraph {
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    },
    /// Move a node into `parent` (or to the top level) at `position`, given
    /// in the new parent's frame. Ignored when `parent` is not a group or
    /// would create a cycle.
    Reparent {
        id: NodeId,
        parent: Option<NodeId>,
        position: Position,
    },
    /// Flag exactly `target` as pending-attach, clearing every other flag.
    SetPendingAttach { target: Option<NodeId> },
    /// Several mutations applied as one: one snapshot, one write, one
    /// notification.
    Batch(Vec<BoardMutation>),
}

/// Id for an edge created by connecting `source` to `target`.
pub fn edge_id(connection: &Connection, token: u64) -> NodeId {
    NodeId::intern(&format!(
        "edge-{}-{}-{token}",
        connection.source, connection.target
    ))
}

fn apply_to(board: &mut Board, mutation: BoardMutation) -> bool {
    match mutation {
        BoardMutation::NodeChanges(changes) => board.apply_node_changes(&changes),
        BoardMutation::EdgeChanges(changes) => board.apply_edge_changes(&changes),
        BoardMutation::Connect { id, connection } => {
            board.add_edge(Edge::new(id, connection.source, connection.target))
        }
        BoardMutation::AddNode(node) => board.add_node(*node),
        BoardMutation::AddStep { node, step } => board.add_step(node, step),
        BoardMutation::DeleteStep { node, at } => board.delete_step(node, at),
        BoardMutation::SetStepDescription {
            node,
            at,
            description,
        } => board.set_step_description(node, at, &description),
        BoardMutation::SetStepCompletion {
            node,
            at,
            completed,
        } => board.set_step_completion(node, at, completed),
        BoardMutation::ReplaceNodes(nodes) => board.replace_nodes(nodes),
        BoardMutation::ReplaceEdges(edges) => board.replace_edges(edges),
        BoardMutation::DeleteElements { nodes, edges } => board.remove_elements(&nodes, &edges),
        BoardMutation::InsertSubgraph { nodes, edges } => {
            let changed = board.insert_subgraph(nodes, edges);
            layout::sort_nodes(board) || changed
        }
        BoardMutation::Reparent {
            id,
            parent,
            position,
        } => reparent(board, id, parent, position),
        BoardMutation::SetPendingAttach { target } => {
            let mut changed = false;
            for node in &mut board.nodes {
                let flag = Some(node.id) == target;
                changed |= node.pending_attach != flag;
                node.pending_attach = flag;
            }
            changed
        }
        BoardMutation::Batch(mutations) => mutations
            .into_iter()
            .fold(false, |changed, m| apply_to(board, m) | changed),
    }
}

fn reparent(board: &mut Board, id: NodeId, parent: Option<NodeId>, position: Position) -> bool {
    if let Some(p) = parent
        && (p == id || !board.is_group(p) || layout::is_ancestor_of(board, id, p))
    {
        debug!("reparent {id} under {p} rejected");
        return false;
    }
    let Some(node) = board.node_mut(id) else {
        debug!("reparent: no node {id}");
        return false;
    };
    if node.parent_id == parent && node.position == position {
        return false;
    }
    node.parent_id = parent;
    node.position = position;
    layout::sort_nodes(board);
    true
}

/// Handle returned by [`BoardStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Board)>;

/// Owns the current board snapshot and its storage.
pub struct BoardStore {
    board: Arc<Board>,
    storage: Box<dyn KeyValueStore>,
    config: BoardConfig,
    ids: IdGenerator,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    last_persist_error: Option<StorageError>,
}

impl BoardStore {
    /// Rehydrate from `storage` (empty board if nothing is stored).
    ///
    /// # Errors
    /// Only a failing storage read is an error; malformed documents reset
    /// to an empty board.
    pub fn open(storage: Box<dyn KeyValueStore>, config: BoardConfig) -> Result<Self, StorageError> {
        let board = persist::load_board(storage.as_ref(), &config.storage_key)?;
        debug!(
            "opened board {:?}: {} nodes, {} edges",
            config.storage_key,
            board.nodes.len(),
            board.edges.len()
        );
        Ok(Self::with_board(board, storage, config))
    }

    /// Start from a given board without reading storage.
    pub fn with_board(board: Board, storage: Box<dyn KeyValueStore>, config: BoardConfig) -> Self {
        Self {
            board: Arc::new(board),
            storage,
            config,
            ids: IdGenerator::new(),
            listeners: Vec::new(),
            next_subscription: 0,
            last_persist_error: None,
        }
    }

    /// Replace the id generator used for generated edge ids.
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    /// The current immutable snapshot.
    pub fn snapshot(&self) -> Arc<Board> {
        Arc::clone(&self.board)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }

    /// The most recent persistence failure, cleared by the next successful write.
    pub fn last_persist_error(&self) -> Option<&StorageError> {
        self.last_persist_error.as_ref()
    }

    // ─── Subscriptions ───────────────────────────────────────────────────

    /// Call `listener` with every new snapshot.
    pub fn subscribe(&mut self, listener: impl FnMut(&Board) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Stop notifying a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        before != self.listeners.len()
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply one mutation. Returns whether the board changed.
    pub fn apply(&mut self, mutation: BoardMutation) -> bool {
        let mut next = Board::clone(&self.board);
        if !apply_to(&mut next, mutation) {
            return false;
        }
        self.commit(next);
        true
    }

    fn commit(&mut self, next: Board) {
        self.board = Arc::new(next);
        match persist::save_board(self.storage.as_mut(), &self.config.storage_key, &self.board) {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                error!("failed to persist board: {e}");
                self.last_persist_error = Some(e);
            }
        }
        let board = Arc::clone(&self.board);
        for (_, listener) in &mut self.listeners {
            listener(&board);
        }
    }

    // ─── Named operations ────────────────────────────────────────────────

    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) -> bool {
        self.apply(BoardMutation::NodeChanges(changes))
    }

    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) -> bool {
        self.apply(BoardMutation::EdgeChanges(changes))
    }

    /// Connect two nodes with a freshly generated edge id. Returns the id
    /// when the edge was added.
    pub fn connect(&mut self, connection: Connection) -> Option<NodeId> {
        let id = edge_id(&connection, self.ids.next_token());
        self.apply(BoardMutation::Connect { id, connection })
            .then_some(id)
    }

    pub fn add_node(&mut self, node: Node) -> bool {
        self.apply(BoardMutation::AddNode(Box::new(node)))
    }

    pub fn add_step(&mut self, node: NodeId, step: Step) -> bool {
        self.apply(BoardMutation::AddStep { node, step })
    }

    pub fn delete_step(&mut self, node: NodeId, at: usize) -> bool {
        self.apply(BoardMutation::DeleteStep { node, at })
    }

    pub fn set_step_description(&mut self, node: NodeId, at: usize, description: &str) -> bool {
        self.apply(BoardMutation::SetStepDescription {
            node,
            at,
            description: description.to_string(),
        })
    }

    pub fn set_step_completion(&mut self, node: NodeId, at: usize, completed: bool) -> bool {
        self.apply(BoardMutation::SetStepCompletion {
            node,
            at,
            completed,
        })
    }

    pub fn replace_nodes(&mut self, nodes: Vec<Node>) -> bool {
        self.apply(BoardMutation::ReplaceNodes(nodes))
    }

    pub fn replace_edges(&mut self, edges: Vec<Edge>) -> bool {
        self.apply(BoardMutation::ReplaceEdges(edges))
    }

    pub fn delete_elements(&mut self, nodes: Vec<NodeId>, edges: Vec<NodeId>) -> bool {
        self.apply(BoardMutation::DeleteElements { nodes, edges })
    }

    pub fn insert_subgraph(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> bool {
        self.apply(BoardMutation::InsertSubgraph { nodes, edges })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodall_core::MemoryStorage;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn empty_store() -> BoardStore {
        BoardStore::with_board(Board::new(), Box::new(MemoryStorage::new()), BoardConfig::default())
    }

    fn stored(store: &BoardStore) -> Board {
        persist::load_board(store.storage(), "board").unwrap()
    }

    #[test]
    fn add_step_scenario() {
        let mut store = empty_store();
        let n1 = NodeId::intern("n1");
        assert!(store.add_node(Node::task_list(n1, Position::ORIGIN)));
        assert!(store.add_step(n1, Step::new(0)));

        let expected = Board {
            nodes: vec![Node::task_list("n1", Position::ORIGIN).with_steps([Step::new(0)])],
            edges: vec![],
        };
        assert_eq!(*store.board(), expected);
        assert_eq!(stored(&store), expected);
    }

    #[test]
    fn missing_ids_leave_snapshot_untouched() {
        let mut store = empty_store();
        store.add_node(Node::task_list("a", Position::ORIGIN).with_steps([Step::new(0)]));
        let before = store.snapshot();
        let ghost = NodeId::intern("ghost");

        assert!(!store.add_step(ghost, Step::new(1)));
        assert!(!store.delete_step(ghost, 0));
        assert!(!store.set_step_description(ghost, 0, "x"));
        assert!(!store.set_step_completion(ghost, 0, true));
        assert!(!store.apply_node_changes(vec![
            NodeChange::Position {
                id: ghost,
                position: Position::new(5.0, 5.0)
            },
            NodeChange::Remove { id: ghost },
        ]));
        assert!(!store.apply_edge_changes(vec![EdgeChange::Remove { id: ghost }]));
        assert!(!store.delete_elements(vec![ghost], vec![ghost]));
        assert!(store
            .connect(Connection {
                source: ghost,
                target: NodeId::intern("a"),
            })
            .is_none());

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn connect_allows_parallel_edges() {
        let mut store = empty_store();
        store.add_node(Node::task_list("a", Position::ORIGIN));
        store.add_node(Node::task_list("b", Position::new(300.0, 0.0)));
        let link = Connection {
            source: NodeId::intern("a"),
            target: NodeId::intern("b"),
        };
        let first = store.connect(link).unwrap();
        let second = store.connect(link).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.board().edges.len(), 2);
    }

    #[test]
    fn set_step_fields() {
        let mut store = empty_store();
        let n = NodeId::intern("steps");
        store.add_node(Node::task_list(n, Position::ORIGIN).with_steps([Step::new(0), Step::new(1)]));
        assert!(store.set_step_description(n, 1, "ship it"));
        assert!(store.set_step_completion(n, 1, true));
        assert!(!store.set_step_completion(n, 9, true));

        let steps = store.board().node(n).unwrap().steps().unwrap().clone();
        assert_eq!(steps[1].description, "ship it");
        assert!(steps[1].completed);
        assert!(!steps[0].completed);
    }

    #[test]
    fn subscribers_see_each_new_snapshot() {
        let mut store = empty_store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = store.subscribe(move |board| sink.borrow_mut().push(board.nodes.len()));

        store.add_node(Node::task_list("a", Position::ORIGIN));
        store.add_node(Node::task_list("a", Position::ORIGIN));
        store.add_node(Node::task_list("b", Position::ORIGIN));
        assert!(store.unsubscribe(sub));
        store.add_node(Node::task_list("c", Position::ORIGIN));

        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert!(!store.unsubscribe(sub));
    }

    #[test]
    fn reopen_rehydrates_from_storage() {
        let mut storage = MemoryStorage::new();
        let board = Board {
            nodes: vec![Node::group("g", Position::ORIGIN)],
            edges: vec![],
        };
        persist::save_board(&mut storage, "board", &board).unwrap();
        let store = BoardStore::open(Box::new(storage), BoardConfig::default()).unwrap();
        assert_eq!(*store.board(), board);
    }

    #[test]
    fn replace_collections() {
        let mut store = empty_store();
        let nodes = vec![
            Node::task_list("x", Position::ORIGIN),
            Node::task_list("y", Position::new(300.0, 0.0)),
        ];
        assert!(store.replace_nodes(nodes.clone()));
        assert!(!store.replace_nodes(nodes));
        assert!(store.replace_edges(vec![Edge::new("xy", "x", "y")]));
        assert_eq!(stored(&store).edges.len(), 1);
    }

    #[test]
    fn insert_subgraph_deselects_existing() {
        let mut store = empty_store();
        store.add_node(Node::task_list("old", Position::ORIGIN));
        store.apply_node_changes(vec![NodeChange::Select {
            id: NodeId::intern("old"),
            selected: true,
        }]);
        store.insert_subgraph(vec![Node::task_list("new", Position::ORIGIN)], vec![]);

        let selected: Vec<&str> = store.board().selected_nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(selected, vec!["new"]);
    }
}
