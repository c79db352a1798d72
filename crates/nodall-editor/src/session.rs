//! Board session: the command surface of the editor.
//!
//! Owns the store, the canvas, the clipboard and the gesture state, and
//! routes every user action (method call or [`InputEvent`]) to them. All
//! actions run to completion in the order they arrive.

use crate::canvas::{CanvasEngine, Viewport};
use crate::clipboard::ClipboardBuffer;
use crate::grouping;
use crate::input::{InputEvent, InputHub, Modifiers, Subscription};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::BoardStore;
use crate::tools::{ConnectTool, ResizeTool};
use log::{debug, info};
use nodall_core::model::*;
use nodall_core::{IdGenerator, NodeId};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// An in-progress node drag, tracked in board coordinates.
#[derive(Debug, Clone, Copy)]
struct Drag {
    node: NodeId,
    last: Position,
    /// Set once the pointer has actually moved the node. A press and
    /// release in place is a click and never reaches drag stop.
    moved: bool,
}

pub struct BoardSession<C: CanvasEngine = Viewport> {
    store: BoardStore,
    canvas: C,
    clipboard: ClipboardBuffer,
    ids: IdGenerator,
    /// Last pointer position in screen coordinates.
    pointer: Position,
    drag: Option<Drag>,
    connect: ConnectTool,
    resize: ResizeTool,
}

impl<C: CanvasEngine> BoardSession<C> {
    pub fn new(store: BoardStore, canvas: C) -> Self {
        Self {
            store,
            canvas,
            clipboard: ClipboardBuffer::new(),
            ids: IdGenerator::new(),
            pointer: Position::ORIGIN,
            drag: None,
            connect: ConnectTool::new(),
            resize: ResizeTool::new(),
        }
    }

    /// Replace the token source used for pasted and created ids.
    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn store(&self) -> &BoardStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BoardStore {
        &mut self.store
    }

    pub fn board(&self) -> &Board {
        self.store.board()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn clipboard(&self) -> &ClipboardBuffer {
        &self.clipboard
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    /// Track the pointer (screen coordinates).
    pub fn pointer_moved(&mut self, screen: Position) {
        self.pointer = screen;
    }

    /// The tracked pointer, projected onto the board.
    pub fn pointer_on_board(&self) -> Position {
        self.canvas.project(self.pointer)
    }

    // ─── Creation ────────────────────────────────────────────────────────

    fn next_node_id(&mut self) -> NodeId {
        let n = self.board().nodes.len() + 1;
        NodeId::intern(&format!("node-{n}-{}", self.ids.next_token()))
    }

    /// Create a task-list node with one empty step under the pointer.
    pub fn create_node(&mut self) -> Option<NodeId> {
        let at = self.pointer_on_board();
        self.create_node_at(at)
    }

    pub fn create_node_at(&mut self, position: Position) -> Option<NodeId> {
        let id = self.next_node_id();
        let node = Node::task_list(id, position).with_steps([Step::new(0)]);
        self.store.add_node(node).then_some(id)
    }

    /// Create an empty frame at the board origin.
    pub fn create_frame(&mut self) -> Option<NodeId> {
        let id = self.next_node_id();
        self.store
            .add_node(Node::group(id, Position::ORIGIN))
            .then_some(id)
    }

    // ─── Selection ───────────────────────────────────────────────────────

    fn set_selection(&mut self, selected: impl Fn(&Node) -> bool) -> bool {
        let changes = self
            .board()
            .nodes
            .iter()
            .map(|n| NodeChange::Select {
                id: n.id,
                selected: selected(n),
            })
            .collect();
        self.store.apply_node_changes(changes)
    }

    pub fn select_all(&mut self) -> bool {
        self.set_selection(|_| true)
    }

    pub fn deselect_all(&mut self) -> bool {
        self.set_selection(|_| false)
    }

    /// Select `id` alone, or toggle it when `extend` is set.
    pub fn select(&mut self, id: NodeId, extend: bool) -> bool {
        if extend {
            let Some(current) = self.board().node(id).map(|n| n.selected) else {
                return false;
            };
            return self.store.apply_node_changes(vec![NodeChange::Select {
                id,
                selected: !current,
            }]);
        }
        self.set_selection(|n| n.id == id)
    }

    /// Delete the selected nodes (with their contents) and selected edges.
    pub fn delete_selected(&mut self) -> bool {
        let nodes = self.canvas.selected_nodes(self.board());
        let edges = self
            .board()
            .edges
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.id)
            .collect::<Vec<_>>();
        if nodes.is_empty() && edges.is_empty() {
            return false;
        }
        self.store.delete_elements(nodes, edges)
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    pub fn copy(&mut self) -> usize {
        self.clipboard.copy(self.store.board(), &self.canvas)
    }

    pub fn cut(&mut self) -> usize {
        self.clipboard.cut(self.store.board(), &self.canvas)
    }

    /// Paste at the tracked pointer.
    pub fn paste(&mut self) -> Vec<NodeId> {
        let target = self.pointer_on_board();
        self.paste_at(target)
    }

    pub fn paste_at(&mut self, target: Position) -> Vec<NodeId> {
        let token = self.ids.next_token();
        self.clipboard.paste(&mut self.store, target, token)
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Not supported yet; the board is left unchanged.
    pub fn undo(&mut self) -> bool {
        info!("undo requested, no history is kept");
        false
    }

    /// Not supported yet; the board is left unchanged.
    pub fn redo(&mut self) -> bool {
        info!("redo requested, no history is kept");
        false
    }

    // ─── Grouping ────────────────────────────────────────────────────────

    /// Drag `node` to `position` (in its current frame).
    pub fn drag(&mut self, node: NodeId, position: Position) -> Option<NodeId> {
        grouping::on_drag(&mut self.store, &self.canvas, node, position)
    }

    /// Drop `node` at `position`. Returns the new parent, if it was attached.
    pub fn drag_stop(&mut self, node: NodeId, position: Position) -> Option<NodeId> {
        grouping::on_drag_stop(&mut self.store, &self.canvas, node, position)
    }

    pub fn detach(&mut self, ids: &[NodeId]) -> bool {
        grouping::detach(&mut self.store, ids, None)
    }

    pub fn ungroup(&mut self, frame: NodeId) -> bool {
        grouping::ungroup(&mut self.store, frame)
    }

    // ─── Gestures ────────────────────────────────────────────────────────

    pub fn begin_connect(&mut self, source: NodeId) {
        self.connect.begin(source);
    }

    /// Release a connect gesture at `screen`.
    pub fn end_connect(&mut self, screen: Position) -> bool {
        let release = self.canvas.project(screen);
        let token = self.ids.next_token();
        let mutations = self
            .connect
            .end(self.store.board(), &self.canvas, release, token);
        mutations
            .into_iter()
            .fold(false, |changed, m| self.store.apply(m) | changed)
    }

    pub fn begin_resize(&mut self, id: NodeId) {
        self.resize.begin(id);
    }

    pub fn resize_to(&mut self, width: f32, height: f32) -> bool {
        match self
            .resize
            .update(self.store.board(), self.store.config(), width, height)
        {
            Some(mutation) => self.store.apply(mutation),
            None => false,
        }
    }

    pub fn end_resize(&mut self) {
        self.resize.end();
    }

    // ─── Steps ───────────────────────────────────────────────────────────

    /// Enter pressed inside a step: append an empty step whose index is one
    /// past the current step count.
    pub fn step_enter(&mut self, node: NodeId) -> bool {
        let Some(count) = self.board().node(node).and_then(Node::steps).map(|s| s.len()) else {
            debug!("step_enter: {node} is not a task list");
            return false;
        };
        self.store.add_step(node, Step::new(count as i64 + 1))
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Handle one input event. Returns whether the board changed.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        let before = self.store.snapshot();
        if let Some(screen) = event.position() {
            self.pointer = screen;
        }
        match event {
            InputEvent::PointerDown { x, y, modifiers } => {
                self.pointer_down(Position::new(*x, *y), *modifiers)
            }
            InputEvent::PointerMove { .. } => {
                if let Some((node, position)) = self.next_drag_position() {
                    self.drag(node, position);
                }
            }
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(Position::new(*x, *y)),
            InputEvent::DoubleClick { .. } => {
                self.create_node();
            }
            InputEvent::Key { key, modifiers } => {
                if let Some(action) = ShortcutMap::resolve(key, *modifiers) {
                    self.run(action);
                }
            }
        }
        !Arc::ptr_eq(&before, &self.store.snapshot())
    }

    fn run(&mut self, action: ShortcutAction) {
        debug!("shortcut {action:?}");
        match action {
            ShortcutAction::Copy => {
                self.copy();
            }
            ShortcutAction::Cut => {
                self.cut();
            }
            ShortcutAction::Paste => {
                self.paste();
            }
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::SelectAll => {
                self.select_all();
            }
            ShortcutAction::Delete => {
                self.delete_selected();
            }
            ShortcutAction::Deselect => {
                self.deselect_all();
            }
        }
    }

    fn pointer_down(&mut self, screen: Position, modifiers: Modifiers) {
        let at = self.canvas.project(screen);
        match self.canvas.node_at(self.store.board(), at) {
            Some(id) => {
                let already = self.board().node(id).is_some_and(|n| n.selected);
                if modifiers.shift || !already {
                    self.select(id, modifiers.shift);
                }
                self.drag = Some(Drag {
                    node: id,
                    last: at,
                    moved: false,
                });
            }
            None => {
                self.drag = None;
                if !modifiers.shift {
                    self.deselect_all();
                }
            }
        }
    }

    /// Advance the active drag to the tracked pointer. Returns the dragged
    /// node and its new position in its own frame.
    fn next_drag_position(&mut self) -> Option<(NodeId, Position)> {
        let drag = self.drag.as_mut()?;
        let at = self.canvas.project(self.pointer);
        let delta = at - drag.last;
        drag.last = at;
        drag.moved |= delta != Position::ORIGIN;
        let node = self.store.board().node(drag.node)?;
        Some((node.id, node.position + delta))
    }

    fn pointer_up(&mut self, screen: Position) {
        if self.connect.source().is_some() {
            self.drag = None;
            self.end_connect(screen);
            return;
        }
        let next = self.next_drag_position();
        if let Some(Drag { moved: true, .. }) = self.drag.take()
            && let Some((node, position)) = next
        {
            self.drag_stop(node, position);
        }
    }
}

impl<C: CanvasEngine + 'static> BoardSession<C> {
    /// Feed every event from `hub` into `session` until the returned guard
    /// is dropped.
    pub fn attach(session: &Rc<RefCell<Self>>, hub: &InputHub) -> Subscription {
        let weak = Rc::downgrade(session);
        hub.subscribe(move |event| {
            if let Some(session) = weak.upgrade() {
                session.borrow_mut().handle(event);
            }
        })
    }
}
