//! Interactive editing for Nodall boards: the graph store, drag-to-group,
//! clipboard, input routing, and the session that ties them together.

pub mod canvas;
pub mod clipboard;
pub mod grouping;
pub mod hit;
pub mod input;
pub mod session;
pub mod shortcuts;
pub mod store;
pub mod tools;

pub use canvas::{CanvasEngine, NodeFilter, Viewport};
pub use clipboard::ClipboardBuffer;
pub use input::{InputEvent, InputHub, Modifiers, Subscription};
pub use session::BoardSession;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use store::{BoardMutation, BoardStore, SubscriptionId};
