//! Platform-agnostic input events and listener registration.
//!
//! A host (window system, test harness) turns raw events into `InputEvent`s
//! and pushes them through an [`InputHub`]. Listeners are held by
//! [`Subscription`] guards: dropping the guard unregisters the listener.

use log::warn;
use nodall_core::model::Position;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    pub const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };

    pub fn with_shift(self) -> Self {
        Self {
            shift: true,
            ..self
        }
    }

    /// Ctrl on Windows/Linux, ⌘ on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A unified input event. Pointer coordinates are in screen space.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    PointerMove {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    PointerUp {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    /// Double click on the pane.
    DoubleClick { x: f32, y: f32 },
    /// `key` is a DOM-style key name (`"c"`, `"Delete"`, `"Enter"`).
    Key { key: String, modifiers: Modifiers },
}

impl InputEvent {
    pub fn key(key: &str, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers,
        }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    /// Screen position if this is a pointer event.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y } => Some(Position::new(*x, *y)),
            Self::Key { .. } => None,
        }
    }
}

// ─── Listener registry ───────────────────────────────────────────────────

type Listener = Rc<RefCell<dyn FnMut(&InputEvent)>>;
type Registry = Rc<RefCell<Vec<(u64, Listener)>>>;

/// Fan-out point for input events.
#[derive(Default)]
pub struct InputHub {
    listeners: Registry,
    next_id: Cell<u64>,
}

impl InputHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`. It stays registered until the returned guard is
    /// dropped.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe(&self, listener: impl FnMut(&InputEvent) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let listener: Listener = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().push((id, listener));
        Subscription {
            id,
            registry: Rc::downgrade(&self.listeners),
        }
    }

    /// Deliver `event` to every listener registered when dispatch starts.
    /// Listeners may subscribe or unsubscribe while being called.
    pub fn dispatch(&self, event: &InputEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in snapshot {
            match listener.try_borrow_mut() {
                Ok(mut call) => call(event),
                Err(_) => warn!("input listener re-entered during dispatch, skipped"),
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// Registration guard returned by [`InputHub::subscribe`].
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Vec<(u64, Listener)>>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_subscription_unregisters() {
        let hub = InputHub::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let sub = hub.subscribe(move |_| counter.set(counter.get() + 1));

        hub.dispatch(&InputEvent::pointer_move(1.0, 2.0));
        assert_eq!(hub.listener_count(), 1);
        drop(sub);
        hub.dispatch(&InputEvent::pointer_move(1.0, 2.0));

        assert_eq!(hits.get(), 1);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_hub_is_harmless() {
        let sub = {
            let hub = InputHub::new();
            hub.subscribe(|_| {})
        };
        drop(sub);
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let hub = InputHub::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let inner = Rc::clone(&slot);
        let sub = hub.subscribe(move |_| {
            inner.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(sub);

        hub.dispatch(&InputEvent::key("a", Modifiers::NONE));
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn command_modifier() {
        assert!(Modifiers::CTRL.command());
        assert!(Modifiers::META.command());
        assert!(!Modifiers::NONE.with_shift().command());
        assert_eq!(
            InputEvent::key("x", Modifiers::CTRL).position(),
            None
        );
    }
}
