#![forbid(unsafe_code)]

//! Stable handler cell.
//!
//! [`HandlerCell`] separates the identity that controls listener attach and
//! detach (event name + hub) from the mutable payload (the handler). The
//! low-level hub listener holds one clone of the cell and calls
//! [`invoke`](HandlerCell::invoke); the owning binding holds another and
//! swaps handlers with [`update`](HandlerCell::update). The listener
//! therefore always runs the freshest handler without ever being
//! re-registered.
//!
//! # Invariants
//!
//! 1. `invoke` runs the handler most recently passed to `new` or `update`,
//!    even when invocation happens long after several updates.
//! 2. `update` never touches the hub: no attach, no detach.
//!
//! # Failure Modes
//!
//! Replacing the handler from inside its own invocation panics on the
//! interior borrow (re-entrant borrow). Emitting further events from inside
//! a handler is fine as long as they reach *other* cells.

use std::cell::RefCell;
use std::rc::Rc;

use crate::event::Event;

type BoxedHandler = Box<dyn FnMut(&Event)>;

/// Shared slot holding the latest event handler.
///
/// Cloning shares the slot: an update through one clone is seen by
/// invocations through any other.
pub struct HandlerCell {
    slot: Rc<RefCell<BoxedHandler>>,
}

impl Clone for HandlerCell {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl std::fmt::Debug for HandlerCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerCell")
            .field("handles", &Rc::strong_count(&self.slot))
            .finish()
    }
}

impl HandlerCell {
    /// Create a cell holding `handler`.
    pub fn new(handler: impl FnMut(&Event) + 'static) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Box::new(handler))),
        }
    }

    /// Replace the held handler in place.
    pub fn update(&self, handler: impl FnMut(&Event) + 'static) {
        *self.slot.borrow_mut() = Box::new(handler);
    }

    /// Run whichever handler is currently held.
    pub fn invoke(&self, event: &Event) {
        (self.slot.borrow_mut())(event);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PointerEvent;

    fn pointer() -> Event {
        Event::Pointer(PointerEvent::default())
    }

    #[test]
    fn invoke_runs_current_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&seen);
        let cell = HandlerCell::new(move |_| log.borrow_mut().push("first"));
        cell.invoke(&pointer());

        let log = Rc::clone(&seen);
        cell.update(move |_| log.borrow_mut().push("second"));
        cell.invoke(&pointer());

        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn invoke_sees_latest_of_many_updates() {
        let seen = Rc::new(RefCell::new(0u32));

        let cell = HandlerCell::new(|_| {});
        for i in 1..=10 {
            let log = Rc::clone(&seen);
            cell.update(move |_| *log.borrow_mut() = i);
        }

        // Only the last handler runs, no matter how many replacements
        // happened before the invocation.
        cell.invoke(&pointer());
        assert_eq!(*seen.borrow(), 10);
    }

    #[test]
    fn clones_share_the_slot() {
        let seen = Rc::new(RefCell::new(0u32));

        let cell = HandlerCell::new(|_| {});
        let listener_side = cell.clone();

        let log = Rc::clone(&seen);
        cell.update(move |_| *log.borrow_mut() += 1);

        listener_side.invoke(&pointer());
        listener_side.invoke(&pointer());
        assert_eq!(*seen.borrow(), 2);
    }

    #[test]
    fn handler_state_persists_across_invocations() {
        let count = Rc::new(RefCell::new(0u32));
        let log = Rc::clone(&count);
        let cell = HandlerCell::new(move |_| *log.borrow_mut() += 1);

        cell.invoke(&pointer());
        cell.invoke(&pointer());
        cell.invoke(&pointer());
        assert_eq!(*count.borrow(), 3);
    }
}
