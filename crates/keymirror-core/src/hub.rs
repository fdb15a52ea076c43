#![forbid(unsafe_code)]

//! Named-event dispatch hub.
//!
//! [`EventHub`] is the event source listeners attach to. Listeners are
//! registered per event name and fired synchronously in registration order.
//! A hub handle is cheaply cloneable (`Rc` inside); identity is handle
//! identity, not value: two handles refer to the same hub iff
//! [`same_hub`](EventHub::same_hub) returns true, and it is identity that
//! drives re-registration decisions upstream.
//!
//! [`EventHub::global`] returns the process-wide default target, so "listen
//! on the ambient target" is an explicit, injectable parameter with a
//! well-known default rather than a hidden global.
//!
//! # Invariants
//!
//! 1. Listeners for a name fire in registration order.
//! 2. [`remove_listener`](EventHub::remove_listener) is idempotent; removing
//!    an unknown id is a no-op.
//! 3. Listeners added or removed while an emit is in flight take effect for
//!    the next emit, not the current one.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::trace;

use crate::event::Event;

type BoxedListener = Box<dyn FnMut(&Event)>;

/// Token returned by [`EventHub::add_listener`], usable for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Slot {
    id: ListenerId,
    listener: Rc<RefCell<BoxedListener>>,
}

struct HubInner {
    listeners: AHashMap<String, Vec<Slot>>,
    next_id: u64,
}

/// A single-threaded named-event emitter.
pub struct EventHub {
    inner: Rc<RefCell<HubInner>>,
}

impl Clone for EventHub {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventHub")
            .field("event_names", &inner.listeners.len())
            .finish()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static GLOBAL_HUB: EventHub = EventHub::new();
}

impl EventHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(HubInner {
                listeners: AHashMap::new(),
                next_id: 1,
            })),
        }
    }

    /// The process-wide default target (one per thread).
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_HUB.with(EventHub::clone)
    }

    /// Whether `self` and `other` are handles onto the same hub.
    #[must_use]
    pub fn same_hub(&self, other: &EventHub) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Downgrade to a weak handle that does not keep the hub alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakHub {
        WeakHub {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Register `listener` for `event`. Returns a token for removal.
    pub fn add_listener(&self, event: &str, listener: impl FnMut(&Event) + 'static) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner
            .listeners
            .entry(event.to_string())
            .or_default()
            .push(Slot {
                id,
                listener: Rc::new(RefCell::new(Box::new(listener))),
            });
        trace!(event, id = id.0, "listener attached");
        id
    }

    /// Remove the listener registered under `id` for `event`.
    ///
    /// Idempotent: unknown ids and unknown event names are no-ops.
    pub fn remove_listener(&self, event: &str, id: ListenerId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(slots) = inner.listeners.get_mut(event) {
            let before = slots.len();
            slots.retain(|slot| slot.id != id);
            if slots.len() != before {
                trace!(event, id = id.0, "listener detached");
            }
            if slots.is_empty() {
                inner.listeners.remove(event);
            }
        }
    }

    /// Dispatch `payload` to every listener registered for `event`, in
    /// registration order.
    ///
    /// The listener list is snapshotted at entry, so mutations performed by
    /// listeners apply from the next emit.
    pub fn emit(&self, event: &str, payload: &Event) {
        let snapshot: Vec<Rc<RefCell<BoxedListener>>> = {
            let inner = self.inner.borrow();
            match inner.listeners.get(event) {
                Some(slots) => slots.iter().map(|s| Rc::clone(&s.listener)).collect(),
                None => return,
            }
        };
        for listener in snapshot {
            (listener.borrow_mut())(payload);
        }
    }

    /// Number of listeners currently registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(event)
            .map_or(0, Vec::len)
    }
}

/// Weak handle onto an [`EventHub`].
///
/// Lets a subscription refer to its hub without keeping it alive, so
/// cancellation stays safe after the hub was torn down externally.
#[derive(Clone)]
pub struct WeakHub {
    inner: Weak<RefCell<HubInner>>,
}

impl WeakHub {
    /// Upgrade back to a strong handle, if the hub is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<EventHub> {
        self.inner.upgrade().map(|inner| EventHub { inner })
    }
}

impl std::fmt::Debug for WeakHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakHub")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────
