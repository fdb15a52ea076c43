#![forbid(unsafe_code)]

//! Boolean activity tracking from a pair of crossing events.
//!
//! [`ActiveTracker`] is the minimal consumer of the binding machinery: two
//! independent bindings on the same hub, one flipping the flag on
//! [`names::POINTER_ENTER`], one clearing it on [`names::POINTER_LEAVE`].
//! Inactive initially; no terminal state; both bindings detach on drop.

use keymirror_core::EventBinding;
use keymirror_core::event::names;
use keymirror_core::hub::EventHub;

use crate::reactive::{Observable, Subscription};

/// Tracks whether a pointer is currently inside a target.
pub struct ActiveTracker {
    active: Observable<bool>,
    _enter: EventBinding,
    _leave: EventBinding,
}

impl std::fmt::Debug for ActiveTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveTracker")
            .field("active", &self.active.get())
            .finish()
    }
}

impl ActiveTracker {
    /// Track crossing events on `target`.
    ///
    /// A `None` target (not yet available) yields a tracker that stays
    /// inactive; build a new one once the target exists.
    #[must_use]
    pub fn track(target: Option<&EventHub>) -> Self {
        let active = Observable::new(false);

        let flag = active.clone();
        let enter = EventBinding::attached(names::POINTER_ENTER, target, move |_| {
            flag.set(true);
        });

        let flag = active.clone();
        let leave = EventBinding::attached(names::POINTER_LEAVE, target, move |_| {
            flag.set(false);
        });

        Self {
            active,
            _enter: enter,
            _leave: leave,
        }
    }

    /// Whether the pointer is currently inside the target.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// The flag as an observable, for dependents.
    #[must_use]
    pub fn observable(&self) -> &Observable<bool> {
        &self.active
    }

    /// Subscribe to flag changes.
    #[must_use]
    pub fn subscribe(&self, callback: impl FnMut(&bool) + 'static) -> Subscription {
        self.active.subscribe(callback)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────
