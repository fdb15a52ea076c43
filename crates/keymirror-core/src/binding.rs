#![forbid(unsafe_code)]

//! Event binding: attach/detach lifecycle for one logical subscription.
//!
//! [`EventBinding`] owns at most one live hub registration.
//! [`bind`](EventBinding::bind) may be called any number of times as the
//! caller's configuration changes; the low-level registration is torn down
//! and replaced only when the event name or the hub identity changes. When
//! only the handler changes, the stable [`HandlerCell`] is updated in place
//! and the hub is not touched.
//!
//! A missing target (`None`) degrades to a no-op registration that is still
//! cancellable; a later `bind` with a real hub attaches normally. This
//! models optional targets that may not exist yet.
//!
//! # Invariants
//!
//! 1. Exactly one low-level registration exists per live binding.
//! 2. Re-binding with the same (event name, hub identity) performs no
//!    attach and no detach, whatever the handler.
//! 3. [`cancel`](EventBinding::cancel) is idempotent and safe after the hub
//!    was dropped externally; `Drop` cancels, so teardown runs on every
//!    exit path from the owning scope.

use tracing::trace;

use crate::event::Event;
use crate::handler::HandlerCell;
use crate::hub::{EventHub, ListenerId, WeakHub};

struct Live {
    event: String,
    /// The hub registration, absent when bound without a target.
    registration: Option<(WeakHub, ListenerId)>,
    cell: HandlerCell,
}

/// A reconfigurable subscription to one named event on one hub.
#[derive(Default)]
pub struct EventBinding {
    live: Option<Live>,
}

impl std::fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBinding")
            .field("event", &self.live.as_ref().map(|l| l.event.as_str()))
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl EventBinding {
    /// An inert binding; nothing is registered until [`bind`](Self::bind).
    #[must_use]
    pub fn new() -> Self {
        Self { live: None }
    }

    /// Create and bind in one step.
    pub fn attached(
        event: &str,
        target: Option<&EventHub>,
        handler: impl FnMut(&Event) + 'static,
    ) -> Self {
        let mut binding = Self::new();
        binding.bind(event, target, handler);
        binding
    }

    /// (Re)configure against the process-wide default target.
    ///
    /// Shorthand for binding on [`EventHub::global`]; callers that have no
    /// specific target listen on the ambient one, they do not skip
    /// registration.
    pub fn bind_global(&mut self, event: &str, handler: impl FnMut(&Event) + 'static) {
        let hub = EventHub::global();
        self.bind(event, Some(&hub), handler);
    }

    /// (Re)configure the binding.
    ///
    /// If `event` and the identity of `target` match the live registration,
    /// only the handler cell is updated. Otherwise the old registration is
    /// cancelled and a new one installed. A `None` target installs nothing
    /// but keeps the binding in a cancellable, re-bindable state.
    pub fn bind(
        &mut self,
        event: &str,
        target: Option<&EventHub>,
        handler: impl FnMut(&Event) + 'static,
    ) {
        if let Some(live) = &self.live
            && live.event == event
            && same_target(live, target)
        {
            live.cell.update(handler);
            return;
        }

        self.cancel();

        let cell = HandlerCell::new(handler);
        let registration = target.map(|hub| {
            let listener_cell = cell.clone();
            let id = hub.add_listener(event, move |ev| listener_cell.invoke(ev));
            (hub.downgrade(), id)
        });
        if registration.is_none() {
            trace!(event, "bind without target; registration deferred");
        }
        self.live = Some(Live {
            event: event.to_string(),
            registration,
            cell,
        });
    }

    /// Tear down the registration, if any. Idempotent.
    ///
    /// After this returns, no further handler invocations occur through
    /// this binding. Safe to call when the hub has already been dropped.
    pub fn cancel(&mut self) {
        if let Some(live) = self.live.take()
            && let Some((weak, id)) = live.registration
            && let Some(hub) = weak.upgrade()
        {
            hub.remove_listener(&live.event, id);
        }
    }

    /// Whether a live hub registration exists.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.live
            .as_ref()
            .and_then(|l| l.registration.as_ref())
            .is_some_and(|(weak, _)| weak.upgrade().is_some())
    }

    /// The attachment token of the live registration, if any.
    #[must_use]
    pub fn token(&self) -> Option<ListenerId> {
        self.live
            .as_ref()
            .and_then(|l| l.registration.as_ref())
            .map(|(_, id)| *id)
    }
}

impl Drop for EventBinding {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn same_target(live: &Live, target: Option<&EventHub>) -> bool {
    match (&live.registration, target) {
        (None, None) => true,
        (Some((weak, _)), Some(hub)) => weak.upgrade().is_some_and(|live| live.same_hub(hub)),
        _ => false,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────
