#![forbid(unsafe_code)]

//! The shared store realm and its connected contexts.
//!
//! [`SharedStore`] owns the backend plus a roster of connected
//! [`StoreContext`]s, each paired with an [`EventHub`]. A write through one
//! context commits to the backend and then emits a
//! [`Event::Storage`] notification on the hub of every *other* context —
//! never the writer's own hub, mirroring the platform convention that a
//! writer does not hear its own storage events. The writer's local state is
//! expected to be updated optimistically by whoever performed the write.
//!
//! Contexts are held weakly (through their hubs); dead ones are culled
//! lazily on the next notification.
//!
//! # Invariants
//!
//! 1. The backend commit completes before any notification is emitted.
//! 2. No borrow of the realm is held while listeners run, so handlers may
//!    freely read (or write) the store.
//! 3. A removal of a missing key emits nothing.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use keymirror_core::event::{Event, StorageNotification, StoreId, names};
use keymirror_core::hub::{EventHub, WeakHub};

use super::backend::{MemoryBackend, StoreBackend, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ContextId(u64);

struct RealmInner {
    backend: Box<dyn StoreBackend>,
    contexts: Vec<(ContextId, WeakHub)>,
    next_context: u64,
}

/// One logical shared persistent store.
///
/// Cloning yields another handle onto the **same** realm.
pub struct SharedStore {
    inner: Rc<RefCell<RealmInner>>,
    id: StoreId,
}

impl Clone for SharedStore {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            id: self.id,
        }
    }
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SharedStore")
            .field("id", &self.id)
            .field("keys", &inner.backend.len())
            .field("contexts", &inner.contexts.len())
            .finish()
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SharedStore {
    /// A realm over an unbounded in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    /// A realm over any backend.
    pub fn with_backend(backend: impl StoreBackend + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RealmInner {
                backend: Box::new(backend),
                contexts: Vec::new(),
                next_context: 1,
            })),
            id: StoreId::mint(),
        }
    }

    /// This store instance's identity, carried in every notification.
    #[must_use]
    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Connect a new context with its own fresh hub.
    #[must_use]
    pub fn connect(&self) -> StoreContext {
        self.connect_with(&EventHub::new())
    }

    /// Connect a new context listening on `hub` (e.g. [`EventHub::global`]).
    #[must_use]
    pub fn connect_with(&self, hub: &EventHub) -> StoreContext {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = ContextId(inner.next_context);
            inner.next_context += 1;
            inner.contexts.push((id, hub.downgrade()));
            id
        };
        StoreContext {
            inner: Rc::new(ContextInner {
                store: self.clone(),
                hub: hub.clone(),
                id,
            }),
        }
    }

    /// Number of connected contexts (dead ones may linger until the next
    /// notification culls them).
    #[must_use]
    pub fn context_count(&self) -> usize {
        self.inner.borrow().contexts.len()
    }

    fn detach(&self, id: ContextId) {
        self.inner
            .borrow_mut()
            .contexts
            .retain(|(context, _)| *context != id);
    }

    /// Emit `notification` on each distinct live hub except the writer's.
    fn notify_others(&self, writer: &EventHub, notification: StorageNotification) {
        let hubs: Vec<EventHub> = {
            let mut inner = self.inner.borrow_mut();
            inner
                .contexts
                .retain(|(_, weak)| weak.upgrade().is_some());

            let mut hubs: Vec<EventHub> = Vec::new();
            for (_, weak) in &inner.contexts {
                let Some(hub) = weak.upgrade() else { continue };
                if hub.same_hub(writer) || hubs.iter().any(|seen| seen.same_hub(&hub)) {
                    continue;
                }
                hubs.push(hub);
            }
            hubs
        };

        let event = Event::Storage(notification);
        for hub in hubs {
            hub.emit(names::STORAGE, &event);
        }
    }
}

struct ContextInner {
    store: SharedStore,
    hub: EventHub,
    id: ContextId,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.store.detach(self.id);
    }
}

/// One connected view of a [`SharedStore`], paired with an [`EventHub`].
///
/// Cloning shares the connection; the realm drops it when the last clone
/// goes away.
pub struct StoreContext {
    inner: Rc<ContextInner>,
}

impl Clone for StoreContext {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("store", &self.inner.store.id)
            .field("context", &self.inner.id.0)
            .finish()
    }
}

impl StoreContext {
    /// The hub this context receives notifications on.
    #[must_use]
    pub fn hub(&self) -> &EventHub {
        &self.inner.hub
    }

    /// Identity of the store this context is connected to.
    #[must_use]
    pub fn store_id(&self) -> StoreId {
        self.inner.store.id
    }

    /// The realm this context is connected to.
    #[must_use]
    pub fn realm(&self) -> &SharedStore {
        &self.inner.store
    }

    /// Read `key` from the backend.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.store.inner.borrow().backend.get(key)
    }

    /// Write `key = value` through to the backend, then notify every other
    /// context.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let old_value = self.inner.store.inner.borrow_mut().backend.set(key, value)?;
        debug!(store = ?self.inner.store.id, key, "write-through set");
        self.inner.store.notify_others(
            &self.inner.hub,
            StorageNotification {
                key: key.to_string(),
                old_value,
                new_value: Some(value.to_string()),
                store: self.inner.store.id,
            },
        );
        Ok(())
    }

    /// Remove `key` from the backend, then notify every other context if it
    /// existed.
    pub fn remove(&self, key: &str) -> Result<Option<String>, StoreError> {
        let removed = self.inner.store.inner.borrow_mut().backend.remove(key)?;
        let Some(old_value) = removed else {
            return Ok(None);
        };
        debug!(store = ?self.inner.store.id, key, "write-through remove");
        self.inner.store.notify_others(
            &self.inner.hub,
            StorageNotification {
                key: key.to_string(),
                old_value: Some(old_value.clone()),
                new_value: None,
                store: self.inner.store.id,
            },
        );
        Ok(Some(old_value))
    }

    /// All keys currently in the backend.
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.inner.borrow().backend.keys()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────
