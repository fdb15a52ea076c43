#![forbid(unsafe_code)]

//! A local reactive value mirrored against a shared store.
//!
//! [`SyncedValue`] seeds itself from the store once per key, writes every
//! local mutation through to the store, and applies qualifying external
//! change notifications to the local observable. One [`EventBinding`] on
//! the context's hub carries the whole lifetime: key changes and handler
//! refreshes go through the stable handler cell and never re-register the
//! listener.
//!
//! Notification filtering:
//!
//! 1. a notification from a different store instance is dropped;
//! 2. a notification for a different key is dropped;
//! 3. anything else replaces the local value unconditionally
//!    (last-notification-wins). The observable's equality no-op makes a
//!    redundant apply idempotent.
//!
//! The writer's own context is never notified by the realm, so a local
//! [`set`](SyncedValue::set) relies on its own optimistic update, not on an
//! echo.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use keymirror_core::EventBinding;
use keymirror_core::event::{Event, StoreId, names};

use crate::reactive::{Observable, Subscription};
use crate::store::{StoreContext, StoreError};

/// A reactive value kept coherent with one key of a shared store.
pub struct SyncedValue {
    key: Rc<RefCell<String>>,
    value: Observable<Option<String>>,
    ctx: StoreContext,
    binding: EventBinding,
}

impl std::fmt::Debug for SyncedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedValue")
            .field("key", &*self.key.borrow())
            .field("value", &self.value.get())
            .finish()
    }
}

impl SyncedValue {
    /// Bind `key` in `ctx`: seed the local value from the store and start
    /// listening for external changes.
    pub fn bind(ctx: &StoreContext, key: impl Into<String>) -> Result<Self, StoreError> {
        let key = key.into();
        let seeded = ctx.get(&key)?;
        let value = Observable::new(seeded);
        let key = Rc::new(RefCell::new(key));

        let binding = EventBinding::attached(
            names::STORAGE,
            Some(ctx.hub()),
            Self::storage_handler(Rc::clone(&key), value.clone(), ctx.store_id()),
        );

        Ok(Self {
            key,
            value,
            ctx: ctx.clone(),
            binding,
        })
    }

    /// The handler reads the key cell at invocation time, so it always
    /// filters against the current key, not the one captured at bind time.
    fn storage_handler(
        key: Rc<RefCell<String>>,
        value: Observable<Option<String>>,
        store: StoreId,
    ) -> impl FnMut(&Event) + 'static {
        move |event| {
            let Event::Storage(note) = event else { return };
            if note.store != store {
                trace!(key = %key.borrow(), "notification from another store dropped");
                return;
            }
            if note.key != *key.borrow() {
                return;
            }
            value.set(note.new_value.clone());
        }
    }

    /// The currently mirrored value (`None` while the key is unset).
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.value.get()
    }

    /// The key this value mirrors.
    #[must_use]
    pub fn key(&self) -> String {
        self.key.borrow().clone()
    }

    /// The observable behind this value, for dependents.
    #[must_use]
    pub fn observable(&self) -> &Observable<Option<String>> {
        &self.value
    }

    /// Subscribe to value changes.
    #[must_use]
    pub fn subscribe(&self, callback: impl FnMut(&Option<String>) + 'static) -> Subscription {
        self.value.subscribe(callback)
    }

    /// Write `value` through to the store, then update local state.
    ///
    /// A store failure propagates with local state untouched.
    pub fn set(&self, value: impl Into<String>) -> Result<(), StoreError> {
        let value = value.into();
        let key = self.key.borrow().clone();
        self.ctx.set(&key, &value)?;
        self.value.set(Some(value));
        Ok(())
    }

    /// Remove the key from the store, then clear local state.
    pub fn clear(&self) -> Result<(), StoreError> {
        let key = self.key.borrow().clone();
        self.ctx.remove(&key)?;
        self.value.set(None);
        Ok(())
    }

    /// Switch to mirroring `key`: reseed from the store and refresh the
    /// handler. Same event name, same hub — the listener must not churn.
    pub fn rebind(&mut self, key: impl Into<String>) -> Result<(), StoreError> {
        let key = key.into();
        let seeded = self.ctx.get(&key)?;
        *self.key.borrow_mut() = key;
        self.binding.bind(
            names::STORAGE,
            Some(self.ctx.hub()),
            Self::storage_handler(
                Rc::clone(&self.key),
                self.value.clone(),
                self.ctx.store_id(),
            ),
        );
        self.value.set(seeded);
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────
