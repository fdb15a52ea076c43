#![forbid(unsafe_code)]

//! Canonical event types.
//!
//! An [`EventHub`](crate::hub::EventHub) dispatches by event name (see
//! [`names`]); the payload is this closed [`Event`] enum. Keeping the
//! taxonomy closed means every listener can match exhaustively and ignore
//! payloads it was not written for.

use std::sync::atomic::{AtomicU64, Ordering};

/// Well-known event names.
pub mod names {
    /// A key changed in a shared store. Delivered to every connected
    /// context except the writer's own.
    pub const STORAGE: &str = "storage";
    /// A pointer moved onto a target.
    pub const POINTER_ENTER: &str = "pointerenter";
    /// A pointer left a target.
    pub const POINTER_LEAVE: &str = "pointerleave";
}

/// Canonical event payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key changed in a shared store.
    Storage(StorageNotification),
    /// A pointer crossed a target boundary.
    Pointer(PointerEvent),
}

// ─── Store identity ──────────────────────────────────────────────────────

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one logical store instance.
///
/// Notifications carry the id of the store they originated from, so that
/// listeners sharing a notification channel can drop changes meant for a
/// different store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    /// Mint a fresh id, unique within the process and never reused.
    #[must_use]
    pub fn mint() -> Self {
        StoreId(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Payload of a [`names::STORAGE`] event.
///
/// `new_value == None` means the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNotification {
    /// The key that changed.
    pub key: String,
    /// Value before the write, if the key existed.
    pub old_value: Option<String>,
    /// Value after the write; `None` on removal.
    pub new_value: Option<String>,
    /// The store the change happened in.
    pub store: StoreId,
}

/// Payload of the pointer crossing events, as a cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerEvent {
    /// Column of the crossing.
    pub column: u16,
    /// Row of the crossing.
    pub row: u16,
}

// ─── Tests ───────────────────────────────────────────────────────────────
