#![forbid(unsafe_code)]

//! Core: canonical event types, the event hub, and subscription machinery.

pub mod binding;
pub mod event;
pub mod handler;
pub mod hub;

pub use binding::EventBinding;
pub use event::{Event, PointerEvent, StorageNotification, StoreId, names};
pub use handler::HandlerCell;
pub use hub::{EventHub, ListenerId, WeakHub};
