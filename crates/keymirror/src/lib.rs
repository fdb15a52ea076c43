#![forbid(unsafe_code)]

//! keymirror public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use keymirror_core as core;
    pub use keymirror_runtime as runtime;

    pub use keymirror_core::event::{Event, PointerEvent, StorageNotification, StoreId, names};
    pub use keymirror_core::{EventBinding, EventHub, HandlerCell};
    #[cfg(feature = "persist")]
    pub use keymirror_runtime::JsonFileBackend;
    pub use keymirror_runtime::{
        ActiveTracker, Derived, MemoryBackend, Observable, SharedStore, StoreBackend,
        StoreContext, StoreError, Subscription, SyncedValue,
    };
}
