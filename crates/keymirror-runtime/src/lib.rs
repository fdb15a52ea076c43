#![forbid(unsafe_code)]

//! Runtime: reactive observables, store backends, and synchronized values.

pub mod hover;
pub mod reactive;
pub mod store;
pub mod sync;

pub use hover::ActiveTracker;
pub use reactive::{Derived, Observable, Subscription};
#[cfg(feature = "persist")]
pub use store::JsonFileBackend;
pub use store::{MemoryBackend, SharedStore, StoreBackend, StoreContext, StoreError};
pub use sync::SyncedValue;
