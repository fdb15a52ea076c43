#![forbid(unsafe_code)]

//! Store layer: backends, the shared realm, and connected contexts.
//!
//! A [`SharedStore`] is one logical persistent key-value resource backed by
//! a [`StoreBackend`]. Any number of [`StoreContext`]s connect to it; a
//! write through one context fans a [`names::STORAGE`] notification out to
//! the hub of every *other* connected context, never the writer's own.
//!
//! [`names::STORAGE`]: keymirror_core::event::names::STORAGE

pub mod backend;
#[cfg(feature = "persist")]
pub mod file;
pub mod realm;

pub use backend::{MemoryBackend, StoreBackend, StoreError};
#[cfg(feature = "persist")]
pub use file::JsonFileBackend;
pub use realm::{SharedStore, StoreContext};
