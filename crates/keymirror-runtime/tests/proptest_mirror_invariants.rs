#![forbid(unsafe_code)]

//! Property-based invariant tests for the synchronized value.
//!
//! These tests verify invariants that must hold under **any** interleaving
//! of local mutations, remote writes, and key changes:
//!
//! 1. The local value always equals the backend value for the bound key.
//! 2. Exactly one storage listener exists per binding, however often the
//!    configuration changes.
//! 3. Traffic on unrelated keys never changes the value or its version.
//! 4. Redundant notification applies are idempotent.
//! 5. Handler reconfiguration never re-registers the listener.

use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

use keymirror_core::event::{Event, PointerEvent, StorageNotification, names};
use keymirror_core::{EventBinding, EventHub};
use keymirror_runtime::{SharedStore, SyncedValue};

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    LocalSet(String),
    LocalClear,
    RemoteSet { key: String, value: String },
    RemoteRemove { key: String },
    Rebind { key: String },
}

fn any_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("alpha".to_string()),
        Just("beta".to_string()),
        Just("gamma".to_string()),
    ]
}

fn any_value() -> impl Strategy<Value = String> {
    "[a-z0-9]{0,8}"
}

fn any_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any_value().prop_map(Op::LocalSet),
        Just(Op::LocalClear),
        (any_key(), any_value()).prop_map(|(key, value)| Op::RemoteSet { key, value }),
        any_key().prop_map(|key| Op::RemoteRemove { key }),
        any_key().prop_map(|key| Op::Rebind { key }),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1 + 2. Convergence and single-listener under arbitrary interleavings
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn local_state_and_backend_always_converge(
        ops in proptest::collection::vec(any_op(), 0..40)
    ) {
        let store = SharedStore::in_memory();
        let local = store.connect();
        let remote = store.connect();
        let mut bound = SyncedValue::bind(&local, "alpha").unwrap();

        for op in ops {
            match op {
                Op::LocalSet(value) => bound.set(value).unwrap(),
                Op::LocalClear => bound.clear().unwrap(),
                Op::RemoteSet { key, value } => remote.set(&key, &value).unwrap(),
                Op::RemoteRemove { key } => {
                    remote.remove(&key).unwrap();
                }
                Op::Rebind { key } => bound.rebind(key).unwrap(),
            }

            // After every single step the mirror is coherent.
            prop_assert_eq!(bound.get(), local.get(&bound.key()).unwrap());
            // And the listener never multiplied.
            prop_assert_eq!(local.hub().listener_count(names::STORAGE), 1);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Unrelated keys never move the value
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn foreign_keys_never_move_the_value(
        writes in proptest::collection::vec(
            (prop_oneof![Just("beta".to_string()), Just("gamma".to_string())], any_value()),
            1..30,
        )
    ) {
        let store = SharedStore::in_memory();
        let local = store.connect();
        let remote = store.connect();
        local.set("alpha", "pinned").unwrap();

        let bound = SyncedValue::bind(&local, "alpha").unwrap();
        let version = bound.observable().version();

        for (key, value) in writes {
            remote.set(&key, &value).unwrap();
        }

        prop_assert_eq!(bound.get(), Some("pinned".to_string()));
        prop_assert_eq!(bound.observable().version(), version);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Redundant notification applies are idempotent
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn redundant_applies_are_idempotent(value in any_value()) {
        let store = SharedStore::in_memory();
        let local = store.connect();
        let bound = SyncedValue::bind(&local, "alpha").unwrap();

        let note = Event::Storage(StorageNotification {
            key: "alpha".to_string(),
            old_value: None,
            new_value: Some(value.clone()),
            store: store.id(),
        });

        local.hub().emit(names::STORAGE, &note);
        let version = bound.observable().version();

        // Deliver the identical notification again.
        local.hub().emit(names::STORAGE, &note);

        prop_assert_eq!(bound.get(), Some(value));
        prop_assert_eq!(bound.observable().version(), version);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Handler reconfiguration never re-registers the listener
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn handler_churn_never_reattaches(generations in 1usize..60) {
        let hub = EventHub::new();
        let seen = Rc::new(RefCell::new(0usize));

        let mut binding = EventBinding::new();
        binding.bind("tick", Some(&hub), |_| {});
        let token = binding.token();
        prop_assert!(token.is_some());

        for generation in 0..generations {
            let sink = Rc::clone(&seen);
            binding.bind("tick", Some(&hub), move |_| {
                *sink.borrow_mut() = generation + 1;
            });
        }

        prop_assert_eq!(binding.token(), token);
        prop_assert_eq!(hub.listener_count("tick"), 1);

        // The freshest handler is the one that runs.
        hub.emit("tick", &Event::Pointer(PointerEvent::default()));
        prop_assert_eq!(*seen.borrow(), generations);
    }
}
