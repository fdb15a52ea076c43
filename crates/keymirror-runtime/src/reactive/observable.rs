#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value in `Rc<RefCell<..>>` shared ownership.
//! Subscribers are held as `Weak` callbacks and pruned lazily while a
//! notification is being prepared; the [`Subscription`] guard owns the only
//! strong reference to its callback, so dropping the guard both removes the
//! entry and frees the closure.
//!
//! Notification happens after the interior borrow is released, against a
//! clone of the new value, so a subscriber may freely read the observable
//! it is subscribed to.
//!
//! # Failure Modes
//!
//! - **Subscriber panics**: the value and version are already committed;
//!   remaining subscribers in this cycle are skipped by unwinding.
//! - **Subscriber sets its own observable to a different value**: the
//!   recursive notification re-enters the running callback's borrow and
//!   panics. Setting an equal value is safe (equality no-op). Treated as a
//!   programming error, like any other re-entrant borrow.
//! - **Observable dropped before its subscriptions**: the guards' detach
//!   handles go dead and dropping them is a no-op.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type BoxedCallback<T> = Box<dyn FnMut(&T)>;

struct Slot<T> {
    id: u64,
    callback: Weak<RefCell<BoxedCallback<T>>>,
}

struct Inner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Slot<T>>,
    next_sub: u64,
}

/// A shared, version-tracked value wrapper with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value: initial,
                version: 0,
                subscribers: Vec::new(),
                next_sub: 1,
            })),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of mutations that changed the value so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Live subscriber count (dead guards may linger until the next
    /// notification prunes them).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Replace the value, notifying subscribers in registration order.
    ///
    /// Setting a value equal to the current one is a no-op: no version
    /// bump, no notification.
    pub fn set(&self, next: T) {
        let live = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == next {
                return;
            }
            inner.value = next.clone();
            inner.version += 1;

            // Prune dead subscribers and snapshot the rest, in order.
            let mut live = Vec::with_capacity(inner.subscribers.len());
            inner.subscribers.retain(|slot| match slot.callback.upgrade() {
                Some(callback) => {
                    live.push(callback);
                    true
                }
                None => false,
            });
            live
        };
        for callback in live {
            (callback.borrow_mut())(&next);
        }
    }

    /// Register `callback` to run on every value change.
    ///
    /// The returned [`Subscription`] keeps the callback alive; dropping it
    /// unsubscribes.
    #[must_use]
    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let callback: Rc<RefCell<BoxedCallback<T>>> = Rc::new(RefCell::new(Box::new(callback)));

        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_sub;
            inner.next_sub += 1;
            inner.subscribers.push(Slot {
                id,
                callback: Rc::downgrade(&callback),
            });
            id
        };

        let weak_inner = Rc::downgrade(&self.inner);
        let detach = move || {
            if let Some(inner) = weak_inner.upgrade() {
                inner.borrow_mut().subscribers.retain(|slot| slot.id != id);
            }
        };
        Subscription {
            _callback: callback,
            detach: Some(Box::new(detach)),
        }
    }
}

/// RAII guard for one subscriber registration.
///
/// Owns the callback; dropping the guard removes the registration before
/// the next notification cycle.
pub struct Subscription {
    _callback: Rc<dyn Any>,
    detach: Option<Box<dyn FnOnce()>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────
