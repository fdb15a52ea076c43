#![forbid(unsafe_code)]

//! Lazily-evaluated values derived from [`Observable`] dependencies.
//!
//! # Design
//!
//! [`Derived<T>`] pairs a recompute closure with a cached result. Dependency
//! changes only mark the cache stale; recomputation is deferred until
//! [`get()`](Derived::get). The dependency subscriptions are owned by the
//! derived value itself, so its lifetime bounds theirs.
//!
//! # Invariants
//!
//! 1. `get()` never returns a value that predates a completed dependency
//!    mutation.
//! 2. The recompute closure runs at most once per dependency change cycle.
//! 3. The version increments by exactly one per recomputation.
//!
//! # Failure Modes
//!
//! - **Recompute closure panics**: the previous cached value survives and
//!   the cache stays stale, so the next `get()` retries.
//! - **Dependency dropped**: the stale-marking subscription goes inert; the
//!   cached value persists and never goes stale from that source again.
//!
//! A recompute closure must only *read* its dependencies. Writing to one
//! from inside the closure re-enters the interior borrow and panics.

use std::cell::RefCell;
use std::rc::Rc;

use super::observable::{Observable, Subscription};

struct DerivedInner<T> {
    recompute: Box<dyn Fn() -> T>,
    cached: Option<T>,
    stale: bool,
    version: u64,
    /// Dependency subscriptions; only their lifetime matters.
    _deps: Vec<Subscription>,
}

/// A lazily-evaluated, memoized value derived from observables.
///
/// Cloning a `Derived` creates a new handle to the **same** cache.
pub struct Derived<T> {
    inner: Rc<RefCell<DerivedInner<T>>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Derived")
            .field("cached", &inner.cached)
            .field("stale", &inner.stale)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + 'static> Derived<T> {
    /// Derive from a single observable.
    pub fn map<S>(source: &Observable<S>, f: impl Fn(&S) -> T + 'static) -> Self
    where
        S: Clone + PartialEq + 'static,
    {
        let src = source.clone();
        let derived = Self::fresh(Box::new(move || src.with(|v| f(v))));
        let sub = derived.mark_stale_on_change(source);
        derived.inner.borrow_mut()._deps.push(sub);
        derived
    }

    /// Derive from a pair of observables.
    pub fn zip<A, B>(
        left: &Observable<A>,
        right: &Observable<B>,
        f: impl Fn(&A, &B) -> T + 'static,
    ) -> Self
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
    {
        let l = left.clone();
        let r = right.clone();
        let derived = Self::fresh(Box::new(move || l.with(|a| r.with(|b| f(a, b)))));
        let subs = [
            derived.mark_stale_on_change(left),
            derived.mark_stale_on_change(right),
        ];
        derived.inner.borrow_mut()._deps.extend(subs);
        derived
    }

    fn fresh(recompute: Box<dyn Fn() -> T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DerivedInner {
                recompute,
                cached: None,
                stale: true,
                version: 0,
                _deps: Vec::new(),
            })),
        }
    }

    fn mark_stale_on_change<S>(&self, source: &Observable<S>) -> Subscription
    where
        S: Clone + PartialEq + 'static,
    {
        let weak = Rc::downgrade(&self.inner);
        source.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().stale = true;
            }
        })
    }

    /// Current value, recomputing first if any dependency changed.
    #[must_use]
    pub fn get(&self) -> T {
        let mut inner = self.inner.borrow_mut();
        if inner.stale || inner.cached.is_none() {
            let value = (inner.recompute)();
            inner.cached = Some(value);
            inner.stale = false;
            inner.version += 1;
        }
        inner
            .cached
            .as_ref()
            .expect("cached is always Some after refresh")
            .clone()
    }

    /// Whether the cache is stale.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.inner.borrow().stale
    }

    /// Force the next `get()` to recompute.
    pub fn invalidate(&self) {
        self.inner.borrow_mut().stale = true;
    }

    /// Recomputation count.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────
