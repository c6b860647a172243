//! # Once-only, clearable lazy slot.
//!
//! [`LazySlot`] runs a supplied initializer at most once, on first access,
//! under mutual exclusion, then discards the initializer. An explicit
//! [`LazySlot::clear`] drops the built value (and the initializer, if it
//! never ran) so the slot holds no references afterwards.
//!
//! ## Rules
//! - **At most one build**: concurrent `force` calls race on the mutex; the
//!   first builds, the rest observe the cached value.
//! - **Initializer dropped after success**: a built slot keeps no reference
//!   to whatever the initializer captured.
//! - **Cleared is terminal**: after `clear`, `force` returns `None` forever.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum Slot<T> {
    /// Initializer parked until the first `force`.
    Pending(Box<dyn FnOnce() -> T + Send>),
    /// Built value; the initializer has been dropped.
    Ready(Arc<T>),
    /// Explicitly cleared, or the initializer panicked; terminal.
    Cleared,
}

/// Value container that builds its content at most once, on demand.
pub(crate) struct LazySlot<T> {
    inner: Mutex<Slot<T>>,
}

impl<T> LazySlot<T> {
    /// Creates a slot that will run `init` on first [`force`](Self::force).
    pub fn new(init: impl FnOnce() -> T + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Slot::Pending(Box::new(init))),
        }
    }

    /// Returns the built value, building it first if this is the first
    /// access. Returns `None` once the slot has been cleared.
    pub fn force(&self) -> Option<Arc<T>> {
        let mut slot = self.lock();
        match std::mem::replace(&mut *slot, Slot::Cleared) {
            Slot::Ready(value) => {
                *slot = Slot::Ready(Arc::clone(&value));
                Some(value)
            }
            Slot::Pending(init) => {
                // If `init` panics the slot stays `Cleared`.
                let value = Arc::new(init());
                *slot = Slot::Ready(Arc::clone(&value));
                Some(value)
            }
            Slot::Cleared => None,
        }
    }

    /// Drops the built value and the initializer. Terminal.
    pub fn clear(&self) {
        *self.lock() = Slot::Cleared;
    }

    /// Whether the value has been built and not yet cleared.
    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        matches!(&*self.lock(), Slot::Ready(_))
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_builds_once_and_caches() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let slot = LazySlot::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            42usize
        });

        let a = slot.force().unwrap();
        let b = slot.force().unwrap();
        assert_eq!(*a, 42);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_force_builds_exactly_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let slot = Arc::new(LazySlot::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "bundle"
        }));

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    slot.force().unwrap()
                })
            })
            .collect();

        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        for v in &values[1..] {
            assert!(Arc::ptr_eq(&values[0], v));
        }
    }

    #[test]
    fn test_clear_before_build_drops_initializer() {
        struct Probe(Arc<AtomicUsize>);
        impl Drop for Probe {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let probe = Probe(Arc::clone(&drops));
        let slot = LazySlot::new(move || {
            let _keep = &probe;
            1usize
        });

        assert_eq!(drops.load(Ordering::SeqCst), 0);
        slot.clear();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(slot.force().is_none());
    }

    #[test]
    fn test_clear_after_build_releases_value() {
        let slot = LazySlot::new(|| vec![1, 2, 3]);
        let held = slot.force().unwrap();
        assert!(slot.is_ready());

        slot.clear();
        assert!(!slot.is_ready());
        assert!(slot.force().is_none());
        // The caller's own handle stays valid; only the slot released its reference.
        assert_eq!(*held, vec![1, 2, 3]);
    }

    #[test]
    fn test_initializer_dropped_after_build() {
        struct Probe(Arc<AtomicUsize>);
        impl Drop for Probe {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let probe = Probe(Arc::clone(&drops));
        let slot = LazySlot::new(move || {
            let _keep = &probe;
            1usize
        });

        slot.force();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
