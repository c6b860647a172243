//! # Atomic lifecycle cell.
//!
//! [`StateCell`] holds one immutable state value behind an atomically
//! swappable pointer. Every mutation goes through [`StateCell::transition`]:
//! read the current snapshot, compute the next state, attempt a
//! compare-and-swap, and retry from the fresh snapshot on contention.
//!
//! ## Rules
//! - **No blocking locks**: writers never wait on each other; a loser simply
//!   recomputes against the new state.
//! - **No stale mutation**: a transition either installs a state computed
//!   from the snapshot it observed, or retries. Nothing derived from an
//!   outdated snapshot ever commits.
//! - **Linearized transitions**: exactly one swap wins at a time; callers
//!   can run winner-only side effects after `transition` returns.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// Outcome of a single transition attempt against a state snapshot.
pub(crate) enum Step<S, O> {
    /// Keep the current state untouched and return the outcome.
    Keep(O),
    /// Replace the current state with a new value and return the outcome.
    Replace(S, O),
}

/// Atomically swappable holder for an immutable state value.
pub(crate) struct StateCell<S> {
    inner: ArcSwap<S>,
}

impl<S> StateCell<S> {
    /// Creates a cell holding the given initial state.
    pub fn new(initial: S) -> Self {
        Self {
            inner: ArcSwap::from_pointee(initial),
        }
    }

    /// Returns the current state snapshot.
    pub fn load(&self) -> Arc<S> {
        self.inner.load_full()
    }

    /// Applies `step` to the current snapshot until a swap commits or the
    /// step decides to keep the state.
    ///
    /// `step` may run multiple times under contention and must therefore be
    /// side-effect free; perform winner-only effects on the returned outcome
    /// after this call.
    pub fn transition<O>(&self, mut step: impl FnMut(&S) -> Step<S, O>) -> O {
        let mut cur = self.inner.load_full();
        loop {
            match step(&cur) {
                Step::Keep(out) => return out,
                Step::Replace(next, out) => {
                    let prev = self.inner.compare_and_swap(&cur, Arc::new(next));
                    if Arc::ptr_eq(&*prev, &cur) {
                        return out;
                    }
                    // Lost the race: retry against the state that won.
                    cur = Arc::clone(&*prev);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_keep_leaves_state_untouched() {
        let cell = StateCell::new(7usize);
        let seen = cell.transition(|cur| Step::<usize, usize>::Keep(*cur));
        assert_eq!(seen, 7);
        assert_eq!(*cell.load(), 7);
    }

    #[test]
    fn test_replace_installs_new_state() {
        let cell = StateCell::new(0usize);
        cell.transition(|cur| Step::Replace(cur + 1, ()));
        assert_eq!(*cell.load(), 1);
    }

    #[test]
    fn test_concurrent_increments_all_commit() {
        let cell = Arc::new(StateCell::new(0usize));
        let threads = 8;
        let per_thread = 1_000;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        cell.transition(|cur| Step::Replace(cur + 1, ()));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*cell.load(), threads * per_thread);
    }

    #[test]
    fn test_loser_recomputes_from_fresh_state() {
        // A transition that caps the value: once the cap is reached, every
        // racer must observe the capped state and keep it.
        let cell = Arc::new(StateCell::new(0usize));
        let cap = 100;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        cell.transition(|cur| {
                            if *cur >= cap {
                                Step::Keep(())
                            } else {
                                Step::Replace(cur + 1, ())
                            }
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*cell.load(), cap);
    }
}
