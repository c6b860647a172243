//! # Non-blocking event fan-out to observers.
//!
//! Provides [`EventRelay`] — distributes lifecycle events to the hub's
//! observers concurrently without blocking the fan-out hot path.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► observer1.on_event()
//!     │    (bounded)         └──────► panic → ObserverPanicked
//!     ├──► [queue 2] ──► worker 2 ──► observer2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► observerN.on_event()
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Overflow**: event dropped for that observer only; an
//!   `ObserverOverflow` event is relayed to the others
//! - **Isolation**: a slow or panicking observer doesn't affect others
//! - **Per-observer FIFO**: each observer sees events in order
//! - **No re-report loops**: `ObserverOverflow` events that themselves
//!   overflow are not re-reported
//!
//! ## Lifetime
//! Worker tasks exit once the relay (and with it every queue sender) is
//! dropped and their queue drains. Workers hold only weak references to the
//! relay's channel list, so dropping the hub is enough to wind them down.
//!
//! ## Panic handling
//! Worker tasks use `catch_unwind` to isolate panics: the panic is caught
//! and relayed as an `ObserverPanicked` event, the worker continues with
//! the next event, and other observers are unaffected.

use std::sync::{Arc, Weak};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::events::{Event, EventKind, Observe};

/// Per-observer channel metadata.
struct ObserverChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for lifecycle-event observers.
pub(crate) struct EventRelay {
    channels: Arc<Vec<ObserverChannel>>,
}

impl EventRelay {
    /// Creates a relay and spawns one worker task per observer.
    ///
    /// Observers that do not declare a queue capacity get `fallback_capacity`
    /// (minimum 1). Must be called inside a tokio runtime.
    pub fn new(observers: Vec<Arc<dyn Observe>>, fallback_capacity: usize) -> Self {
        let mut channels = Vec::with_capacity(observers.len());
        let mut pending = Vec::with_capacity(observers.len());

        for obs in observers {
            let cap = match obs.queue_capacity() {
                0 => fallback_capacity,
                n => n,
            }
            .max(1);
            let (tx, rx) = mpsc::channel::<Arc<Event>>(cap);
            channels.push(ObserverChannel {
                name: obs.name(),
                sender: tx,
            });
            pending.push((obs, rx));
        }

        let channels = Arc::new(channels);
        for (obs, mut rx) in pending {
            let peers = Arc::downgrade(&channels);
            tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = obs.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        let info = {
                            let any = &*panic_err;
                            if let Some(msg) = any.downcast_ref::<&'static str>() {
                                (*msg).to_string()
                            } else if let Some(msg) = any.downcast_ref::<String>() {
                                msg.clone()
                            } else {
                                "unknown panic".to_string()
                            }
                        };
                        relay_to_peers(&peers, Event::observer_panicked(obs.name(), info));
                    }
                }
            });
        }
        Self { channels }
    }

    /// Emits an event to all observers. Returns immediately.
    pub fn emit(&self, event: Event) {
        fan_out(&self.channels, Arc::new(event));
    }
}

/// Relays an event produced inside a worker, if the relay is still alive.
fn relay_to_peers(peers: &Weak<Vec<ObserverChannel>>, event: Event) {
    if let Some(channels) = peers.upgrade() {
        fan_out(&channels, Arc::new(event));
    }
}

/// Delivers one event to every observer queue, reporting per-observer drops.
///
/// `ObserverOverflow` events are not re-reported when they themselves fail
/// to enqueue.
fn fan_out(channels: &[ObserverChannel], event: Arc<Event>) {
    let is_overflow_evt = matches!(event.kind, EventKind::ObserverOverflow);

    for channel in channels {
        match channel.sender.try_send(Arc::clone(&event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                if !is_overflow_evt {
                    fan_out(channels, Arc::new(Event::observer_overflow(channel.name, "full")));
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                if !is_overflow_evt {
                    fan_out(
                        channels,
                        Arc::new(Event::observer_overflow(channel.name, "closed")),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Forwards every received event into an unbounded test channel.
    struct Forwarder {
        tx: mpsc::UnboundedSender<Event>,
    }

    #[async_trait]
    impl Observe for Forwarder {
        async fn on_event(&self, event: &Event) {
            let _ = self.tx.send(event.clone());
        }
        fn name(&self) -> &'static str {
            "forwarder"
        }
    }

    /// Panics on the first event, forwards the rest.
    struct Grumpy {
        tx: mpsc::UnboundedSender<Event>,
    }

    #[async_trait]
    impl Observe for Grumpy {
        async fn on_event(&self, event: &Event) {
            if event.kind == EventKind::ScopeFrozen {
                panic!("grumpy observer");
            }
            let _ = self.tx.send(event.clone());
        }
        fn name(&self) -> &'static str {
            "grumpy"
        }
    }

    #[tokio::test]
    async fn test_events_reach_every_observer_in_order() {
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let observers: Vec<Arc<dyn Observe>> = vec![
            Arc::new(Forwarder { tx: tx_a }),
            Arc::new(Forwarder { tx: tx_b }),
        ];
        let relay = EventRelay::new(observers, 16);

        relay.emit(Event::new(EventKind::ScopeFrozen));
        relay.emit(Event::new(EventKind::ChannelsBuilt));

        for rx in [&mut rx_a, &mut rx_b] {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            assert_eq!(first.kind, EventKind::ScopeFrozen);
            assert_eq!(second.kind, EventKind::ChannelsBuilt);
            assert!(first.seq < second.seq);
        }
    }

    #[tokio::test]
    async fn test_panicking_observer_is_isolated_and_reported() {
        let (tx_ok, mut rx_ok) = mpsc::unbounded_channel();
        let (tx_bad, mut rx_bad) = mpsc::unbounded_channel();
        let observers: Vec<Arc<dyn Observe>> = vec![
            Arc::new(Forwarder { tx: tx_ok }),
            Arc::new(Grumpy { tx: tx_bad }),
        ];
        let relay = EventRelay::new(observers, 16);

        relay.emit(Event::new(EventKind::ScopeFrozen));

        // The healthy observer sees the original event, then the panic report.
        let first = rx_ok.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::ScopeFrozen);
        let report = rx_ok.recv().await.unwrap();
        assert_eq!(report.kind, EventKind::ObserverPanicked);
        assert!(report.reason.as_deref().unwrap().contains("grumpy"));

        // The grumpy worker survived its own panic and keeps processing:
        // first its own panic report (fanned out to every observer), then
        // whatever comes next.
        relay.emit(Event::new(EventKind::ScopeClosed));
        assert_eq!(rx_bad.recv().await.unwrap().kind, EventKind::ObserverPanicked);
        assert_eq!(rx_bad.recv().await.unwrap().kind, EventKind::ScopeClosed);
    }

    #[tokio::test]
    async fn test_workers_exit_when_relay_drops() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let observers: Vec<Arc<dyn Observe>> = vec![Arc::new(Forwarder { tx })];
        let relay = EventRelay::new(observers, 16);

        relay.emit(Event::new(EventKind::ScopeClosed));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ScopeClosed);

        drop(relay);
        // The worker drops its forwarding sender on exit, closing the test channel.
        assert!(rx.recv().await.is_none());
    }
}
