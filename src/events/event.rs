//! # Lifecycle events emitted by the hub.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Configuration events**: registrations and the freeze transition
//! - **Delivery events**: lazy channel construction, per-pipeline drops
//! - **Terminal events**: pipeline completions, close, upstream failure,
//!   cancellation
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! pipeline index, and human-readable reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order across observers.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of hub lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Configuration events ===
    /// A pipeline builder was registered.
    ///
    /// Sets:
    /// - `pipeline`: index assigned to the registration
    PipelineRegistered,

    /// The scope froze; no further registrations are accepted.
    ScopeFrozen,

    // === Delivery events ===
    /// The delivery channels and output slots were built (first use).
    ///
    /// Emitted exactly once per hub instance, from whichever call forced
    /// the lazy bundle.
    ChannelsBuilt,

    /// A value could not be enqueued for one pipeline and was dropped.
    ///
    /// Sets:
    /// - `pipeline`: index of the affected pipeline
    /// - `reason`: `"full"` or `"closed"`
    SendDropped,

    // === Terminal events ===
    /// One pipeline's output finished (success, fault, or abandoned).
    ///
    /// Sets:
    /// - `pipeline`: index of the finished pipeline
    PipelineCompleted,

    /// Every registered pipeline finished, or the upstream ended; the hub
    /// released its channels and lazy slots.
    ScopeClosed,

    /// The upstream source failed; the fault is being fanned out.
    ///
    /// Sets:
    /// - `reason`: the source error message
    UpstreamFailed,

    /// The collection was cancelled; channels carry a cancellation fault.
    Cancelled,

    // === Observer events ===
    /// An observer dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: observer name and drop cause
    ObserverOverflow,

    /// An observer panicked while handling an event.
    ///
    /// Sets:
    /// - `reason`: observer name and panic info
    ObserverPanicked,
}

/// Hub lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Index of the pipeline concerned, if applicable.
    pub pipeline: Option<usize>,
    /// Human-readable reason (errors, drop causes, panic info).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            pipeline: None,
            reason: None,
        }
    }

    /// Attaches a pipeline index.
    #[inline]
    pub fn with_pipeline(mut self, index: usize) -> Self {
        self.pipeline = Some(index);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a per-pipeline drop event.
    #[inline]
    pub(crate) fn send_dropped(pipeline: usize, cause: &'static str) -> Self {
        Event::new(EventKind::SendDropped)
            .with_pipeline(pipeline)
            .with_reason(cause)
    }

    /// Creates an observer overflow event.
    #[inline]
    pub(crate) fn observer_overflow(observer: &'static str, cause: &'static str) -> Self {
        Event::new(EventKind::ObserverOverflow)
            .with_reason(format!("observer={observer} reason={cause}"))
    }

    /// Creates an observer panic event.
    #[inline]
    pub(crate) fn observer_panicked(observer: &'static str, info: String) -> Self {
        Event::new(EventKind::ObserverPanicked)
            .with_reason(format!("observer={observer} panic={info}"))
    }
}
