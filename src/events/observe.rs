//! # Core observer trait
//!
//! `Observe` is the extension point for plugging lifecycle-event handlers
//! into a hub. Each observer is driven by a dedicated worker loop fed by a
//! bounded queue owned by the [`EventRelay`](crate::events::EventRelay).
//! Observability is off by default: a hub built without observers allocates
//! no relay and emits nothing.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching) — they do **not** block the
//!   fan-out hot path nor other observers.
//! - Each observer **declares** its preferred queue capacity via
//!   [`Observe::queue_capacity`]. If a queue overflows, events for that
//!   observer are **dropped** (reported as `ObserverOverflow`).

use async_trait::async_trait;

use crate::events::Event;

/// Contract for lifecycle-event observers.
///
/// Called from an observer-dedicated worker task. Implementations should
/// avoid blocking the async runtime (prefer async I/O and cooperative
/// waits).
///
/// # Example
/// ```no_run
/// use async_trait::async_trait;
/// use fanhub::{Event, EventKind, Observe};
///
/// struct Metrics;
///
/// #[async_trait]
/// impl Observe for Metrics {
///     async fn on_event(&self, event: &Event) {
///         if event.kind == EventKind::SendDropped {
///             // increment a drop counter...
///         }
///     }
///     fn name(&self) -> &'static str { "metrics" }
/// }
/// ```
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Handle a single event for this observer.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this observer's queue.
    ///
    /// `0` (the default) means "use the hub's configured fallback".
    fn queue_capacity(&self) -> usize {
        0
    }
}
