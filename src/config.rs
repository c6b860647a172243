//! # Hub configuration.
//!
//! Provides [`HubConfig`], centralized settings for a single hub instance.
//!
//! ## Sentinel values
//! - `channel_capacity = 0` → unbounded delivery channels (the default);
//!   a live pipeline never misses a value.
//! - `channel_capacity = n > 0` → bounded channels; a pipeline that lags more
//!   than `n` values behind the upstream has further values dropped for it
//!   (reported as `SendDropped` events), siblings unaffected.
//!
//! ## Notes
//! All fields are public for flexibility. Prefer the helper accessors to
//! avoid sprinkling sentinel checks (`0`) across the codebase.

/// Configuration for a fan-out hub instance.
///
/// Defines:
/// - **Delivery behavior**: per-pipeline channel capacity
/// - **Observability**: fallback queue capacity for event observers
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Capacity of each per-pipeline delivery channel.
    ///
    /// - `0` = unbounded (default)
    /// - `n > 0` = at most `n` values buffered per pipeline; overflow is
    ///   dropped for that pipeline only
    pub channel_capacity: usize,

    /// Fallback queue capacity for observers that do not declare their own
    /// via `Observe::queue_capacity`. Minimum value is 1 (clamped).
    pub observer_queue_capacity: usize,
}

impl HubConfig {
    /// Returns the per-pipeline channel bound as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → bounded to `n` values
    #[inline]
    pub fn channel_bound(&self) -> Option<usize> {
        if self.channel_capacity == 0 {
            None
        } else {
            Some(self.channel_capacity)
        }
    }

    /// Returns an observer queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn observer_queue_clamped(&self) -> usize {
        self.observer_queue_capacity.max(1)
    }
}

impl Default for HubConfig {
    /// Default configuration:
    ///
    /// - `channel_capacity = 0` (unbounded delivery)
    /// - `observer_queue_capacity = 256`
    fn default() -> Self {
        Self {
            channel_capacity: 0,
            observer_queue_capacity: 256,
        }
    }
}
