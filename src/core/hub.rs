//! # Hub: lifecycle-staged fan-out core.
//!
//! The [`Hub`] owns the atomic state cell and implements registration,
//! freeze, per-value fan-out, completion bookkeeping, and teardown. One hub
//! instance serves exactly one upstream collection and is discarded
//! afterwards.
//!
//! ## High-level flow
//! ```text
//! Configuration:
//!   SelectorScope::register ──► Hub::register (CAS: enter/leave window)
//!                                   └─► pending: Vec<BuilderCell>
//!
//! Freeze:
//!   Hub::freeze ──► Frozen { LazySlot<Bundle>, completed: 0 }
//!                      (bundle unevaluated: channels not built yet)
//!
//! Run:
//!   driver ── send(v) ──► force bundle (first call builds channels)
//!                            ├──► channel 0 ──► pipeline 0 output
//!                            ├──► channel 1 ──► pipeline 1 output
//!                            └──► channel N ──► pipeline N output
//!   collector ── take_output(i) ──► builder_i(input_i)   (exactly once)
//!
//! Teardown:
//!   each output end ──► pipeline_completed(i) ──► completed == N
//!                                                    └─► Closed + release
//! ```
//!
//! ## Rules
//! - Every transition commits through the CAS cell; losers retry against
//!   the fresh state and never mutate a stale snapshot.
//! - A failed per-channel enqueue is swallowed and reported as a
//!   `SendDropped` event; siblings always get their delivery attempt.
//! - The `Closed` transition — whether driven by the last pipeline
//!   completion or by upstream termination — releases the lazy bundle
//!   exactly once, on the winning CAS only.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::channels::{channel, SendOutcome};
use crate::config::HubConfig;
use crate::core::state::{
    BoxedBuilder, BuilderCell, Bundle, FrozenShared, HubState, OutputCell, PendingOutput,
};
use crate::error::HubError;
use crate::events::{Event, EventKind, EventRelay, Observe};
use crate::pipelines::ResolveOutput;
use crate::sync::{LazySlot, StateCell, Step};

/// Fan-out selector hub for one upstream collection.
///
/// Create one per collection via [`Hub::new`] or [`Hub::builder`], hand a
/// [`SelectorScope`](crate::SelectorScope) over it to the configuration
/// code, [`freeze`](Hub::freeze) it, then pump values with
/// [`send`](Hub::send) — or use [`select`](crate::select), which wires all
/// of that in the right order.
pub struct Hub<T, R> {
    state: StateCell<HubState<T, R>>,
    config: HubConfig,
    relay: Option<Arc<EventRelay>>,
}

/// Builder for constructing a [`Hub`] with optional observers.
pub struct HubBuilder {
    config: HubConfig,
    observers: Vec<Arc<dyn Observe>>,
}

impl HubBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            observers: Vec::new(),
        }
    }

    /// Sets lifecycle-event observers.
    ///
    /// Observers receive hub events (registrations, freeze, drops, close)
    /// through dedicated workers with bounded queues. With no observers the
    /// hub allocates no relay and the hot path emits nothing.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Builds the hub. Must run inside a tokio runtime when observers are
    /// present (their workers are spawned here).
    pub fn build<T, R>(self) -> Arc<Hub<T, R>> {
        let relay = if self.observers.is_empty() {
            None
        } else {
            Some(Arc::new(EventRelay::new(
                self.observers,
                self.config.observer_queue_clamped(),
            )))
        };
        Arc::new(Hub {
            state: StateCell::new(HubState::Idle),
            config: self.config,
            relay,
        })
    }
}

impl<T, R> Hub<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Creates a hub with the given configuration and no observers.
    pub fn new(config: HubConfig) -> Arc<Self> {
        HubBuilder::new(config).build()
    }

    /// Returns a builder for a hub with observers.
    pub fn builder(config: HubConfig) -> HubBuilder {
        HubBuilder::new(config)
    }

    /// Registers a pipeline builder; returns the index that is the
    /// pipeline's permanent identity.
    ///
    /// Fails with a usage error if the scope is frozen or closed, or if
    /// another registration is still in flight (`NestedRegister`). The
    /// placeholder output stream for the index is built by the
    /// [`SelectorScope`](crate::SelectorScope).
    pub(crate) fn register(&self, builder: BoxedBuilder<T, R>) -> Result<usize, HubError> {
        let mut pending = self.begin_register()?;
        let index = pending.len();
        pending.push(BuilderCell::new(builder));
        self.finish_register(pending)?;

        self.emit(Event::new(EventKind::PipelineRegistered).with_pipeline(index));
        Ok(index)
    }

    /// Enters the registration window; returns a snapshot of the pending
    /// list to append to.
    fn begin_register(&self) -> Result<Vec<Arc<BuilderCell<T, R>>>, HubError> {
        self.state.transition(|cur| match cur {
            HubState::Idle => Step::Replace(
                HubState::Registering {
                    pending: Vec::new(),
                },
                Ok(Vec::new()),
            ),
            HubState::Accepting { pending } => Step::Replace(
                HubState::Registering {
                    pending: pending.clone(),
                },
                Ok(pending.clone()),
            ),
            HubState::Registering { .. } => Step::Keep(Err(HubError::NestedRegister)),
            HubState::Frozen { .. } => Step::Keep(Err(HubError::Frozen)),
            HubState::Closed => Step::Keep(Err(HubError::Closed)),
        })
    }

    /// Leaves the registration window, installing the appended list.
    ///
    /// Fails if the scope froze or closed while this registration was in
    /// flight — a caller race the lifecycle treats as a usage error.
    fn finish_register(&self, pending: Vec<Arc<BuilderCell<T, R>>>) -> Result<(), HubError> {
        self.state.transition(|cur| match cur {
            HubState::Registering { .. } => Step::Replace(
                HubState::Accepting {
                    pending: pending.clone(),
                },
                Ok(()),
            ),
            HubState::Frozen { .. } => Step::Keep(Err(HubError::Frozen)),
            HubState::Closed => Step::Keep(Err(HubError::Closed)),
            HubState::Idle | HubState::Accepting { .. } => {
                debug_assert!(false, "registration window vanished mid-call");
                Step::Keep(Err(HubError::Closed))
            }
        })
    }

    /// Seals the configuration. Idempotent; freezing an empty scope is a
    /// usage error.
    pub fn freeze(&self) -> Result<(), HubError> {
        let config = self.config.clone();
        let relay = self.relay.clone();

        // `Some(Ok)` = froze now, `Some(Err)` = usage error, `None` = no-op.
        let outcome = self.state.transition(|cur| match cur {
            HubState::Idle => Step::Keep(Some(Err(HubError::NoPipelines))),
            HubState::Registering { pending } | HubState::Accepting { pending } => {
                let blocks = pending.clone();
                let bound = config.channel_bound();
                let relay = relay.clone();
                let shared = Arc::new(FrozenShared {
                    pipelines: blocks.len(),
                    bundle: LazySlot::new(move || build_bundle(blocks, bound, relay)),
                });
                Step::Replace(
                    HubState::Frozen {
                        shared,
                        completed: 0,
                    },
                    Some(Ok(())),
                )
            }
            HubState::Frozen { .. } | HubState::Closed => Step::Keep(None),
        });

        match outcome {
            Some(Ok(())) => {
                self.emit(Event::new(EventKind::ScopeFrozen));
                Ok(())
            }
            Some(Err(err)) => Err(err),
            None => Ok(()),
        }
    }

    /// Fans one upstream value out to every live pipeline.
    ///
    /// Returns `false` once the hub is closed, so the driving loop can stop
    /// pulling the upstream. Per-channel enqueue failures are swallowed.
    pub fn send(&self, value: T) -> bool
    where
        T: Clone,
    {
        let state = self.state.load();
        match &*state {
            HubState::Frozen { shared, .. } => {
                // First call pays the allocation; a cleared bundle means the
                // close transition already won.
                let Some(bundle) = shared.bundle.force() else {
                    return false;
                };
                for (index, sender) in bundle.senders.iter().enumerate() {
                    match sender.send(value.clone()) {
                        SendOutcome::Delivered => {}
                        SendOutcome::Full => self.emit(Event::send_dropped(index, "full")),
                        SendOutcome::Disconnected => {
                            self.emit(Event::send_dropped(index, "closed"));
                        }
                    }
                }
                true
            }
            HubState::Closed => false,
            // Values produced before freeze are silently dropped.
            _ => true,
        }
    }

    /// Closes every delivery channel with a terminal fault.
    ///
    /// Used for upstream failure and cancellation. The state stays `Frozen`;
    /// pipelines drain, observe the fault, and report completion as usual.
    pub(crate) fn fail_all(&self, fault: HubError) {
        let state = self.state.load();
        let HubState::Frozen { shared, .. } = &*state else {
            return;
        };
        let Some(bundle) = shared.bundle.force() else {
            return;
        };
        for sender in &bundle.senders {
            sender.fail(fault.clone());
        }
    }

    /// Transitions to `Closed` after normal upstream completion, unless
    /// pipeline completions got there first.
    ///
    /// The winning transition releases the bundle: senders drop (each
    /// already-collected pipeline drains its channel and ends without a
    /// fault) and untaken outputs are discarded.
    pub(crate) fn complete_all(&self) {
        let released = self.state.transition(|cur| match cur {
            HubState::Frozen { shared, .. } => {
                Step::Replace(HubState::Closed, Some(Arc::clone(shared)))
            }
            _ => Step::Keep(None),
        });
        if let Some(shared) = released {
            self.release(&shared);
        }
    }

    /// Records one pipeline's termination; the last one closes the hub.
    pub(crate) fn pipeline_completed(&self, index: usize) {
        enum Outcome<T, R> {
            Counted,
            ClosedNow(Arc<FrozenShared<T, R>>),
            AlreadyClosed,
            OutOfPhase,
        }

        let outcome = self.state.transition(|cur| match cur {
            HubState::Frozen { shared, completed } => {
                let done = completed + 1;
                if done >= shared.pipelines {
                    Step::Replace(HubState::Closed, Outcome::ClosedNow(Arc::clone(shared)))
                } else {
                    Step::Replace(
                        HubState::Frozen {
                            shared: Arc::clone(shared),
                            completed: done,
                        },
                        Outcome::Counted,
                    )
                }
            }
            HubState::Closed => Step::Keep(Outcome::AlreadyClosed),
            _ => Step::Keep(Outcome::OutOfPhase),
        });

        match outcome {
            Outcome::Counted => {
                self.emit(Event::new(EventKind::PipelineCompleted).with_pipeline(index));
            }
            Outcome::ClosedNow(shared) => {
                self.emit(Event::new(EventKind::PipelineCompleted).with_pipeline(index));
                self.release(&shared);
            }
            // A pipeline draining past an upstream-driven close; harmless.
            Outcome::AlreadyClosed => {}
            Outcome::OutOfPhase => {
                debug_assert!(false, "pipeline {index} completed before freeze");
            }
        }
    }

    /// Resolves one pipeline's output: forces the bundle if needed and
    /// invokes the caller's builder, exactly once per pipeline.
    ///
    /// A builder panic is isolated and becomes the pipeline's single
    /// terminal `BuilderPanicked` item.
    pub(crate) fn take_output(
        &self,
        index: usize,
    ) -> Result<BoxStream<'static, Result<R, HubError>>, HubError> {
        let state = self.state.load();
        let shared = match &*state {
            HubState::Frozen { shared, .. } => Arc::clone(shared),
            HubState::Closed => return Err(HubError::Closed),
            _ => return Err(HubError::NotFrozen),
        };
        let bundle = shared.bundle.force().ok_or(HubError::Closed)?;
        let PendingOutput { builder, input } = bundle
            .outputs
            .get(index)
            .and_then(OutputCell::take)
            .ok_or(HubError::AlreadyCollected { pipeline: index })?;

        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || builder(input))) {
            Ok(output) => Ok(output),
            Err(panic_err) => {
                let reason = {
                    let any = &*panic_err;
                    if let Some(msg) = any.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = any.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    }
                };
                Ok(futures::stream::iter([Err(HubError::BuilderPanicked {
                    reason: reason.into(),
                })])
                .boxed())
            }
        }
    }

    /// Releases the frozen resources: clears the lazy bundle, which drops
    /// every sender and every untaken output. Runs on the winning close
    /// transition only.
    fn release(&self, shared: &FrozenShared<T, R>) {
        shared.bundle.clear();
        self.emit(Event::new(EventKind::ScopeClosed));
    }

    /// Emits a lifecycle event if any observer is attached.
    pub(crate) fn emit(&self, event: Event) {
        if let Some(relay) = &self.relay {
            relay.emit(event);
        }
    }
}

impl<T, R> ResolveOutput<R> for Hub<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    fn take_output(&self, index: usize) -> Result<BoxStream<'static, Result<R, HubError>>, HubError> {
        Hub::take_output(self, index)
    }

    fn pipeline_completed(&self, index: usize) {
        Hub::pipeline_completed(self, index);
    }
}

/// Allocates the delivery channels and parks each builder next to its input
/// stream. Runs at most once per hub, on first need, always after freeze.
fn build_bundle<T, R>(
    blocks: Vec<Arc<BuilderCell<T, R>>>,
    bound: Option<usize>,
    relay: Option<Arc<EventRelay>>,
) -> Bundle<T, R> {
    let mut senders = Vec::with_capacity(blocks.len());
    let mut outputs = Vec::with_capacity(blocks.len());
    for cell in &blocks {
        let (tx, rx) = channel(bound);
        senders.push(tx);
        outputs.push(OutputCell::new(cell.take(), rx));
    }
    if let Some(relay) = relay {
        relay.emit(Event::new(EventKind::ChannelsBuilt));
    }
    Bundle { senders, outputs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::PipelineInput;
    use std::sync::Barrier;
    use std::thread;

    fn identity_builder() -> BoxedBuilder<u32, u32> {
        Box::new(|input: PipelineInput<u32>| input.boxed())
    }

    fn hub() -> Arc<Hub<u32, u32>> {
        Hub::new(HubConfig::default())
    }

    #[tokio::test]
    async fn test_register_after_freeze_is_rejected() {
        let hub = hub();
        hub.register(identity_builder()).unwrap();
        hub.freeze().unwrap();

        let err = hub.register(identity_builder()).unwrap_err();
        assert_eq!(err, HubError::Frozen);
    }

    #[tokio::test]
    async fn test_register_inside_open_window_is_rejected() {
        let hub = hub();
        // Hold the registration window open, as a reentrant call would.
        let pending = hub.begin_register().unwrap();

        let err = hub.register(identity_builder()).unwrap_err();
        assert_eq!(err, HubError::NestedRegister);

        // Leaving the window restores registration.
        hub.finish_register(pending).unwrap();
        assert!(hub.register(identity_builder()).is_ok());
    }

    #[tokio::test]
    async fn test_freeze_empty_scope_is_rejected() {
        let hub = hub();
        assert_eq!(hub.freeze().unwrap_err(), HubError::NoPipelines);
    }

    #[tokio::test]
    async fn test_freeze_twice_is_noop() {
        let hub = hub();
        hub.register(identity_builder()).unwrap();
        hub.freeze().unwrap();

        let first = hub.state.load();
        hub.freeze().unwrap();
        let second = hub.state.load();
        // The second freeze committed nothing: same state snapshot.
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_collect_before_freeze_is_rejected() {
        let hub = hub();
        hub.register(identity_builder()).unwrap();

        assert_eq!(hub.take_output(0).err().unwrap(), HubError::NotFrozen);
    }

    #[tokio::test]
    async fn test_collect_twice_is_rejected() {
        let hub = hub();
        hub.register(identity_builder()).unwrap();
        hub.freeze().unwrap();

        assert!(hub.take_output(0).is_ok());
        assert_eq!(
            hub.take_output(0).err().unwrap(),
            HubError::AlreadyCollected { pipeline: 0 }
        );
    }

    #[tokio::test]
    async fn test_send_before_freeze_is_dropped_silently() {
        let hub = hub();
        hub.register(identity_builder()).unwrap();
        // Not frozen yet: the value vanishes but the hub stays usable.
        assert!(hub.send(1));
        hub.freeze().unwrap();
        assert!(hub.send(2));

        let mut output = hub.take_output(0).unwrap();
        hub.complete_all();
        assert_eq!(output.next().await.unwrap().unwrap(), 2);
        assert!(output.next().await.is_none());
    }

    #[tokio::test]
    async fn test_values_buffered_before_collection_are_drained() {
        let hub = hub();
        hub.register(identity_builder()).unwrap();
        hub.freeze().unwrap();

        // Sends force the bundle; the collection happens later.
        assert!(hub.send(1));
        assert!(hub.send(2));

        let mut output = hub.take_output(0).unwrap();
        hub.complete_all();
        assert_eq!(output.next().await.unwrap().unwrap(), 1);
        assert_eq!(output.next().await.unwrap().unwrap(), 2);
        assert!(output.next().await.is_none());
    }

    #[tokio::test]
    async fn test_all_completions_close_exactly_once() {
        let hub = hub();
        let n = 4;
        for _ in 0..n {
            hub.register(identity_builder()).unwrap();
        }
        hub.freeze().unwrap();

        let shared = match &*hub.state.load() {
            HubState::Frozen { shared, .. } => Arc::clone(shared),
            _ => unreachable!("just frozen"),
        };
        assert!(shared.bundle.force().is_some());

        let barrier = Arc::new(Barrier::new(n));
        let handles: Vec<_> = (0..n)
            .map(|index| {
                let hub = Arc::clone(&hub);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    hub.pipeline_completed(index);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert!(matches!(&*hub.state.load(), HubState::Closed));
        // The winning transition cleared the bundle.
        assert!(shared.bundle.force().is_none());
        // Late reports and further sends are no-ops.
        hub.pipeline_completed(0);
        assert!(!hub.send(9));
    }

    #[tokio::test]
    async fn test_upstream_close_races_with_completions() {
        let hub = hub();
        hub.register(identity_builder()).unwrap();
        hub.freeze().unwrap();

        // Upstream termination and the last pipeline completion race; both
        // paths are no-ops once the other has won.
        hub.complete_all();
        hub.pipeline_completed(0);
        assert!(matches!(&*hub.state.load(), HubState::Closed));
    }

    #[tokio::test]
    async fn test_builder_panic_becomes_pipeline_fault() {
        let hub: Arc<Hub<u32, u32>> = Hub::new(HubConfig::default());
        hub.register(Box::new(|_input: PipelineInput<u32>| -> BoxStream<
            'static,
            Result<u32, HubError>,
        > {
            panic!("broken builder")
        }))
        .unwrap();
        hub.freeze().unwrap();

        let mut output = hub.take_output(0).unwrap();
        let fault = output.next().await.unwrap().unwrap_err();
        assert_eq!(
            fault,
            HubError::BuilderPanicked {
                reason: "broken builder".into()
            }
        );
        assert!(output.next().await.is_none());
    }
}
