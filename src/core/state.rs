//! # Hub lifecycle states.
//!
//! [`HubState`] is a closed set of mutually exclusive phases with different
//! associated data, held behind the hub's
//! [`StateCell`](crate::sync::StateCell) and matched exhaustively at every
//! transition site.
//!
//! ```text
//! Idle ──register──► Registering ──return──► Accepting ──register──► Registering ...
//!                        │                       │
//!                        └───────freeze──────────┴──► Frozen ──last completion──► Closed
//!                                                       ▲                          │
//!                                                       └── upstream end ──────────┘
//! ```
//!
//! ## Rules
//! - The pending builder list travels between snapshots as a vector of
//!   cheaply clonable cells; the closures themselves are never cloned.
//! - The list captured by `Frozen` is a snapshot: registration is over.
//! - `completed` only grows, by exactly 1 per pipeline, never past the
//!   pipeline count.
//! - `Closed` is terminal.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::BoxStream;

use crate::channels::{DeliverySender, PipelineInput};
use crate::error::HubError;
use crate::sync::LazySlot;

/// A registered pipeline builder: consumes the pipeline's private input
/// stream, returns the pipeline's output stream.
pub(crate) type BoxedBuilder<T, R> =
    Box<dyn FnOnce(PipelineInput<T>) -> BoxStream<'static, Result<R, HubError>> + Send>;

/// Once-consumable holder for a registered builder.
///
/// State snapshots share builder cells by reference so CAS retries can clone
/// the pending list without cloning the closures inside it.
pub(crate) struct BuilderCell<T, R> {
    inner: Mutex<Option<BoxedBuilder<T, R>>>,
}

impl<T, R> BuilderCell<T, R> {
    pub fn new(builder: BoxedBuilder<T, R>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Some(builder)),
        })
    }

    /// Takes the builder out; `None` if it was already consumed.
    pub fn take(&self) -> Option<BoxedBuilder<T, R>> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<BoxedBuilder<T, R>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A pipeline's parked output: its builder next to its input stream,
/// consumed by the first collection.
pub(crate) struct PendingOutput<T, R> {
    pub builder: BoxedBuilder<T, R>,
    pub input: PipelineInput<T>,
}

/// Once-consumable holder for a parked output.
pub(crate) struct OutputCell<T, R> {
    inner: Mutex<Option<PendingOutput<T, R>>>,
}

impl<T, R> OutputCell<T, R> {
    pub fn new(builder: Option<BoxedBuilder<T, R>>, input: PipelineInput<T>) -> Self {
        Self {
            inner: Mutex::new(builder.map(|builder| PendingOutput { builder, input })),
        }
    }

    /// Takes the parked output; `None` if this pipeline was already
    /// collected.
    pub fn take(&self) -> Option<PendingOutput<T, R>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// The delivery channels and parked outputs of a frozen hub, built at most
/// once by the lazy slot in [`FrozenShared`].
pub(crate) struct Bundle<T, R> {
    /// Hub-side channel handles, one per pipeline, in registration order.
    pub senders: Vec<DeliverySender<T>>,
    /// Parked outputs, one per pipeline, in registration order.
    pub outputs: Vec<OutputCell<T, R>>,
}

/// Data shared by every `Frozen` snapshot of one hub instance.
///
/// The completion counter lives in the state variant itself (it changes via
/// CAS); everything here is immutable or interior-managed.
pub(crate) struct FrozenShared<T, R> {
    /// Number of registered pipelines; fixed at freeze.
    pub pipelines: usize,
    /// Lazily built channel/output bundle; cleared exactly once at close.
    pub bundle: LazySlot<Bundle<T, R>>,
}

/// One hub lifecycle phase. Exactly one is current at any instant.
pub(crate) enum HubState<T, R> {
    /// No registrations yet.
    Idle,
    /// A `register` call is between capturing its builder and returning;
    /// forbids nested registration.
    Registering {
        pending: Vec<Arc<BuilderCell<T, R>>>,
    },
    /// Between registrations; permits further registration or freezing.
    Accepting {
        pending: Vec<Arc<BuilderCell<T, R>>>,
    },
    /// Configuration closed; fan-out live, `completed` pipelines finished.
    Frozen {
        shared: Arc<FrozenShared<T, R>>,
        completed: usize,
    },
    /// Every pipeline finished (or the upstream ended); resources released.
    Closed,
}
