//! # Selector scope: the registration surface.
//!
//! A [`SelectorScope`] is what configuration code sees: one operation,
//! [`register`](SelectorScope::register). The orchestrating
//! [`select`](crate::select) function passes a scope to the caller's
//! configuration closure, then freezes the hub and starts the driving loop
//! — registration is only legal inside that window.
//!
//! ## Example
//! ```no_run
//! use fanhub::{Hub, HubConfig, SelectorScope};
//! use futures::{StreamExt, TryStreamExt};
//!
//! # fn demo() -> Result<(), fanhub::HubError> {
//! let hub = Hub::<u32, u32>::new(HubConfig::default());
//! let scope = SelectorScope::new(hub.clone());
//!
//! let evens = scope.register(|input| input.try_filter(|v| {
//!     let keep = v % 2 == 0;
//!     async move { keep }
//! }))?;
//! let all = scope.register(|input| input.boxed())?;
//!
//! hub.freeze()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use futures::{Stream, StreamExt};

use crate::channels::PipelineInput;
use crate::core::Hub;
use crate::error::HubError;
use crate::pipelines::output::{PipelineStream, ResolveOutput};

/// Registration surface over one [`Hub`].
///
/// Clone-free by design: configuration code borrows the scope, registers
/// any number of pipelines, and returns; the scope exposes nothing else.
pub struct SelectorScope<T, R> {
    hub: Arc<Hub<T, R>>,
}

impl<T, R> SelectorScope<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Creates the registration surface for `hub`.
    pub fn new(hub: Arc<Hub<T, R>>) -> Self {
        Self { hub }
    }

    /// Registers a pipeline and returns its placeholder output stream.
    ///
    /// The builder runs **exactly once**, lazily, the first time the
    /// returned stream is collected after freeze. It receives the
    /// pipeline's private input — every upstream value in order, ending
    /// normally or with a terminal fault — and returns the pipeline's
    /// output stream.
    ///
    /// # Errors
    /// - [`HubError::Frozen`] / [`HubError::Closed`] — registration phase
    ///   is over;
    /// - [`HubError::NestedRegister`] — called while another registration
    ///   is still in flight.
    pub fn register<B, S>(&self, builder: B) -> Result<PipelineStream<R>, HubError>
    where
        B: FnOnce(PipelineInput<T>) -> S + Send + 'static,
        S: Stream<Item = Result<R, HubError>> + Send + 'static,
    {
        let index = self
            .hub
            .register(Box::new(move |input| builder(input).boxed()))?;
        let hub: Arc<dyn ResolveOutput<R>> = Arc::clone(&self.hub) as _;
        Ok(PipelineStream::new(hub, index))
    }
}
