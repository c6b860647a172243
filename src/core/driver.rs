//! # Driving loop and `select` orchestrator.
//!
//! [`drive`] consumes the upstream source value-by-value, pushing each one
//! into the hub, and maps upstream termination onto the matching hub
//! transition. [`select`] is the one-shot operator wrapper: it runs
//! configuration, freeze, and the driving loop in that fixed order and
//! returns the caller's combined stream.
//!
//! ## Termination mapping
//! ```text
//! upstream ends          ─► complete_all(): channels close without a fault,
//!                           pipelines drain then end normally
//! upstream yields Err(e) ─► fail_all(Upstream(e)): every live pipeline
//!                           fails with exactly `e` once drained
//! token cancelled        ─► fail_all(Cancelled): a distinguished terminal
//!                           signal; the driver re-throws it after cleanup
//! hub closed early       ─► stop pulling the upstream (all pipelines done)
//! ```
//!
//! The upstream-driven close and the "all pipelines completed" close race
//! harmlessly: the CAS cell lets exactly one of them commit; the other
//! observes `Closed` and no-ops.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::HubConfig;
use crate::core::Hub;
use crate::error::{HubError, SourceError};
use crate::events::{Event, EventKind};
use crate::pipelines::SelectorScope;

/// Pumps the upstream into the hub until exhaustion, error, or cancellation.
///
/// Returns `Ok(())` on normal completion (including the hub closing early
/// because every pipeline finished), `Err(HubError::Upstream(_))` when the
/// upstream failed, and `Err(HubError::Cancelled)` when the token fired —
/// cancellation is re-thrown after the channels were notified, never
/// swallowed.
pub async fn drive<T, R, S>(
    hub: Arc<Hub<T, R>>,
    upstream: S,
    token: CancellationToken,
) -> Result<(), HubError>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    S: Stream<Item = Result<T, SourceError>>,
{
    futures::pin_mut!(upstream);
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                hub.emit(Event::new(EventKind::Cancelled));
                hub.fail_all(HubError::Cancelled);
                return Err(HubError::Cancelled);
            }
            item = upstream.next() => match item {
                Some(Ok(value)) => {
                    if !hub.send(value) {
                        return Ok(());
                    }
                }
                Some(Err(err)) => {
                    hub.emit(
                        Event::new(EventKind::UpstreamFailed)
                            .with_reason(err.message().to_string()),
                    );
                    let fault = HubError::Upstream(err);
                    hub.fail_all(fault.clone());
                    return Err(fault);
                }
                None => {
                    hub.complete_all();
                    return Ok(());
                }
            }
        }
    }
}

/// Runs a full publish-with-selector collection over `upstream`.
///
/// Fixed order: the configuration closure registers its pipelines against
/// the scope and returns the combined stream it built over them; the hub
/// freezes; the driving loop starts. The returned [`Selected`] yields the
/// combined stream's items and cancels the driver when dropped.
///
/// # Errors
/// Whatever the configuration closure surfaces, plus
/// [`HubError::NoPipelines`] when it registered nothing.
pub fn select<T, R, S, F, C>(
    upstream: S,
    config: HubConfig,
    configure: F,
) -> Result<Selected<C>, HubError>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    S: Stream<Item = Result<T, SourceError>> + Send + 'static,
    F: FnOnce(&SelectorScope<T, R>) -> Result<C, HubError>,
    C: Stream,
{
    select_on(Hub::new(config), upstream, configure)
}

/// Like [`select`], but over a caller-built hub (e.g. one with observers).
///
/// The hub must be fresh: one instance serves exactly one collection.
pub fn select_on<T, R, S, F, C>(
    hub: Arc<Hub<T, R>>,
    upstream: S,
    configure: F,
) -> Result<Selected<C>, HubError>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    S: Stream<Item = Result<T, SourceError>> + Send + 'static,
    F: FnOnce(&SelectorScope<T, R>) -> Result<C, HubError>,
    C: Stream,
{
    let scope = SelectorScope::new(Arc::clone(&hub));
    let combined = configure(&scope)?;
    hub.freeze()?;

    let token = CancellationToken::new();
    let driver = tokio::spawn(drive(hub, upstream, token.child_token()));
    Ok(Selected {
        combined,
        token,
        driver: Some(driver),
    })
}

/// The overall result stream of a [`select`] collection.
///
/// Yields the combined stream's items unchanged. Dropping it cancels the
/// driving loop, which propagates a cancellation fault to every pipeline
/// still listening.
pub struct Selected<C> {
    combined: C,
    token: CancellationToken,
    driver: Option<JoinHandle<Result<(), HubError>>>,
}

impl<C> Selected<C> {
    /// Cancels the driving loop and awaits its final result.
    ///
    /// Cancellation is re-thrown: expect `Err(HubError::Cancelled)` unless
    /// the driver had already finished for another reason.
    pub async fn cancel(mut self) -> Result<(), HubError> {
        self.token.cancel();
        match self.driver.take() {
            Some(driver) => driver.await.unwrap_or(Err(HubError::Cancelled)),
            None => Ok(()),
        }
    }
}

impl<C> std::fmt::Debug for Selected<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selected")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<C> Stream for Selected<C>
where
    C: Stream + Unpin,
{
    type Item = C::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.combined).poll_next(cx)
    }
}

impl<C> Drop for Selected<C> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
