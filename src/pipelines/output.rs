//! # Placeholder pipeline output.
//!
//! [`PipelineStream`] is what `register` hands back immediately, before the
//! hub is frozen or anything runs. Collecting it after freeze resolves the
//! real output — the caller's builder applied to the pipeline's private
//! input stream — and forwards its items. When the resolved stream
//! terminates, or the collector abandons it mid-stream, the hub is notified
//! exactly once so completion bookkeeping and teardown stay accurate.
//!
//! ## Rules
//! - **Collect after freeze**: polling before freeze yields a single
//!   `NotFrozen` usage error; polling after close yields `Closed`.
//! - **One collector**: the second collection attempt of the same pipeline
//!   yields `AlreadyCollected`.
//! - **Exactly-once completion report**: end-of-stream and drop-while-
//!   collecting funnel into one notification; a placeholder that never
//!   resolved reports nothing.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use futures::Stream;

use crate::error::HubError;

/// Hub surface the placeholder needs: resolve an output once, report its
/// completion once. Implemented by the hub core.
pub(crate) trait ResolveOutput<R>: Send + Sync {
    /// Builds and hands over the output stream at `index`; fails on misuse
    /// (not frozen, closed, already collected).
    fn take_output(&self, index: usize)
        -> Result<BoxStream<'static, Result<R, HubError>>, HubError>;

    /// Records that the pipeline at `index` finished, whatever the cause.
    fn pipeline_completed(&self, index: usize);
}

/// Placeholder output stream for one registered pipeline.
///
/// Returned by [`SelectorScope::register`](crate::SelectorScope::register).
/// Yields the pipeline's items once the scope is frozen and this stream is
/// collected; a lifecycle misuse surfaces as a single terminal usage error.
pub struct PipelineStream<R> {
    hub: Arc<dyn ResolveOutput<R>>,
    index: usize,
    inner: Option<BoxStream<'static, Result<R, HubError>>>,
    done: bool,
}

impl<R> PipelineStream<R> {
    pub(crate) fn new(hub: Arc<dyn ResolveOutput<R>>, index: usize) -> Self {
        Self {
            hub,
            index,
            inner: None,
            done: false,
        }
    }

    /// Index assigned at registration; the pipeline's permanent identity.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<R> Stream for PipelineStream<R> {
    type Item = Result<R, HubError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let inner = match &mut this.inner {
            Some(inner) => inner,
            None => match this.hub.take_output(this.index) {
                Ok(output) => this.inner.insert(output),
                Err(err) => {
                    // Usage error: this collector never owned the pipeline,
                    // so no completion is reported.
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
            },
        };

        match inner.as_mut().poll_next(cx) {
            Poll::Ready(None) => {
                this.done = true;
                this.inner = None;
                this.hub.pipeline_completed(this.index);
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl<R> Drop for PipelineStream<R> {
    fn drop(&mut self) {
        // Abandoned mid-collection: the hub still gets its single report.
        if self.inner.is_some() && !self.done {
            self.hub.pipeline_completed(self.index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Hands out one prepared stream, then `AlreadyCollected`; counts
    /// completion reports.
    struct StubHub {
        output: Mutex<Option<BoxStream<'static, Result<u32, HubError>>>>,
        completions: AtomicUsize,
    }

    impl StubHub {
        fn with_items(items: Vec<Result<u32, HubError>>) -> Arc<Self> {
            Arc::new(Self {
                output: Mutex::new(Some(stream::iter(items).boxed())),
                completions: AtomicUsize::new(0),
            })
        }

        fn already_collected() -> Arc<Self> {
            Arc::new(Self {
                output: Mutex::new(None),
                completions: AtomicUsize::new(0),
            })
        }
    }

    impl ResolveOutput<u32> for StubHub {
        fn take_output(
            &self,
            index: usize,
        ) -> Result<BoxStream<'static, Result<u32, HubError>>, HubError> {
            self.output
                .lock()
                .unwrap()
                .take()
                .ok_or(HubError::AlreadyCollected { pipeline: index })
        }

        fn pipeline_completed(&self, _index: usize) {
            self.completions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_drains_inner_stream_and_reports_once() {
        let hub = StubHub::with_items(vec![Ok(1), Ok(2)]);
        let mut stream = PipelineStream::new(Arc::clone(&hub) as _, 0);

        assert_eq!(stream.next().await.unwrap().unwrap(), 1u32);
        assert_eq!(stream.next().await.unwrap().unwrap(), 2u32);
        assert!(stream.next().await.is_none());
        assert_eq!(hub.completions.load(Ordering::SeqCst), 1);

        // Fused after the end; no second report.
        assert!(stream.next().await.is_none());
        drop(stream);
        assert_eq!(hub.completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_mid_collection_reports_once() {
        let hub = StubHub::with_items(vec![Ok(1), Ok(2), Ok(3)]);
        let mut stream = PipelineStream::new(Arc::clone(&hub) as _, 0);

        assert_eq!(stream.next().await.unwrap().unwrap(), 1u32);
        drop(stream);
        assert_eq!(hub.completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unresolved_placeholder_reports_nothing() {
        let hub = StubHub::with_items(vec![Ok(1)]);
        let stream = PipelineStream::new(Arc::clone(&hub) as _, 0);
        drop(stream);
        assert_eq!(hub.completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_terminal_and_unreported() {
        let hub = StubHub::already_collected();
        let mut stream = PipelineStream::new(Arc::clone(&hub) as _, 3);

        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err, HubError::AlreadyCollected { pipeline: 3 });
        assert!(stream.next().await.is_none());
        drop(stream);
        assert_eq!(hub.completions.load(Ordering::SeqCst), 0);
    }
}
