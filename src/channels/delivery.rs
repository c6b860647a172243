//! # Delivery channel: hub → one pipeline.
//!
//! [`channel`] builds the queue between the hub and a single pipeline. The
//! sender side never blocks and never fails loudly; the receiver side is a
//! [`Stream`] the pipeline builder consumes.
//!
//! ## Rules
//! - **Non-blocking send**: `send()` uses `try_send`; a full or closed queue
//!   means the value is dropped *for that pipeline only*, and the returned
//!   [`SendOutcome`] tells the hub what to report.
//! - **Per-pipeline FIFO**: values arrive in the exact order they were sent.
//! - **Three-way close**: a channel ends normally (`close`), with an
//!   upstream fault, or with a cancellation fault (`fail`); the receiver
//!   distinguishes all three.
//! - **Fault is terminal**: after yielding a fault the input stream ends,
//!   even if the queue still holds signals behind it.
//!
//! ## Capacity
//! `None` = unbounded: a live pipeline never misses a value. `Some(n)` =
//! bounded: a pipeline lagging more than `n` values has further sends
//! dropped (and, in the worst case, a fault can be lost to a full queue —
//! the channel then ends normally instead). Unbounded is the default used
//! by the hub.

use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::error::HubError;

/// One queued message: a value, or the terminal fault.
enum Signal<T> {
    Item(T),
    Fault(HubError),
}

/// Result of a non-blocking send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendOutcome {
    /// The value was enqueued.
    Delivered,
    /// The queue is full; the value was dropped for this pipeline.
    Full,
    /// The receiving side is gone or the channel was closed; dropped.
    Disconnected,
}

enum Tx<T> {
    Bounded(mpsc::Sender<Signal<T>>),
    Unbounded(mpsc::UnboundedSender<Signal<T>>),
}

enum Rx<T> {
    Bounded(mpsc::Receiver<Signal<T>>),
    Unbounded(mpsc::UnboundedReceiver<Signal<T>>),
}

/// Creates a delivery channel with the given capacity (`None` = unbounded).
pub(crate) fn channel<T>(bound: Option<usize>) -> (DeliverySender<T>, PipelineInput<T>) {
    let (tx, rx) = match bound {
        Some(n) => {
            let (tx, rx) = mpsc::channel(n.max(1));
            (Tx::Bounded(tx), Rx::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Tx::Unbounded(tx), Rx::Unbounded(rx))
        }
    };
    (
        DeliverySender {
            tx: Mutex::new(Some(tx)),
        },
        PipelineInput { rx, done: false },
    )
}

/// Hub-side handle of a delivery channel.
///
/// Shared by reference from the frozen bundle; closing takes the inner
/// sender out so subsequent sends observe a locally closed channel.
pub(crate) struct DeliverySender<T> {
    tx: Mutex<Option<Tx<T>>>,
}

impl<T> DeliverySender<T> {
    /// Attempts to enqueue a value; never blocks. Anything but
    /// [`SendOutcome::Delivered`] means the value was dropped for this
    /// pipeline only.
    pub fn send(&self, value: T) -> SendOutcome {
        match self.lock().as_ref() {
            Some(Tx::Bounded(tx)) => match tx.try_send(Signal::Item(value)) {
                Ok(()) => SendOutcome::Delivered,
                Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::Full,
                Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Disconnected,
            },
            Some(Tx::Unbounded(tx)) => match tx.send(Signal::Item(value)) {
                Ok(()) => SendOutcome::Delivered,
                Err(_) => SendOutcome::Disconnected,
            },
            None => SendOutcome::Disconnected,
        }
    }

    /// Closes the channel normally; the receiver drains what was already
    /// queued and then ends without a fault.
    pub fn close(&self) {
        self.lock().take();
    }

    /// Enqueues a terminal fault, then closes the channel. The receiver
    /// drains earlier values first and observes the fault last.
    pub fn fail(&self, fault: HubError) {
        if let Some(tx) = self.lock().take() {
            match tx {
                Tx::Bounded(tx) => {
                    let _ = tx.try_send(Signal::Fault(fault));
                }
                Tx::Unbounded(tx) => {
                    let _ = tx.send(Signal::Fault(fault));
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Tx<T>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pipeline-side stream of upstream values.
///
/// Yields `Ok(value)` in FIFO order; ends after `None` on a normal close, or
/// after a single terminal `Err(fault)` when the collection stopped
/// abnormally (upstream failure or cancellation).
pub struct PipelineInput<T> {
    rx: Rx<T>,
    done: bool,
}

impl<T> Stream for PipelineInput<T> {
    type Item = Result<T, HubError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        let next = match &mut this.rx {
            Rx::Bounded(rx) => rx.poll_recv(cx),
            Rx::Unbounded(rx) => rx.poll_recv(cx),
        };
        match next {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Signal::Item(value))) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(Some(Signal::Fault(fault))) => {
                this.done = true;
                Poll::Ready(Some(Err(fault)))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_values_arrive_in_fifo_order() {
        let (tx, mut rx) = channel::<u32>(None);
        for v in 1..=4 {
            assert_eq!(tx.send(v), SendOutcome::Delivered);
        }
        tx.close();

        let mut seen = Vec::new();
        while let Some(item) = rx.next().await {
            seen.push(item.unwrap());
        }
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_normal_close_ends_without_fault() {
        let (tx, mut rx) = channel::<u32>(None);
        tx.close();
        assert!(rx.next().await.is_none());
        // Stays ended.
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_fault_is_yielded_last_and_terminal() {
        let (tx, mut rx) = channel::<u32>(None);
        assert_eq!(tx.send(1), SendOutcome::Delivered);
        tx.fail(HubError::Upstream(SourceError::new("boom")));

        assert_eq!(rx.next().await.unwrap().unwrap(), 1);
        let fault = rx.next().await.unwrap().unwrap_err();
        assert_eq!(fault, HubError::Upstream(SourceError::new("boom")));
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_after_close_is_dropped() {
        let (tx, mut rx) = channel::<u32>(None);
        tx.close();
        assert_eq!(tx.send(5), SendOutcome::Disconnected);
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_to_dropped_receiver_reports_drop() {
        let (tx, rx) = channel::<u32>(None);
        drop(rx);
        assert_eq!(tx.send(5), SendOutcome::Disconnected);
    }

    #[tokio::test]
    async fn test_bounded_overflow_drops_for_this_pipeline_only() {
        let (tx, mut rx) = channel::<u32>(Some(2));
        assert_eq!(tx.send(1), SendOutcome::Delivered);
        assert_eq!(tx.send(2), SendOutcome::Delivered);
        assert_eq!(tx.send(3), SendOutcome::Full);
        tx.close();

        let mut seen = Vec::new();
        while let Some(item) = rx.next().await {
            seen.push(item.unwrap());
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_cancellation_fault_is_distinguished() {
        let (tx, mut rx) = channel::<u32>(None);
        tx.fail(HubError::Cancelled);

        let fault = rx.next().await.unwrap().unwrap_err();
        assert!(fault.is_cancellation());
        assert!(rx.next().await.is_none());
    }
}
