//! # LogWriter — simple event printer
//!
//! A minimal observer that prints incoming [`Event`]s to stdout.
//! Use it for test or demo.
//!
//! ## Example output
//! ```text
//! [registered] pipeline=0
//! [frozen]
//! [channels-built]
//! [send-dropped] pipeline=1 reason="closed"
//! [pipeline-completed] pipeline=0
//! [closed]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind, Observe};

/// Event printer observer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::PipelineRegistered => {
                println!("[registered] pipeline={:?}", e.pipeline);
            }
            EventKind::ScopeFrozen => {
                println!("[frozen]");
            }
            EventKind::ChannelsBuilt => {
                println!("[channels-built]");
            }
            EventKind::SendDropped => {
                println!(
                    "[send-dropped] pipeline={:?} reason={:?}",
                    e.pipeline, e.reason
                );
            }
            EventKind::PipelineCompleted => {
                println!("[pipeline-completed] pipeline={:?}", e.pipeline);
            }
            EventKind::ScopeClosed => {
                println!("[closed]");
            }
            EventKind::UpstreamFailed => {
                println!("[upstream-failed] reason={:?}", e.reason);
            }
            EventKind::Cancelled => {
                println!("[cancelled]");
            }
            EventKind::ObserverOverflow => {
                println!("[observer-overflow] reason={:?}", e.reason);
            }
            EventKind::ObserverPanicked => {
                println!("[observer-panicked] reason={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
