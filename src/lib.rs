//! # fanhub
//!
//! **fanhub** is a fan-out selector hub for asynchronous streams: one hot
//! upstream source, many independently-computed, independently-lifetimed
//! consumer pipelines, composed back into a single result stream.
//!
//! It is the mechanism behind a "publish-with-selector" operator: during a
//! configuration phase the caller registers any number of *selection
//! pipelines*; once the configuration is frozen, every upstream value is
//! delivered to all live pipelines concurrently, and the caller combines
//! the pipelines' output streams however it likes (merge, zip, ...).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     caller ──► SelectorScope::register(builder)   (configuration phase)
//!                        │
//!                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Hub (CAS-staged lifecycle)                                       │
//! │  Idle ─► Registering ⇄ Accepting ─► Frozen ─► Closed              │
//! │  - StateCell (lock-free compare-and-swap cell)                    │
//! │  - LazySlot<Bundle> (channels built at most once, after freeze)   │
//! │  - EventRelay (optional observers, bounded queues)                │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   [channel 0]        [channel 1]        [channel N]     (per-pipeline
//!        │                  │                  │            FIFO queues)
//!        ▼                  ▼                  ▼
//!   builder 0(input)   builder 1(input)   builder N(input)
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//!   PipelineStream 0   PipelineStream 1   PipelineStream N
//!        └──────────────────┴──────────────────┘
//!                           ▼
//!                caller's combiner (merge/zip/...)
//!                           ▼
//!                    Selected<C> (the overall result stream)
//! ```
//!
//! ### Driving loop
//! ```text
//! drive(hub, upstream, token):
//!   loop {
//!     ├─► token cancelled  ─► fail_all(Cancelled), re-throw after cleanup
//!     └─► upstream.next()
//!           ├─ Ok(v)   ─► hub.send(v)      (best-effort fan-out; a slow or
//!           │                               finished pipeline never blocks
//!           │                               or breaks delivery to siblings)
//!           ├─ Err(e)  ─► fail_all(Upstream(e))   (every pipeline sees e)
//!           └─ None    ─► complete_all()          (channels close normally)
//!   }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / functions                  |
//! |-------------------|--------------------------------------------------------------|----------------------------------------|
//! | **Selector API**  | Register pipelines during configuration, collect after freeze.| [`SelectorScope`], [`PipelineStream`]  |
//! | **Orchestration** | Configure → freeze → run in one call.                        | [`select`], [`select_on`], [`Selected`]|
//! | **Hub core**      | CAS-staged lifecycle, lazy channels, exactly-once teardown.  | [`Hub`], [`HubBuilder`]                |
//! | **Errors**        | Usage errors vs terminal faults, labels for logs/metrics.    | [`HubError`], [`SourceError`]          |
//! | **Observability** | Off-by-default lifecycle events behind bounded queues.       | [`Observe`], [`Event`], [`EventKind`]  |
//! | **Configuration** | Channel capacity and observer queue settings.                | [`HubConfig`]                          |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use fanhub::{select, HubConfig, SourceError};
//! use futures::{future, stream, StreamExt, TryStreamExt};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), fanhub::HubError> {
//!     let upstream = stream::iter((1..=4).map(Ok::<u32, SourceError>));
//!
//!     let selected = select(upstream, HubConfig::default(), |scope| {
//!         // Each registration owns a private view of every upstream value.
//!         let evens = scope.register(|input| {
//!             input.try_filter(|v| future::ready(v % 2 == 0))
//!         })?;
//!         let doubled = scope.register(|input| input.map_ok(|v| v * 10))?;
//!         // The combination is the caller's business: merge, zip, anything.
//!         Ok(stream::select(evens, doubled))
//!     })?;
//!
//!     let mut results: Vec<u32> = selected.map(|item| item.unwrap()).collect().await;
//!     results.sort_unstable();
//!     assert_eq!(results, vec![2, 4, 10, 20, 30, 40]);
//!     Ok(())
//! }
//! ```

mod channels;
mod config;
mod core;
mod error;
mod events;
mod pipelines;
mod sync;

// ---- Public re-exports ----

pub use channels::PipelineInput;
pub use config::HubConfig;
pub use core::{drive, select, select_on, Hub, HubBuilder, Selected};
pub use error::{HubError, SourceError};
pub use events::{Event, EventKind, Observe};
pub use pipelines::{PipelineStream, SelectorScope};

// Optional: expose a simple built-in println observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use events::LogWriter;
