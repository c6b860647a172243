//! Lifecycle events: types, observer trait, and fan-out relay.
//!
//! This module groups the event **data model** and the **relay** used to
//! deliver lifecycle events emitted by the hub core and the driving loop to
//! user-supplied observers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Observe`] — observer contract (dedicated worker, bounded queue)
//! - [`EventRelay`] — per-observer queues with overflow and panic isolation
//!
//! Observability is **off by default**: a hub constructed without observers
//! has no relay and the hot path emits nothing.

mod event;
mod observe;
mod relay;

#[cfg(feature = "logging")]
mod log;

pub use event::{Event, EventKind};
pub use observe::Observe;
pub(crate) use relay::EventRelay;

#[cfg(feature = "logging")]
pub use log::LogWriter;
