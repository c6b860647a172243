//! Per-pipeline delivery channels.
//!
//! This module contains the point-to-point queue carrying values (and close
//! signals) from the hub to exactly one pipeline:
//! - [`DeliverySender`]: hub-side handle — non-blocking send, normal close,
//!   close-with-fault;
//! - [`PipelineInput`]: pipeline-side stream of values ending in either a
//!   normal end or a terminal fault.

mod delivery;

pub use delivery::PipelineInput;
pub(crate) use delivery::{channel, DeliverySender, SendOutcome};
