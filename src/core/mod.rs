//! Hub core: lifecycle state machine and driving loop.
//!
//! This module contains the staged fan-out machinery:
//! - [`state`](self): the five-phase lifecycle sum type (internal);
//! - [`Hub`]: registration, freeze, fan-out send, completion bookkeeping,
//!   exactly-once teardown;
//! - [`drive`] / [`select`]: the upstream pump and the orchestrating
//!   configure → freeze → run entry point.

mod driver;
mod hub;
mod state;

pub use driver::{drive, select, select_on, Selected};
pub use hub::{Hub, HubBuilder};
