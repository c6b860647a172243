//! Lock-free and once-only support primitives.
//!
//! Internal modules:
//! - [`state_cell`]: atomically swappable cell mutated through an optimistic
//!   compare-and-swap retry loop;
//! - [`lazy_slot`]: once-only, on-demand-initialized, clearable value holder.

mod lazy_slot;
mod state_cell;

pub(crate) use lazy_slot::LazySlot;
pub(crate) use state_cell::{StateCell, Step};
