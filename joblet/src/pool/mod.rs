//! Slot-based admission control for running jobs.
//!
//! A [`SlotTable`] records the children currently alive; [`ensure_free_slot`]
//! frees a slot by reaping a finished job (non-blocking scan first, then a
//! wait scoped to the tracked handles); [`drain`] reaps everything at
//! shutdown.

mod reap;
mod table;

pub use reap::{drain, ensure_free_slot};
pub use table::{SlotId, SlotTable};
