//! Step sequencing.
//!
//! - [`RunSlot`] holds at most one active [`Sequence`]
//! - [`Sequence`] walks its steps with a forward-only cursor
//! - [`Invoker`] starts and aborts sequences and routes process callbacks

pub mod invoker;
pub mod sequence;
pub mod slot;

pub use invoker::{ContextOperator, Invoker, RUNNING_CONTEXT_KEY};
pub use sequence::{Advance, Sequence};
pub use slot::{RunSlot, RunStatus, SlotState};
