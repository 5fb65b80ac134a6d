//! Ledgerflow Trigger
//!
//! Business events enter the engine as a [`FlowEventContext`]. The
//! [`TriggerMatcher`] selects the trigger nodes of a flow that react to an
//! event.

mod context;
mod matcher;

pub use context::{FlowEventContext, TriggerError};
pub use matcher::TriggerMatcher;
