//! Ledgerflow Workflow
//!
//! This crate provides the traversal view of a flow definition.
//!
//! Key differences from `ledgerflow-config`:
//! - Nodes are indexed by id, edges by source and target
//! - Switch edges are resolved through their branch handle
//! - Definitions can be checked for integrity problems (dangling edges,
//!   unknown handles, orphan nodes) without rejecting them

mod error;
mod graph;
mod validate;

pub use error::WorkflowError;
pub use graph::Graph;
pub use validate::validate;
