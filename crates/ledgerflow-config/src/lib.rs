//! Ledgerflow Config
//!
//! This crate contains the serializable flow definition types for ledgerflow.
//! A flow is a directed graph of typed nodes (triggers, switches, enrollment
//! actions and waits) authored by an organization.
//!
//! Definitions are loaded from:
//! - JSON files (via the CLI)
//! - Database storage (as JSON blobs)
//!
//! The engine treats these types as read-only input.

mod edge;
mod enums;
mod error;
mod flow;
mod node;

pub use edge::FlowEdge;
pub use enums::{FlowStatus, NodeKind, Operator, TriggerType, WaitUnit};
pub use error::ModelError;
pub use flow::FlowDefinition;
pub use node::{
  ActionEnrollData, Branch, Condition, FlowNode, NodeData, Position, SwitchData, TriggerData,
  TriggerFilters, WaitData,
};
