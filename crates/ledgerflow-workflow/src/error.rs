use thiserror::Error;

/// Integrity problems found in a flow definition.
///
/// These are reported by [`crate::validate`]. The engine executes flows that
/// have them anyway and treats broken references as the end of a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("edge '{edge_id}' references unknown node: from={from}, to={to}")]
  InvalidEdge {
    edge_id: String,
    from: String,
    to: String,
  },

  #[error("edge '{edge_id}' leaves switch '{node_id}' through unknown branch '{handle}'")]
  UnknownBranchHandle {
    edge_id: String,
    node_id: String,
    handle: String,
  },

  #[error("edge '{edge_id}' leaves switch '{node_id}' without a branch handle")]
  MissingBranchHandle { edge_id: String, node_id: String },

  #[error("switch '{0}' has no branches")]
  EmptySwitch(String),

  #[error("wait '{0}' has a zero duration")]
  ZeroWait(String),

  #[error("node '{0}' has no incoming edges but is not a trigger (orphan node)")]
  OrphanNode(String),

  #[error("no trigger nodes found")]
  NoTriggers,
}
