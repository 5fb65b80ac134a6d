use serde::{Deserialize, Serialize};

/// A directed connection between two nodes of a flow.
///
/// When the source is a switch node, `source_handle` names the branch whose
/// match continues along this edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_handle: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_handle: Option<String>,
}

impl FlowEdge {
  /// Create an edge without handles.
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      source_handle: None,
      target_handle: None,
    }
  }

  /// Create an edge leaving a switch node through the given branch.
  pub fn branch(
    id: impl Into<String>,
    source: impl Into<String>,
    branch_id: impl Into<String>,
    target: impl Into<String>,
  ) -> Self {
    Self {
      source_handle: Some(branch_id.into()),
      ..Self::new(id, source, target)
    }
  }
}
