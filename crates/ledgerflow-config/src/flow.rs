use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::edge::FlowEdge;
use crate::enums::FlowStatus;
use crate::error::ModelError;
use crate::node::FlowNode;

/// A stored workflow graph belonging to one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDefinition {
  pub id: String,
  pub org_id: String,
  pub name: String,
  pub status: FlowStatus,
  #[serde(default)]
  pub nodes: Vec<FlowNode>,
  #[serde(default)]
  pub edges: Vec<FlowEdge>,
  /// Set when the flow has been soft-deleted.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deleted_at: Option<DateTime<Utc>>,
}

impl FlowDefinition {
  pub fn from_json(json: &str) -> Result<Self, ModelError> {
    Ok(serde_json::from_str(json)?)
  }

  /// Whether the flow should receive business events.
  pub fn is_live(&self) -> bool {
    self.status == FlowStatus::Active && self.deleted_at.is_none()
  }

  pub fn get_node(&self, node_id: &str) -> Option<&FlowNode> {
    self.nodes.iter().find(|n| n.id == node_id)
  }
}
