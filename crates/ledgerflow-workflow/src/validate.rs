use std::collections::HashSet;

use ledgerflow_config::{FlowDefinition, NodeData};

use crate::error::WorkflowError;
use crate::graph::Graph;

/// Check a flow definition for integrity problems.
///
/// Returns every finding instead of stopping at the first one. An empty list
/// means the definition is clean.
pub fn validate(flow: &FlowDefinition) -> Vec<WorkflowError> {
  let graph = Graph::new(flow);
  let mut findings = Vec::new();

  let mut seen = HashSet::new();
  for node in &flow.nodes {
    if !seen.insert(node.id.as_str()) {
      findings.push(WorkflowError::DuplicateNode(node.id.clone()));
    }
  }

  if !flow
    .nodes
    .iter()
    .any(|n| matches!(n.data, NodeData::Trigger(_)))
  {
    findings.push(WorkflowError::NoTriggers);
  }

  for edge in &flow.edges {
    let source = graph.get_node(&edge.source);
    if source.is_none() || graph.get_node(&edge.target).is_none() {
      findings.push(WorkflowError::InvalidEdge {
        edge_id: edge.id.clone(),
        from: edge.source.clone(),
        to: edge.target.clone(),
      });
    }

    let Some(NodeData::Switch(switch)) = source.map(|n| &n.data) else {
      continue;
    };
    match &edge.source_handle {
      None => findings.push(WorkflowError::MissingBranchHandle {
        edge_id: edge.id.clone(),
        node_id: edge.source.clone(),
      }),
      Some(handle) if !switch.branches.iter().any(|b| &b.id == handle) => {
        findings.push(WorkflowError::UnknownBranchHandle {
          edge_id: edge.id.clone(),
          node_id: edge.source.clone(),
          handle: handle.clone(),
        })
      }
      Some(_) => {}
    }
  }

  for node in &flow.nodes {
    match &node.data {
      NodeData::Trigger(_) => continue,
      NodeData::Switch(switch) if switch.branches.is_empty() => {
        findings.push(WorkflowError::EmptySwitch(node.id.clone()));
      }
      NodeData::UtilityWait(wait) if wait.duration == 0 => {
        findings.push(WorkflowError::ZeroWait(node.id.clone()));
      }
      _ => {}
    }
    if graph.incoming(&node.id).is_empty() {
      findings.push(WorkflowError::OrphanNode(node.id.clone()));
    }
  }

  findings
}
