use std::collections::HashMap;

use ledgerflow_config::{FlowDefinition, FlowEdge, FlowNode};

/// Graph structure for traversal, borrowed from a flow definition.
#[derive(Debug, Clone)]
pub struct Graph<'a> {
  nodes: HashMap<&'a str, &'a FlowNode>,
  /// Adjacency list: node_id -> outgoing edges, in definition order.
  adjacency: HashMap<&'a str, Vec<&'a FlowEdge>>,
  /// Reverse adjacency: node_id -> incoming edges.
  reverse_adjacency: HashMap<&'a str, Vec<&'a FlowEdge>>,
}

impl<'a> Graph<'a> {
  /// Build a graph from a flow definition. With duplicate ids the first node wins.
  pub fn new(flow: &'a FlowDefinition) -> Self {
    let mut nodes = HashMap::with_capacity(flow.nodes.len());
    for node in &flow.nodes {
      nodes.entry(node.id.as_str()).or_insert(node);
    }

    let mut adjacency: HashMap<&str, Vec<&FlowEdge>> = HashMap::new();
    let mut reverse_adjacency: HashMap<&str, Vec<&FlowEdge>> = HashMap::new();
    for edge in &flow.edges {
      adjacency.entry(edge.source.as_str()).or_default().push(edge);
      reverse_adjacency
        .entry(edge.target.as_str())
        .or_default()
        .push(edge);
    }

    Self {
      nodes,
      adjacency,
      reverse_adjacency,
    }
  }

  pub fn get_node(&self, node_id: &str) -> Option<&'a FlowNode> {
    self.nodes.get(node_id).copied()
  }

  /// Outgoing edges of a node, in definition order.
  pub fn outgoing(&self, node_id: &str) -> &[&'a FlowEdge] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Incoming edges of a node.
  pub fn incoming(&self, node_id: &str) -> &[&'a FlowEdge] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// The first edge leaving `node_id` through the given branch handle.
  pub fn branch_edge(&self, node_id: &str, branch_id: &str) -> Option<&'a FlowEdge> {
    self
      .outgoing(node_id)
      .iter()
      .find(|e| e.source_handle.as_deref() == Some(branch_id))
      .copied()
  }

  /// Targets of all outgoing edges that resolve to an existing node.
  pub fn downstream(&self, node_id: &str) -> Vec<&'a FlowNode> {
    self
      .outgoing(node_id)
      .iter()
      .filter_map(|e| self.get_node(&e.target))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ledgerflow_config::{
    ActionEnrollData, FlowStatus, NodeData, TriggerData, TriggerFilters, TriggerType,
  };

  fn action(id: &str) -> FlowNode {
    FlowNode::new(
      id,
      NodeData::ActionEnroll(ActionEnrollData {
        sequence: "Reminder".to_string(),
        message_preview: String::new(),
      }),
    )
  }

  fn flow() -> FlowDefinition {
    FlowDefinition {
      id: "flow".to_string(),
      org_id: "org".to_string(),
      name: "Test".to_string(),
      status: FlowStatus::Active,
      nodes: vec![
        FlowNode::new(
          "t1",
          NodeData::Trigger(TriggerData {
            trigger_type: TriggerType::InvoiceOverdue,
            filters: TriggerFilters::default(),
          }),
        ),
        action("a1"),
        action("a2"),
      ],
      edges: vec![
        FlowEdge::new("e1", "t1", "a1"),
        FlowEdge::new("e2", "t1", "ghost"),
        FlowEdge::new("e3", "t1", "a2"),
        FlowEdge::branch("e4", "s1", "high", "a1"),
      ],
      deleted_at: None,
    }
  }

  #[test]
  fn test_outgoing_keeps_definition_order() {
    let flow = flow();
    let graph = Graph::new(&flow);
    let ids: Vec<&str> = graph.outgoing("t1").iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "e2", "e3"]);
  }

  #[test]
  fn test_downstream_skips_dangling_targets() {
    let flow = flow();
    let graph = Graph::new(&flow);
    let ids: Vec<&str> = graph.downstream("t1").iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2"]);
    assert!(graph.downstream("a1").is_empty());
  }

  #[test]
  fn test_branch_edge_and_incoming() {
    let flow = flow();
    let graph = Graph::new(&flow);
    assert_eq!(graph.branch_edge("s1", "high").unwrap().id, "e4");
    assert!(graph.branch_edge("s1", "low").is_none());
    assert_eq!(graph.incoming("a1").len(), 2);
    assert!(graph.incoming("t1").is_empty());
  }

  #[test]
  fn test_duplicate_node_first_wins() {
    let mut flow = flow();
    let mut dup = action("a1");
    dup.data = NodeData::ActionEnroll(ActionEnrollData {
      sequence: "Other".to_string(),
      message_preview: String::new(),
    });
    flow.nodes.push(dup);
    let graph = Graph::new(&flow);
    let NodeData::ActionEnroll(data) = &graph.get_node("a1").unwrap().data else {
      panic!("expected action");
    };
    assert_eq!(data.sequence, "Reminder");
  }
}
