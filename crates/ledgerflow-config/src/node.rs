use serde::{Deserialize, Serialize};

use crate::enums::{NodeKind, Operator, TriggerType, WaitUnit};

/// Canvas coordinates of a node. Layout only, ignored during execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
  pub id: String,
  #[serde(default)]
  pub position: Position,
  #[serde(flatten)]
  pub data: NodeData,
}

impl FlowNode {
  pub fn new(id: impl Into<String>, data: NodeData) -> Self {
    Self {
      id: id.into(),
      position: Position::default(),
      data,
    }
  }

  pub fn kind(&self) -> NodeKind {
    self.data.kind()
  }
}

/// Variant-specific payload of a node, tagged by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NodeData {
  #[serde(rename = "trigger")]
  Trigger(TriggerData),
  #[serde(rename = "switch")]
  Switch(SwitchData),
  #[serde(rename = "action-enroll")]
  ActionEnroll(ActionEnrollData),
  #[serde(rename = "utility-wait")]
  UtilityWait(WaitData),
}

impl NodeData {
  pub fn kind(&self) -> NodeKind {
    match self {
      NodeData::Trigger(_) => NodeKind::Trigger,
      NodeData::Switch(_) => NodeKind::Switch,
      NodeData::ActionEnroll(_) => NodeKind::ActionEnroll,
      NodeData::UtilityWait(_) => NodeKind::UtilityWait,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerData {
  pub trigger_type: TriggerType,
  #[serde(default)]
  pub filters: TriggerFilters,
}

/// Optional narrowing of a trigger. Only consulted when filter enforcement
/// is switched on in the engine config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerFilters {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tag: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchData {
  /// Evaluated in order; the first matching branch wins.
  #[serde(default)]
  pub branches: Vec<Branch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
  pub id: String,
  pub name: String,
  pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
  /// Event field to read: `amount`, `days_overdue` or `tag`.
  pub field: String,
  pub operator: Operator,
  /// Literal to compare against, a JSON string or number.
  pub value: serde_json::Value,
}

impl Condition {
  /// The literal as text. Numbers keep their JSON rendering.
  pub fn value_text(&self) -> String {
    match &self.value {
      serde_json::Value::String(s) => s.clone(),
      serde_json::Value::Null => String::new(),
      other => other.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEnrollData {
  /// Name of the message sequence the contact is enrolled in.
  pub sequence: String,
  #[serde(default)]
  pub message_preview: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitData {
  pub duration: u32,
  pub unit: WaitUnit,
}

impl WaitData {
  pub fn total_hours(&self) -> i64 {
    i64::from(self.duration) * self.unit.hours()
  }

  /// Human readable delay, e.g. "3 days".
  pub fn describe(&self) -> String {
    let unit = match (self.unit, self.duration) {
      (WaitUnit::Hours, 1) => "hour",
      (WaitUnit::Hours, _) => "hours",
      (WaitUnit::Days, 1) => "day",
      (WaitUnit::Days, _) => "days",
    };
    format!("{} {}", self.duration, unit)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_switch_node() {
    let node: FlowNode = serde_json::from_value(json!({
      "id": "switch-1",
      "type": "switch",
      "position": { "x": 120.0, "y": 40.0 },
      "data": {
        "branches": [
          {
            "id": "high",
            "name": "High balance",
            "condition": { "field": "amount", "operator": ">", "value": 1000 }
          }
        ]
      }
    }))
    .unwrap();

    assert_eq!(node.kind(), NodeKind::Switch);
    let NodeData::Switch(switch) = &node.data else {
      panic!("expected switch data");
    };
    assert_eq!(switch.branches[0].condition.operator, Operator::GreaterThan);
    assert_eq!(switch.branches[0].condition.value_text(), "1000");
  }

  #[test]
  fn test_parse_trigger_without_filters() {
    let node: FlowNode = serde_json::from_value(json!({
      "id": "t1",
      "type": "trigger",
      "data": { "triggerType": "Payment Failed" }
    }))
    .unwrap();

    assert_eq!(node.position, Position::default());
    assert_eq!(
      node.data,
      NodeData::Trigger(TriggerData {
        trigger_type: TriggerType::PaymentFailed,
        filters: TriggerFilters::default(),
      })
    );
  }

  #[test]
  fn test_action_node_serializes_kebab_kind() {
    let node = FlowNode::new(
      "a1",
      NodeData::ActionEnroll(ActionEnrollData {
        sequence: "Final Notice".to_string(),
        message_preview: "Your invoice is overdue".to_string(),
      }),
    );
    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["type"], "action-enroll");
    assert_eq!(value["data"]["messagePreview"], "Your invoice is overdue");
  }

  #[test]
  fn test_wait_describe() {
    let wait = WaitData {
      duration: 1,
      unit: WaitUnit::Days,
    };
    assert_eq!(wait.describe(), "1 day");
    assert_eq!(wait.total_hours(), 24);

    let wait = WaitData {
      duration: 6,
      unit: WaitUnit::Hours,
    };
    assert_eq!(wait.describe(), "6 hours");
  }
}
