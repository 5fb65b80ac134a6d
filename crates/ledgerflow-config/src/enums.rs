use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Lifecycle status of a flow definition. Only `Active` flows receive events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowStatus {
  Draft,
  Active,
  Paused,
}

impl FlowStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      FlowStatus::Draft => "DRAFT",
      FlowStatus::Active => "ACTIVE",
      FlowStatus::Paused => "PAUSED",
    }
  }
}

/// Business events a trigger node can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerType {
  #[serde(rename = "Invoice Created")]
  InvoiceCreated,
  #[serde(rename = "Invoice Overdue")]
  InvoiceOverdue,
  #[serde(rename = "Payment Failed")]
  PaymentFailed,
  #[serde(rename = "No Reply After X Days")]
  NoReplyAfterDays,
}

impl TriggerType {
  /// The event type string carried by incoming events.
  pub fn as_str(&self) -> &'static str {
    match self {
      TriggerType::InvoiceCreated => "Invoice Created",
      TriggerType::InvoiceOverdue => "Invoice Overdue",
      TriggerType::PaymentFailed => "Payment Failed",
      TriggerType::NoReplyAfterDays => "No Reply After X Days",
    }
  }
}

impl fmt::Display for TriggerType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TriggerType {
  type Err = ModelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Invoice Created" => Ok(TriggerType::InvoiceCreated),
      "Invoice Overdue" => Ok(TriggerType::InvoiceOverdue),
      "Payment Failed" => Ok(TriggerType::PaymentFailed),
      "No Reply After X Days" => Ok(TriggerType::NoReplyAfterDays),
      other => Err(ModelError::UnknownTriggerType(other.to_string())),
    }
  }
}

/// Comparison operator of a switch branch condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
  #[serde(rename = ">")]
  GreaterThan,
  #[serde(rename = "<")]
  LessThan,
  #[serde(rename = "=")]
  Equals,
  #[serde(rename = "contains")]
  Contains,
}

impl fmt::Display for Operator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Operator::GreaterThan => ">",
      Operator::LessThan => "<",
      Operator::Equals => "=",
      Operator::Contains => "contains",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUnit {
  Hours,
  Days,
}

impl WaitUnit {
  /// Length of one unit in hours.
  pub fn hours(&self) -> i64 {
    match self {
      WaitUnit::Hours => 1,
      WaitUnit::Days => 24,
    }
  }
}

/// Discriminant of [`crate::NodeData`], recorded on every execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
  #[serde(rename = "trigger")]
  Trigger,
  #[serde(rename = "switch")]
  Switch,
  #[serde(rename = "action-enroll")]
  ActionEnroll,
  #[serde(rename = "utility-wait")]
  UtilityWait,
}

impl NodeKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      NodeKind::Trigger => "trigger",
      NodeKind::Switch => "switch",
      NodeKind::ActionEnroll => "action-enroll",
      NodeKind::UtilityWait => "utility-wait",
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
