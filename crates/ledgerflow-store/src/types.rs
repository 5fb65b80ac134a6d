use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ledgerflow_config::NodeKind;
use ledgerflow_trigger::FlowEventContext;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// What happened to a node during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
  Evaluated,
  Matched,
  Skipped,
  Executed,
  Enqueued,
  Waited,
}

/// One entry of a run's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
  pub node_id: String,
  /// Absent on engine-level steps that do not belong to a node.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub node_kind: Option<NodeKind>,
  pub action: StepAction,
  pub detail: String,
  pub timestamp: DateTime<Utc>,
}

impl ExecutionStep {
  pub fn new(
    node_id: impl Into<String>,
    node_kind: Option<NodeKind>,
    action: StepAction,
    detail: impl Into<String>,
  ) -> Self {
    Self {
      node_id: node_id.into(),
      node_kind,
      action,
      detail: detail.into(),
      timestamp: Utc::now(),
    }
  }
}

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
  Completed,
  DryRun,
  /// Suspended at one or more wait nodes.
  Waiting,
  /// Stopped at the step limit.
  Truncated,
}

impl RunStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      RunStatus::Completed => "COMPLETED",
      RunStatus::DryRun => "DRY_RUN",
      RunStatus::Waiting => "WAITING",
      RunStatus::Truncated => "TRUNCATED",
    }
  }

  pub fn is_terminal(&self) -> bool {
    !matches!(self, RunStatus::Waiting)
  }
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RunStatus {
  type Err = StoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "COMPLETED" => Ok(RunStatus::Completed),
      "DRY_RUN" => Ok(RunStatus::DryRun),
      "WAITING" => Ok(RunStatus::Waiting),
      "TRUNCATED" => Ok(RunStatus::Truncated),
      other => Err(StoreError::InvalidRecord(format!("unknown run status: {other}"))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
  /// Started explicitly for one flow (test runs, CLI).
  Manual,
  /// Started by org-wide event fan-out.
  Event,
}

impl TriggeredBy {
  pub fn as_str(&self) -> &'static str {
    match self {
      TriggeredBy::Manual => "manual",
      TriggeredBy::Event => "event",
    }
  }
}

impl FromStr for TriggeredBy {
  type Err = StoreError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "manual" => Ok(TriggeredBy::Manual),
      "event" => Ok(TriggeredBy::Event),
      other => Err(StoreError::InvalidRecord(format!("unknown trigger source: {other}"))),
    }
  }
}

/// Where a suspended run continues: downstream of `node_id` once `resume_at` has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePoint {
  /// The wait node the walk stopped at.
  pub node_id: String,
  pub resume_at: DateTime<Utc>,
}

/// A persisted record of one flow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRun {
  pub id: String,
  pub flow_id: String,
  pub org_id: String,
  pub triggered_by: TriggeredBy,
  pub trigger_event: FlowEventContext,
  pub status: RunStatus,
  pub started_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
  pub log: Vec<ExecutionStep>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub pending: Vec<ResumePoint>,
}

impl FlowRun {
  /// Generate a fresh run ID.
  pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
  }
}
