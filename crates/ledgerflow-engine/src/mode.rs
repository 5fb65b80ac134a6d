use std::fmt;

use ledgerflow_store::RunStatus;
use serde::{Deserialize, Serialize};

/// How a flow is executed.
///
/// Both modes walk the graph identically. Live mode dispatches enrollments
/// and suspends at waits; dry-run only logs what would happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
  Live,
  DryRun,
}

impl ExecutionMode {
  pub fn is_live(&self) -> bool {
    matches!(self, ExecutionMode::Live)
  }

  /// Status of a run in this mode that finished without suspending or truncating.
  pub fn completed_status(&self) -> RunStatus {
    match self {
      ExecutionMode::Live => RunStatus::Completed,
      ExecutionMode::DryRun => RunStatus::DryRun,
    }
  }
}

impl fmt::Display for ExecutionMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ExecutionMode::Live => "live",
      ExecutionMode::DryRun => "dry_run",
    })
  }
}
