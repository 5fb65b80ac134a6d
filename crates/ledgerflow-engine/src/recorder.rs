//! Turns finished walks into run records.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ledgerflow_config::FlowDefinition;
use ledgerflow_store::{FlowRun, RunStatus, RunStore, StoreError, TriggeredBy};
use ledgerflow_trigger::FlowEventContext;
use tracing::debug;

use crate::mode::ExecutionMode;
use crate::walker::WalkState;

/// Status of a run after a walk.
pub(crate) fn run_status(mode: ExecutionMode, state: &WalkState) -> RunStatus {
  if state.truncated {
    RunStatus::Truncated
  } else if !state.pending.is_empty() {
    RunStatus::Waiting
  } else {
    mode.completed_status()
  }
}

/// Persists one run record per execution.
#[derive(Clone)]
pub struct RunRecorder {
  runs: Arc<dyn RunStore>,
}

impl RunRecorder {
  pub fn new(runs: Arc<dyn RunStore>) -> Self {
    Self { runs }
  }

  /// Build the run from a finished walk and write it.
  pub async fn record(
    &self,
    flow: &FlowDefinition,
    context: &FlowEventContext,
    triggered_by: TriggeredBy,
    mode: ExecutionMode,
    started_at: DateTime<Utc>,
    state: &WalkState,
  ) -> Result<FlowRun, StoreError> {
    let status = run_status(mode, state);
    let run = FlowRun {
      id: state.run_id.clone(),
      flow_id: flow.id.clone(),
      org_id: flow.org_id.clone(),
      triggered_by,
      trigger_event: context.clone(),
      status,
      started_at,
      completed_at: status.is_terminal().then(Utc::now),
      log: state.log.clone(),
      pending: state.pending.clone(),
    };

    self.runs.record_run(&run).await?;
    debug!(run_id = %run.id, flow_id = %run.flow_id, status = %run.status, "run_recorded");
    Ok(run)
  }

  /// Write the continued state of a waiting run.
  ///
  /// `prior_steps` is the log length the continuation started from; the
  /// store refuses the write if another resume got there first.
  pub async fn update(
    &self,
    mut run: FlowRun,
    prior_steps: usize,
    state: &WalkState,
  ) -> Result<FlowRun, StoreError> {
    let status = run_status(ExecutionMode::Live, state);
    run.status = status;
    run.completed_at = status.is_terminal().then(Utc::now);
    run.log = state.log.clone();
    run.pending = state.pending.clone();

    self.runs.update_run(&run, prior_steps).await?;
    debug!(run_id = %run.id, status = %run.status, "run_updated");
    Ok(run)
  }
}
