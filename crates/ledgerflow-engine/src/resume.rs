//! Continuing runs suspended at wait nodes.

use chrono::{DateTime, Utc};
use ledgerflow_store::{ExecutionStep, FlowRun, RunStatus, StepAction};
use ledgerflow_workflow::Graph;
use tracing::{info, instrument, warn};

use crate::engine::{FLOW_NOT_FOUND, FlowEngine};
use crate::error::EngineError;
use crate::events::RunEvent;
use crate::mode::ExecutionMode;
use crate::walker::{WalkState, drain_deferred, walk_downstream};

impl FlowEngine {
  /// Continue a waiting run from every wait whose delay has passed.
  pub async fn resume(&self, run_id: &str) -> Result<FlowRun, EngineError> {
    self.resume_due(run_id, Utc::now()).await
  }

  /// Continue a waiting run from every resume point due at `now`.
  ///
  /// The walk picks up downstream of each due wait node, earliest due first,
  /// with the run's original event. Points not yet due stay pending. Runs in
  /// a terminal status are rejected, and a concurrent resume of the same run
  /// fails with a store conflict before anything is dispatched.
  #[instrument(name = "resume_run", skip(self))]
  pub async fn resume_due(&self, run_id: &str, now: DateTime<Utc>) -> Result<FlowRun, EngineError> {
    let mut run = self.runs.get_run(run_id).await?;
    if run.status != RunStatus::Waiting {
      return Err(EngineError::RunNotWaiting {
        run_id: run.id,
        status: run.status,
      });
    }

    let (mut due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut run.pending)
      .into_iter()
      .partition(|p| p.resume_at <= now);
    due.sort_by_key(|p| p.resume_at);
    if due.is_empty() {
      info!(run_id, pending = later.len(), "no resume point due yet");
      run.pending = later;
      return Ok(run);
    }

    let flow = self.flows.get_flow(&run.org_id, &run.flow_id).await?;
    let context = run.trigger_event.clone();
    let prior_steps = run.log.len();
    let mut state = WalkState::from_log(
      run.id.clone(),
      std::mem::take(&mut run.log),
      self.config.max_steps,
      self.suspends_waits(),
    )
    .with_now(now);
    state.pending = later;
    let carried = state.pending.len();

    match &flow {
      Some(flow) => {
        let graph = Graph::new(flow);
        for point in &due {
          walk_downstream(&point.node_id, &graph, &context, ExecutionMode::Live, &mut state);
        }
        drain_deferred(&graph, &context, ExecutionMode::Live, &mut state);
      }
      None => {
        warn!(run_id, flow_id = %run.flow_id, "flow of waiting run no longer exists");
        state.pending.clear();
        state.record(ExecutionStep::new(
          run.flow_id.clone(),
          None,
          StepAction::Skipped,
          FLOW_NOT_FOUND,
        ));
      }
    }

    let run = self.recorder.update(run, prior_steps, &state).await?;

    info!(
      run_id = %run.id,
      status = %run.status,
      resumed = due.len(),
      steps = run.log.len(),
      "flow_run_resumed"
    );
    self.notifier.notify(RunEvent::RunResumed {
      run_id: run.id.clone(),
      flow_id: run.flow_id.clone(),
      status: run.status,
      steps: run.log.len(),
    });

    let new_points = state.pending.split_off(carried.min(state.pending.len()));
    self.hand_off(&run, state.dispatches, new_points).await;

    Ok(run)
  }
}
