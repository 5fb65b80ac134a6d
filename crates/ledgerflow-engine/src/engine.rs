//! Flow execution entry points.

use std::sync::Arc;

use chrono::Utc;
use ledgerflow_config::FlowDefinition;
use ledgerflow_store::{
  ExecutionStep, FlowRun, FlowStore, ResumePoint, RunStore, StepAction, TriggeredBy,
};
use ledgerflow_trigger::{FlowEventContext, TriggerMatcher};
use ledgerflow_workflow::{Graph, validate};
use tracing::{error, info, instrument, warn};

use crate::config::EngineConfig;
use crate::dispatch::{ActionDispatcher, DispatchRequest, Scheduler};
use crate::error::EngineError;
use crate::events::{ExecutionNotifier, NoopNotifier, RunEvent};
use crate::mode::ExecutionMode;
use crate::recorder::RunRecorder;
use crate::walker::{WalkState, drain_deferred, walk};

pub(crate) const FLOW_NOT_FOUND: &str = "Flow not found";

/// Executes flows against business events.
///
/// Cheap to clone; every collaborator is shared behind an `Arc`.
#[derive(Clone)]
pub struct FlowEngine {
  pub(crate) config: EngineConfig,
  pub(crate) flows: Arc<dyn FlowStore>,
  pub(crate) runs: Arc<dyn RunStore>,
  pub(crate) recorder: RunRecorder,
  pub(crate) dispatcher: Arc<dyn ActionDispatcher>,
  pub(crate) scheduler: Option<Arc<dyn Scheduler>>,
  pub(crate) notifier: Arc<dyn ExecutionNotifier>,
}

impl FlowEngine {
  /// Create an engine.
  ///
  /// Without a scheduler (see [`FlowEngine::with_scheduler`]) wait nodes do
  /// not suspend. Live runs walk past them in the same run, after the rest of
  /// the graph, earliest due time first.
  pub fn new(
    config: EngineConfig,
    flows: Arc<dyn FlowStore>,
    runs: Arc<dyn RunStore>,
    dispatcher: Arc<dyn ActionDispatcher>,
  ) -> Self {
    Self {
      config,
      flows,
      recorder: RunRecorder::new(runs.clone()),
      runs,
      dispatcher,
      scheduler: None,
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Suspend live runs at wait nodes and hand wake-ups to `scheduler`.
  pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
    self.scheduler = Some(scheduler);
    self
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub(crate) fn matcher(&self) -> TriggerMatcher {
    TriggerMatcher::new(self.config.enforce_trigger_filters)
  }

  pub(crate) fn suspends_waits(&self) -> bool {
    self.scheduler.is_some()
  }

  /// Execute one flow by ID, for manual and test runs.
  ///
  /// Returns the step log. An unknown flow yields a single `skipped` step
  /// and no run is recorded.
  #[instrument(name = "execute_flow", skip(self, context), fields(event_type = %context.event_type))]
  pub async fn execute_flow_by_id(
    &self,
    org_id: &str,
    flow_id: &str,
    mode: ExecutionMode,
    context: &FlowEventContext,
  ) -> Result<Vec<ExecutionStep>, EngineError> {
    let Some(flow) = self.flows.get_flow(org_id, flow_id).await? else {
      warn!(org_id, flow_id, "flow not found");
      return Ok(vec![ExecutionStep::new(
        flow_id,
        None,
        StepAction::Skipped,
        FLOW_NOT_FOUND,
      )]);
    };

    let run = self
      .run_flow(&flow, context, mode, TriggeredBy::Manual)
      .await?;
    Ok(run.log)
  }

  /// Walk every matching trigger of `flow`, record the run and hand off its
  /// side effects.
  #[instrument(
    name = "run_flow",
    skip(self, flow, context, mode),
    fields(org_id = %flow.org_id, flow_id = %flow.id, mode = %mode)
  )]
  pub(crate) async fn run_flow(
    &self,
    flow: &FlowDefinition,
    context: &FlowEventContext,
    mode: ExecutionMode,
    triggered_by: TriggeredBy,
  ) -> Result<FlowRun, EngineError> {
    for finding in validate(flow) {
      warn!(flow_id = %flow.id, %finding, "flow definition problem");
    }
    if context.org_id != flow.org_id {
      warn!(event_org_id = %context.org_id, "event organization differs from flow; using the flow's");
    }
    let context = FlowEventContext {
      org_id: flow.org_id.clone(),
      ..context.clone()
    };

    let started_at = Utc::now();
    let suspend = mode.is_live() && self.suspends_waits();
    let mut state = WalkState::new(FlowRun::new_id(), self.config.max_steps, suspend);
    {
      let graph = Graph::new(flow);
      let triggers = self.matcher().matching_triggers(flow, &context);
      if triggers.is_empty() {
        state.record(ExecutionStep::new(
          flow.id.clone(),
          None,
          StepAction::Skipped,
          format!("No trigger matches event '{}'", context.event_type),
        ));
      }
      for trigger in triggers {
        walk(&trigger.id, &graph, &context, mode, &mut state);
      }
      drain_deferred(&graph, &context, mode, &mut state);
    }

    let run = self
      .recorder
      .record(flow, &context, triggered_by, mode, started_at, &state)
      .await?;

    info!(
      run_id = %run.id,
      status = %run.status,
      steps = run.log.len(),
      dispatches = state.dispatches.len(),
      "flow_run_recorded"
    );
    self.notifier.notify(RunEvent::RunRecorded {
      run_id: run.id.clone(),
      flow_id: run.flow_id.clone(),
      org_id: run.org_id.clone(),
      status: run.status,
      steps: run.log.len(),
    });

    self.hand_off(&run, state.dispatches, state.pending).await;
    Ok(run)
  }

  /// Dispatch enrollments and schedule wake-ups of a recorded run.
  ///
  /// Runs in its own task so that a panicking dispatcher or scheduler cannot
  /// take the already recorded run down with it.
  pub(crate) async fn hand_off(
    &self,
    run: &FlowRun,
    dispatches: Vec<DispatchRequest>,
    points: Vec<ResumePoint>,
  ) {
    if dispatches.is_empty() && points.is_empty() {
      return;
    }
    let engine = self.clone();
    let run_id = run.id.clone();
    let handle = tokio::spawn(async move {
      engine.dispatch_all(&dispatches).await;
      engine.schedule_all(&run_id, &points).await;
    });
    if let Err(e) = handle.await {
      error!(run_id = %run.id, flow_id = %run.flow_id, error = %e, "hand_off_failed");
      self.notifier.notify(RunEvent::FlowFailed {
        flow_id: run.flow_id.clone(),
        org_id: run.org_id.clone(),
        error: format!("side effects of run {} failed: {}", run.id, e),
      });
    }
  }

  /// Send enrollment requests. Rejections are reported, never propagated.
  pub(crate) async fn dispatch_all(&self, requests: &[DispatchRequest]) {
    for request in requests {
      if let Err(e) = self.dispatcher.enqueue_sequence(request).await {
        warn!(
          run_id = %request.run_id,
          node_id = %request.node_id,
          error = %e,
          "dispatch_failed"
        );
        self.notifier.notify(RunEvent::DispatchFailed {
          run_id: request.run_id.clone(),
          node_id: request.node_id.clone(),
          error: e.to_string(),
        });
      }
    }
  }

  /// Hand wake-up requests to the scheduler. A failure leaves the run waiting.
  pub(crate) async fn schedule_all(&self, run_id: &str, points: &[ResumePoint]) {
    let Some(scheduler) = &self.scheduler else {
      return;
    };
    for point in points {
      if let Err(e) = scheduler
        .schedule_resume(run_id, &point.node_id, point.resume_at)
        .await
      {
        warn!(run_id, node_id = %point.node_id, error = %e, "schedule_failed");
      }
    }
  }
}
