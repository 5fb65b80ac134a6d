//! Depth-first graph traversal.
//!
//! The walker is synchronous and side-effect free. Everything a walk
//! produces (the step log, enrollments to dispatch, waits to resume) is
//! collected in the caller-owned [`WalkState`], so concurrent walks share
//! nothing.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use ledgerflow_config::{FlowNode, NodeData, WaitData};
use ledgerflow_store::{ExecutionStep, ResumePoint, StepAction};
use ledgerflow_trigger::FlowEventContext;
use ledgerflow_workflow::Graph;

use crate::condition;
use crate::dispatch::DispatchRequest;
use crate::mode::ExecutionMode;

/// Per-run traversal state.
#[derive(Debug, Clone)]
pub struct WalkState {
  pub run_id: String,
  pub log: Vec<ExecutionStep>,
  /// Nodes entered during this run, across resumptions.
  pub visited: HashSet<String>,
  pub dispatches: Vec<DispatchRequest>,
  pub pending: Vec<ResumePoint>,
  /// Waits passed without suspending, walked by [`drain_deferred`].
  deferred: Vec<ResumePoint>,
  /// Set once the step limit is hit; the walk stops everywhere.
  pub truncated: bool,
  max_steps: usize,
  suspend_waits: bool,
  now: DateTime<Utc>,
}

impl WalkState {
  /// State for a fresh run.
  ///
  /// With `suspend_waits` the walk stops at wait nodes and records a resume
  /// point instead of continuing downstream.
  pub fn new(run_id: impl Into<String>, max_steps: usize, suspend_waits: bool) -> Self {
    Self {
      run_id: run_id.into(),
      log: Vec::new(),
      visited: HashSet::new(),
      dispatches: Vec::new(),
      pending: Vec::new(),
      deferred: Vec::new(),
      truncated: false,
      max_steps,
      suspend_waits,
      now: Utc::now(),
    }
  }

  /// State continuing an existing log. Nodes already in the log count as visited.
  pub fn from_log(
    run_id: impl Into<String>,
    log: Vec<ExecutionStep>,
    max_steps: usize,
    suspend_waits: bool,
  ) -> Self {
    let visited = log
      .iter()
      .filter(|step| step.node_kind.is_some())
      .map(|step| step.node_id.clone())
      .collect();
    Self {
      log,
      visited,
      ..Self::new(run_id, max_steps, suspend_waits)
    }
  }

  /// Base time for wait due dates.
  pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
    self.now = now;
    self
  }

  /// Append a step. Returns false, after logging the truncation, once the
  /// step limit is reached.
  pub fn record(&mut self, step: ExecutionStep) -> bool {
    if self.truncated {
      return false;
    }
    if self.log.len() >= self.max_steps {
      self.truncated = true;
      self.pending.clear();
      self.deferred.clear();
      self.log.push(ExecutionStep::new(
        step.node_id,
        None,
        StepAction::Skipped,
        format!("Step limit of {} reached; run truncated", self.max_steps),
      ));
      return false;
    }
    self.log.push(step);
    true
  }

  /// Node ids in the order they were logged, without consecutive repeats.
  pub fn visitation(&self) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::new();
    for step in &self.log {
      if ids.last() != Some(&step.node_id.as_str()) {
        ids.push(&step.node_id);
      }
    }
    ids
  }
}

fn step(node: &FlowNode, action: StepAction, detail: impl Into<String>) -> ExecutionStep {
  ExecutionStep::new(node.id.clone(), Some(node.kind()), action, detail)
}

/// Walk the graph from `node_id`, appending to `state`.
///
/// A missing node ends the path without a step. A node already visited in
/// this run gets a `skipped` step and is not entered again.
pub fn walk(
  node_id: &str,
  graph: &Graph<'_>,
  context: &FlowEventContext,
  mode: ExecutionMode,
  state: &mut WalkState,
) {
  if state.truncated {
    return;
  }
  let Some(node) = graph.get_node(node_id) else {
    return;
  };
  if !state.visited.insert(node.id.clone()) {
    state.record(step(
      node,
      StepAction::Skipped,
      "Already visited in this run; path stopped",
    ));
    return;
  }

  match &node.data {
    NodeData::Trigger(trigger) => {
      let detail = format!("Trigger matched: {}", trigger.trigger_type);
      if state.record(step(node, StepAction::Evaluated, detail)) {
        walk_downstream(&node.id, graph, context, mode, state);
      }
    }
    NodeData::Switch(switch) => {
      let detail = format!("Evaluating {} branch(es)", switch.branches.len());
      if !state.record(step(node, StepAction::Evaluated, detail)) {
        return;
      }
      for branch in &switch.branches {
        let reason = condition::describe(&branch.condition, context);
        if condition::evaluate(branch, context) {
          let detail = format!("Branch '{}' matched: {}", branch.name, reason);
          if !state.record(step(node, StepAction::Matched, detail)) {
            return;
          }
          if let Some(edge) = graph.branch_edge(&node.id, &branch.id) {
            walk(&edge.target, graph, context, mode, state);
          }
          return;
        }
        let detail = format!("Branch '{}' did not match: {}", branch.name, reason);
        if !state.record(step(node, StepAction::Skipped, detail)) {
          return;
        }
      }
    }
    NodeData::ActionEnroll(action) => {
      let recorded = match mode {
        ExecutionMode::Live => {
          let detail = format!("Enrollment in sequence '{}' enqueued", action.sequence);
          let recorded = state.record(step(node, StepAction::Enqueued, detail));
          if recorded {
            state.dispatches.push(DispatchRequest {
              run_id: state.run_id.clone(),
              org_id: context.org_id.clone(),
              node_id: node.id.clone(),
              contact_id: context.contact_id.clone(),
              invoice_id: context.invoice_id.clone(),
              sequence: action.sequence.clone(),
            });
          }
          recorded
        }
        ExecutionMode::DryRun => {
          let detail = format!(
            "[Dry run] Would enroll contact in sequence '{}'; nothing dispatched",
            action.sequence
          );
          state.record(step(node, StepAction::Executed, detail))
        }
      };
      if recorded {
        walk_downstream(&node.id, graph, context, mode, state);
      }
    }
    NodeData::UtilityWait(wait) => {
      let Some(resume_at) = wait_until(state.now, wait) else {
        let detail = format!("Wait of {} is out of range; path stopped", wait.describe());
        state.record(step(node, StepAction::Skipped, detail));
        return;
      };
      let suspend = mode.is_live() && state.suspend_waits;
      let detail = match (mode, suspend) {
        (_, true) => format!(
          "Waiting {}; resumes at {}",
          wait.describe(),
          resume_at.to_rfc3339()
        ),
        (ExecutionMode::Live, false) => {
          format!("Waiting {}; continuing without suspension", wait.describe())
        }
        (ExecutionMode::DryRun, false) => format!("[Dry run] Would wait {}", wait.describe()),
      };
      if state.record(step(node, StepAction::Waited, detail)) {
        let point = ResumePoint {
          node_id: node.id.clone(),
          resume_at,
        };
        if suspend {
          state.pending.push(point);
        } else {
          state.deferred.push(point);
        }
      }
    }
  }
}

/// Due time of a wait started at `now`, or `None` past the representable range.
fn wait_until(now: DateTime<Utc>, wait: &WaitData) -> Option<DateTime<Utc>> {
  now.checked_add_signed(Duration::try_hours(wait.total_hours())?)
}

/// Walk every outgoing edge of `node_id`, in definition order.
pub fn walk_downstream(
  node_id: &str,
  graph: &Graph<'_>,
  context: &FlowEventContext,
  mode: ExecutionMode,
  state: &mut WalkState,
) {
  for edge in graph.outgoing(node_id) {
    if state.truncated {
      return;
    }
    walk(&edge.target, graph, context, mode, state);
  }
}

/// Continue downstream of every wait that did not suspend, earliest due
/// first, as if each had been resumed at its due time.
///
/// Waits reached while draining are queued the same way.
pub fn drain_deferred(
  graph: &Graph<'_>,
  context: &FlowEventContext,
  mode: ExecutionMode,
  state: &mut WalkState,
) {
  while !state.truncated {
    let Some(next) = state
      .deferred
      .iter()
      .enumerate()
      .min_by_key(|(_, point)| point.resume_at)
      .map(|(i, _)| i)
    else {
      break;
    };
    let point = state.deferred.remove(next);
    state.now = point.resume_at;
    walk_downstream(&point.node_id, graph, context, mode, state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ledgerflow_config::{
    ActionEnrollData, Branch, Condition, FlowDefinition, FlowEdge, FlowStatus, NodeKind,
    Operator, SwitchData, TriggerData, TriggerFilters, TriggerType, WaitData, WaitUnit,
  };
  use serde_json::json;

  fn trigger(id: &str) -> FlowNode {
    FlowNode::new(
      id,
      NodeData::Trigger(TriggerData {
        trigger_type: TriggerType::InvoiceOverdue,
        filters: TriggerFilters::default(),
      }),
    )
  }

  fn action(id: &str, sequence: &str) -> FlowNode {
    FlowNode::new(
      id,
      NodeData::ActionEnroll(ActionEnrollData {
        sequence: sequence.to_string(),
        message_preview: String::new(),
      }),
    )
  }

  fn wait(id: &str, duration: u32) -> FlowNode {
    FlowNode::new(
      id,
      NodeData::UtilityWait(WaitData {
        duration,
        unit: WaitUnit::Days,
      }),
    )
  }

  fn amount_branch(id: &str, operator: Operator, value: i64) -> Branch {
    Branch {
      id: id.to_string(),
      name: id.to_string(),
      condition: Condition {
        field: "amount".to_string(),
        operator,
        value: json!(value),
      },
    }
  }

  fn flow(nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) -> FlowDefinition {
    FlowDefinition {
      id: "flow".to_string(),
      org_id: "org".to_string(),
      name: "Test".to_string(),
      status: FlowStatus::Active,
      nodes,
      edges,
      deleted_at: None,
    }
  }

  fn tiered_flow() -> FlowDefinition {
    flow(
      vec![
        trigger("t"),
        FlowNode::new(
          "s",
          NodeData::Switch(SwitchData {
            branches: vec![
              amount_branch("high", Operator::GreaterThan, 1000),
              amount_branch("mid", Operator::GreaterThan, 100),
            ],
          }),
        ),
        action("a-high", "Firm"),
        action("a-mid", "Gentle"),
      ],
      vec![
        FlowEdge::new("e1", "t", "s"),
        FlowEdge::branch("e2", "s", "high", "a-high"),
        FlowEdge::branch("e3", "s", "mid", "a-mid"),
      ],
    )
  }

  fn context(amount: f64) -> FlowEventContext {
    FlowEventContext {
      amount: Some(amount),
      contact_id: Some("c-1".to_string()),
      ..FlowEventContext::new("org", TriggerType::InvoiceOverdue)
    }
  }

  fn run(
    flow: &FlowDefinition,
    ctx: &FlowEventContext,
    mode: ExecutionMode,
    suspend: bool,
  ) -> WalkState {
    let graph = Graph::new(flow);
    let mut state = WalkState::new("run", 100, suspend);
    walk("t", &graph, ctx, mode, &mut state);
    drain_deferred(&graph, ctx, mode, &mut state);
    state
  }

  fn actions(state: &WalkState) -> Vec<(&str, StepAction)> {
    state
      .log
      .iter()
      .map(|s| (s.node_id.as_str(), s.action))
      .collect()
  }

  #[test]
  fn test_first_matching_branch_wins() {
    let flow = tiered_flow();
    let state = run(&flow, &context(5000.0), ExecutionMode::Live, false);

    assert_eq!(
      actions(&state),
      vec![
        ("t", StepAction::Evaluated),
        ("s", StepAction::Evaluated),
        ("s", StepAction::Matched),
        ("a-high", StepAction::Enqueued),
      ]
    );
    assert_eq!(state.dispatches.len(), 1);
    assert_eq!(state.dispatches[0].sequence, "Firm");
    assert_eq!(state.dispatches[0].contact_id.as_deref(), Some("c-1"));
  }

  #[test]
  fn test_skipped_branches_before_match() {
    let flow = tiered_flow();
    let state = run(&flow, &context(500.0), ExecutionMode::DryRun, false);

    assert_eq!(
      actions(&state),
      vec![
        ("t", StepAction::Evaluated),
        ("s", StepAction::Evaluated),
        ("s", StepAction::Skipped),
        ("s", StepAction::Matched),
        ("a-mid", StepAction::Executed),
      ]
    );
    assert!(state.log[2].detail.contains("'high' did not match"));
    assert!(state.log[4].detail.starts_with("[Dry run]"));
    assert!(state.dispatches.is_empty());
  }

  #[test]
  fn test_no_branch_matches_stops_walk() {
    let flow = tiered_flow();
    let state = run(&flow, &context(50.0), ExecutionMode::Live, false);

    assert_eq!(state.log.len(), 4);
    assert_eq!(
      state
        .log
        .iter()
        .filter(|s| s.action == StepAction::Skipped)
        .count(),
      2
    );
    assert!(state.dispatches.is_empty());
  }

  #[test]
  fn test_matched_branch_without_edge_ends_path() {
    let mut flow = tiered_flow();
    flow.edges.retain(|e| e.id != "e2");
    let state = run(&flow, &context(5000.0), ExecutionMode::Live, false);
    assert_eq!(state.log.last().unwrap().action, StepAction::Matched);
  }

  #[test]
  fn test_dangling_edges_end_path_silently() {
    let flow = flow(
      vec![trigger("t"), action("a", "Reminder")],
      vec![
        FlowEdge::new("e1", "t", "missing"),
        FlowEdge::new("e2", "t", "a"),
        FlowEdge::new("e3", "a", "also-missing"),
      ],
    );
    let state = run(&flow, &context(1.0), ExecutionMode::Live, false);
    assert_eq!(state.visitation(), vec!["t", "a"]);
    assert!(!state.truncated);
  }

  #[test]
  fn test_cycle_is_cut() {
    let flow = flow(
      vec![trigger("t"), action("a", "One"), action("b", "Two")],
      vec![
        FlowEdge::new("e1", "t", "a"),
        FlowEdge::new("e2", "a", "b"),
        FlowEdge::new("e3", "b", "a"),
      ],
    );
    let state = run(&flow, &context(1.0), ExecutionMode::Live, false);

    assert_eq!(state.log.len(), 4);
    let last = state.log.last().unwrap();
    assert_eq!(last.node_id, "a");
    assert_eq!(last.action, StepAction::Skipped);
    assert_eq!(last.node_kind, Some(NodeKind::ActionEnroll));
    assert_eq!(state.dispatches.len(), 2);
  }

  #[test]
  fn test_step_limit_truncates() {
    let flow = flow(
      vec![
        trigger("t"),
        action("a", "One"),
        action("b", "Two"),
        action("c", "Three"),
      ],
      vec![
        FlowEdge::new("e1", "t", "a"),
        FlowEdge::new("e2", "a", "b"),
        FlowEdge::new("e3", "b", "c"),
      ],
    );
    let graph = Graph::new(&flow);
    let mut state = WalkState::new("run", 2, false);
    walk("t", &graph, &context(1.0), ExecutionMode::Live, &mut state);

    assert!(state.truncated);
    assert_eq!(state.log.len(), 3);
    assert_eq!(state.log[2].node_kind, None);
    assert!(state.log[2].detail.contains("Step limit"));
    assert_eq!(state.dispatches.len(), 1);
  }

  #[test]
  fn test_wait_suspends_in_live_mode() {
    let flow = flow(
      vec![trigger("t"), wait("w", 2), action("a", "Final")],
      vec![FlowEdge::new("e1", "t", "w"), FlowEdge::new("e2", "w", "a")],
    );
    let graph = Graph::new(&flow);
    let now = Utc::now();
    let mut state = WalkState::new("run", 100, true).with_now(now);
    walk("t", &graph, &context(1.0), ExecutionMode::Live, &mut state);

    assert_eq!(state.visitation(), vec!["t", "w"]);
    assert_eq!(
      state.pending,
      vec![ResumePoint {
        node_id: "w".to_string(),
        resume_at: now + Duration::days(2),
      }]
    );

    let mut resumed = WalkState::from_log("run", state.log.clone(), 100, true);
    walk_downstream("w", &graph, &context(1.0), ExecutionMode::Live, &mut resumed);
    assert_eq!(resumed.visitation(), vec!["t", "w", "a"]);
    assert_eq!(resumed.dispatches.len(), 1);
  }

  #[test]
  fn test_wait_continues_inline_in_dry_run() {
    let flow = flow(
      vec![trigger("t"), wait("w", 2), action("a", "Final")],
      vec![FlowEdge::new("e1", "t", "w"), FlowEdge::new("e2", "w", "a")],
    );
    let state = run(&flow, &context(1.0), ExecutionMode::DryRun, true);
    assert_eq!(state.visitation(), vec!["t", "w", "a"]);
    assert!(state.pending.is_empty());
  }

  #[test]
  fn test_dry_run_walks_wait_subtree_after_siblings() {
    let flow = flow(
      vec![
        trigger("t"),
        wait("w", 1),
        action("a", "After wait"),
        action("b", "Right away"),
      ],
      vec![
        FlowEdge::new("e1", "t", "w"),
        FlowEdge::new("e2", "w", "a"),
        FlowEdge::new("e3", "t", "b"),
      ],
    );
    let dry = run(&flow, &context(1.0), ExecutionMode::DryRun, false);
    assert_eq!(dry.visitation(), vec!["t", "w", "b", "a"]);

    let graph = Graph::new(&flow);
    let mut live = WalkState::new("run", 100, true);
    walk("t", &graph, &context(1.0), ExecutionMode::Live, &mut live);
    assert_eq!(live.visitation(), vec!["t", "w", "b"]);
    let mut resumed = WalkState::from_log("run", live.log.clone(), 100, true);
    walk_downstream("w", &graph, &context(1.0), ExecutionMode::Live, &mut resumed);
    assert_eq!(resumed.visitation(), dry.visitation());
  }

  #[test]
  fn test_deferred_waits_drain_earliest_first() {
    let mut short = wait("short", 1);
    short.data = NodeData::UtilityWait(WaitData {
      duration: 3,
      unit: WaitUnit::Hours,
    });
    let flow = flow(
      vec![
        trigger("t"),
        wait("long", 2),
        short,
        action("a", "Late"),
        action("b", "Early"),
      ],
      vec![
        FlowEdge::new("e1", "t", "long"),
        FlowEdge::new("e2", "t", "short"),
        FlowEdge::new("e3", "long", "a"),
        FlowEdge::new("e4", "short", "b"),
      ],
    );
    let state = run(&flow, &context(1.0), ExecutionMode::Live, false);
    assert_eq!(state.visitation(), vec!["t", "long", "short", "b", "a"]);
    assert_eq!(state.dispatches.len(), 2);
    assert!(state.pending.is_empty());
  }

  #[test]
  fn test_out_of_range_wait_ends_path() {
    let flow = flow(
      vec![trigger("t"), wait("w", u32::MAX), action("a", "Never")],
      vec![FlowEdge::new("e1", "t", "w"), FlowEdge::new("e2", "w", "a")],
    );
    for (mode, suspend) in [
      (ExecutionMode::Live, true),
      (ExecutionMode::Live, false),
      (ExecutionMode::DryRun, false),
    ] {
      let state = run(&flow, &context(1.0), mode, suspend);
      assert_eq!(state.visitation(), vec!["t", "w"]);
      let last = state.log.last().unwrap();
      assert_eq!(last.action, StepAction::Skipped);
      assert!(last.detail.contains("out of range"));
      assert!(state.pending.is_empty());
      assert!(state.dispatches.is_empty());
    }
  }

  #[test]
  fn test_modes_visit_same_nodes() {
    let flow = tiered_flow();
    for amount in [50.0, 500.0, 5000.0] {
      let live = run(&flow, &context(amount), ExecutionMode::Live, false);
      let dry = run(&flow, &context(amount), ExecutionMode::DryRun, false);
      assert_eq!(live.visitation(), dry.visitation());
      let live_nodes: Vec<&str> = live.log.iter().map(|s| s.node_id.as_str()).collect();
      let dry_nodes: Vec<&str> = dry.log.iter().map(|s| s.node_id.as_str()).collect();
      assert_eq!(live_nodes, dry_nodes);
    }
  }
}
