//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerflow_config::{
  ActionEnrollData, Branch, Condition, FlowDefinition, FlowEdge, FlowNode, FlowStatus, NodeData,
  Operator, SwitchData, TriggerData, TriggerFilters, TriggerType, WaitData, WaitUnit,
};
use ledgerflow_engine::{
  ActionDispatcher, DispatchError, DispatchRequest, EngineConfig, FlowEngine, Scheduler,
  SchedulerError,
};
use ledgerflow_store::MemoryStore;
use serde_json::json;

/// Dispatcher that remembers every request and rejects or panics on demand.
#[derive(Default)]
pub struct RecordingDispatcher {
  pub requests: Mutex<Vec<DispatchRequest>>,
  pub reject_sequence: Option<String>,
  pub panic_sequence: Option<String>,
}

impl RecordingDispatcher {
  pub fn sequences(&self) -> Vec<String> {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .map(|r| r.sequence.clone())
      .collect()
  }
}

#[async_trait]
impl ActionDispatcher for RecordingDispatcher {
  async fn enqueue_sequence(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
    if self.panic_sequence.as_deref() == Some(request.sequence.as_str()) {
      panic!("dispatcher crashed on {}", request.sequence);
    }
    if self.reject_sequence.as_deref() == Some(request.sequence.as_str()) {
      return Err(DispatchError::Rejected("quiet hours".to_string()));
    }
    self.requests.lock().unwrap().push(request.clone());
    Ok(())
  }
}

#[derive(Default)]
pub struct RecordingScheduler {
  pub wakeups: Mutex<Vec<(String, String, DateTime<Utc>)>>,
}

#[async_trait]
impl Scheduler for RecordingScheduler {
  async fn schedule_resume(
    &self,
    run_id: &str,
    node_id: &str,
    resume_at: DateTime<Utc>,
  ) -> Result<(), SchedulerError> {
    self
      .wakeups
      .lock()
      .unwrap()
      .push((run_id.to_string(), node_id.to_string(), resume_at));
    Ok(())
  }
}

pub struct Harness {
  pub store: Arc<MemoryStore>,
  pub dispatcher: Arc<RecordingDispatcher>,
  pub scheduler: Arc<RecordingScheduler>,
  pub engine: FlowEngine,
}

pub fn harness_with(dispatcher: RecordingDispatcher, config: EngineConfig) -> Harness {
  let store = Arc::new(MemoryStore::new());
  let dispatcher = Arc::new(dispatcher);
  let scheduler = Arc::new(RecordingScheduler::default());
  let engine = FlowEngine::new(config, store.clone(), store.clone(), dispatcher.clone());
  Harness {
    store,
    dispatcher,
    scheduler,
    engine,
  }
}

pub fn harness() -> Harness {
  harness_with(RecordingDispatcher::default(), EngineConfig::default())
}

/// Same as [`harness`], with waits suspending through the recording scheduler.
pub fn scheduled_harness() -> Harness {
  let mut h = harness();
  h.engine = h.engine.clone().with_scheduler(h.scheduler.clone());
  h
}

pub fn trigger(id: &str, trigger_type: TriggerType) -> FlowNode {
  FlowNode::new(
    id,
    NodeData::Trigger(TriggerData {
      trigger_type,
      filters: TriggerFilters::default(),
    }),
  )
}

pub fn action(id: &str, sequence: &str) -> FlowNode {
  FlowNode::new(
    id,
    NodeData::ActionEnroll(ActionEnrollData {
      sequence: sequence.to_string(),
      message_preview: format!("Preview for {sequence}"),
    }),
  )
}

pub fn wait(id: &str, duration: u32, unit: WaitUnit) -> FlowNode {
  FlowNode::new(id, NodeData::UtilityWait(WaitData { duration, unit }))
}

pub fn switch(id: &str, branches: Vec<Branch>) -> FlowNode {
  FlowNode::new(id, NodeData::Switch(SwitchData { branches }))
}

pub fn branch(id: &str, field: &str, operator: Operator, value: serde_json::Value) -> Branch {
  Branch {
    id: id.to_string(),
    name: id.to_string(),
    condition: Condition {
      field: field.to_string(),
      operator,
      value,
    },
  }
}

pub fn flow(id: &str, org_id: &str, nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) -> FlowDefinition {
  FlowDefinition {
    id: id.to_string(),
    org_id: org_id.to_string(),
    name: format!("Flow {id}"),
    status: FlowStatus::Active,
    nodes,
    edges,
    deleted_at: None,
  }
}

/// trigger(Invoice Overdue) → switch { high: amount > 1000 → A, low: amount < 1000 → B }
pub fn tiered_overdue_flow() -> FlowDefinition {
  flow(
    "tiered",
    "org",
    vec![
      trigger("trigger", TriggerType::InvoiceOverdue),
      switch(
        "switch",
        vec![
          branch("high", "amount", Operator::GreaterThan, json!(1000)),
          branch("low", "amount", Operator::LessThan, json!(1000)),
        ],
      ),
      action("action-a", "Firm Reminder"),
      action("action-b", "Gentle Reminder"),
    ],
    vec![
      FlowEdge::new("e1", "trigger", "switch"),
      FlowEdge::branch("e2", "switch", "high", "action-a"),
      FlowEdge::branch("e3", "switch", "low", "action-b"),
    ],
  )
}

/// trigger(Payment Failed) → action → wait 2 days → action
pub fn wait_flow() -> FlowDefinition {
  flow(
    "waiting",
    "org",
    vec![
      trigger("trigger", TriggerType::PaymentFailed),
      action("first", "Payment Failed Notice"),
      wait("wait", 2, WaitUnit::Days),
      action("second", "Final Notice"),
    ],
    vec![
      FlowEdge::new("e1", "trigger", "first"),
      FlowEdge::new("e2", "first", "wait"),
      FlowEdge::new("e3", "wait", "second"),
    ],
  )
}
