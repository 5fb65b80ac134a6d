use std::sync::RwLock;

use async_trait::async_trait;
use ledgerflow_config::FlowDefinition;

use crate::{FlowRun, FlowStore, RunStatus, RunStore, StoreError};

/// In-memory store for flows and runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
  flows: RwLock<Vec<FlowDefinition>>,
  runs: RwLock<Vec<FlowRun>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a flow, replacing any flow with the same ID.
  pub fn insert_flow(&self, flow: FlowDefinition) -> Result<(), StoreError> {
    let mut flows = self.flows.write().map_err(|_| StoreError::LockPoisoned)?;
    match flows.iter_mut().find(|f| f.id == flow.id) {
      Some(existing) => *existing = flow,
      None => flows.push(flow),
    }
    Ok(())
  }

  /// All recorded runs, in recording order.
  pub fn runs(&self) -> Result<Vec<FlowRun>, StoreError> {
    let runs = self.runs.read().map_err(|_| StoreError::LockPoisoned)?;
    Ok(runs.clone())
  }
}

#[async_trait]
impl FlowStore for MemoryStore {
  async fn get_flow(
    &self,
    org_id: &str,
    flow_id: &str,
  ) -> Result<Option<FlowDefinition>, StoreError> {
    let flows = self.flows.read().map_err(|_| StoreError::LockPoisoned)?;
    Ok(
      flows
        .iter()
        .find(|f| f.id == flow_id && f.org_id == org_id && f.deleted_at.is_none())
        .cloned(),
    )
  }

  async fn list_active_flows(&self, org_id: &str) -> Result<Vec<FlowDefinition>, StoreError> {
    let flows = self.flows.read().map_err(|_| StoreError::LockPoisoned)?;
    Ok(
      flows
        .iter()
        .filter(|f| f.org_id == org_id && f.is_live())
        .cloned()
        .collect(),
    )
  }
}

#[async_trait]
impl RunStore for MemoryStore {
  async fn record_run(&self, run: &FlowRun) -> Result<(), StoreError> {
    let mut runs = self.runs.write().map_err(|_| StoreError::LockPoisoned)?;
    runs.push(run.clone());
    Ok(())
  }

  async fn get_run(&self, run_id: &str) -> Result<FlowRun, StoreError> {
    let runs = self.runs.read().map_err(|_| StoreError::LockPoisoned)?;
    runs
      .iter()
      .find(|r| r.id == run_id)
      .cloned()
      .ok_or_else(|| StoreError::NotFound(run_id.to_string()))
  }

  async fn update_run(&self, run: &FlowRun, prior_steps: usize) -> Result<(), StoreError> {
    let mut runs = self.runs.write().map_err(|_| StoreError::LockPoisoned)?;
    let existing = runs
      .iter_mut()
      .find(|r| r.id == run.id)
      .ok_or_else(|| StoreError::NotFound(run.id.clone()))?;
    if existing.status != RunStatus::Waiting {
      return Err(StoreError::NotWaiting(run.id.clone()));
    }
    if existing.log.len() != prior_steps {
      return Err(StoreError::Conflict(run.id.clone()));
    }
    *existing = run.clone();
    Ok(())
  }

  async fn list_runs(&self, flow_id: &str) -> Result<Vec<FlowRun>, StoreError> {
    let runs = self.runs.read().map_err(|_| StoreError::LockPoisoned)?;
    Ok(runs.iter().filter(|r| r.flow_id == flow_id).cloned().collect())
  }
}
