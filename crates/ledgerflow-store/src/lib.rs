//! Ledgerflow Store
//!
//! This crate provides the storage traits and implementations for flow
//! definitions and run history.
//!
//! The [`FlowStore`] trait is the read side of flow definitions. The
//! [`RunStore`] trait records one [`FlowRun`] per execution and lets a
//! waiting run be picked up again.
//!
//! Two implementations are provided:
//! - [`MemoryStore`] for tests and one-shot runs
//! - [`SqliteStore`] for persistent state

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{ExecutionStep, FlowRun, ResumePoint, RunStatus, StepAction, TriggeredBy};

use async_trait::async_trait;
use ledgerflow_config::FlowDefinition;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("not found: {0}")]
  NotFound(String),

  /// The run is not in a state that allows the update.
  #[error("run '{0}' is not waiting and cannot be updated")]
  NotWaiting(String),

  /// The run changed since it was read.
  #[error("run '{0}' was updated concurrently")]
  Conflict(String),

  /// A stored record could not be decoded.
  #[error("invalid record: {0}")]
  InvalidRecord(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store lock poisoned")]
  LockPoisoned,

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("migration failed: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Read access to flow definitions.
#[async_trait]
pub trait FlowStore: Send + Sync {
  /// Get a flow owned by `org_id`. Soft-deleted flows are not returned.
  async fn get_flow(&self, org_id: &str, flow_id: &str)
  -> Result<Option<FlowDefinition>, StoreError>;

  /// List the active, non-deleted flows of an organization.
  async fn list_active_flows(&self, org_id: &str) -> Result<Vec<FlowDefinition>, StoreError>;
}

/// Run history.
#[async_trait]
pub trait RunStore: Send + Sync {
  /// Record a new run.
  async fn record_run(&self, run: &FlowRun) -> Result<(), StoreError>;

  /// Get a run by ID.
  async fn get_run(&self, run_id: &str) -> Result<FlowRun, StoreError>;

  /// Replace a waiting run with its resumed state.
  ///
  /// `prior_steps` is the length of the log the caller read. Fails with
  /// [`StoreError::NotWaiting`] if the stored run is terminal and with
  /// [`StoreError::Conflict`] if its log no longer has that length.
  async fn update_run(&self, run: &FlowRun, prior_steps: usize) -> Result<(), StoreError>;

  /// List runs of a flow, oldest first.
  async fn list_runs(&self, flow_id: &str) -> Result<Vec<FlowRun>, StoreError>;
}
