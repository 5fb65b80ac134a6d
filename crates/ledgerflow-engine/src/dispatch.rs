//! Side-effect boundaries of the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A request to enroll a contact in a message sequence.
///
/// Produced by live walks over action nodes and handed to the
/// [`ActionDispatcher`] once the run is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
  pub run_id: String,
  pub org_id: String,
  pub node_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub invoice_id: Option<String>,
  pub sequence: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
  /// The dispatcher refused the enrollment (consent, quiet hours, caps...).
  #[error("dispatch rejected: {0}")]
  Rejected(String),

  #[error("dispatcher unavailable: {0}")]
  Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
  #[error("failed to schedule resume: {0}")]
  Unavailable(String),
}

/// Sends sequence enrollments to the messaging subsystem.
///
/// The engine does not deduplicate requests, so implementations should
/// tolerate receiving the same enrollment twice.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
  async fn enqueue_sequence(&self, request: &DispatchRequest) -> Result<(), DispatchError>;
}

/// Wakes suspended runs once their wait has elapsed.
///
/// Implementations call back into [`crate::FlowEngine::resume`] at or after
/// `resume_at`.
#[async_trait]
pub trait Scheduler: Send + Sync {
  async fn schedule_resume(
    &self,
    run_id: &str,
    node_id: &str,
    resume_at: DateTime<Utc>,
  ) -> Result<(), SchedulerError>;
}

/// A dispatcher that only logs enrollments.
#[derive(Debug, Clone, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl ActionDispatcher for LoggingDispatcher {
  async fn enqueue_sequence(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
    info!(
      run_id = %request.run_id,
      org_id = %request.org_id,
      node_id = %request.node_id,
      contact_id = ?request.contact_id,
      sequence = %request.sequence,
      "sequence_enqueued"
    );
    Ok(())
  }
}

/// A scheduler that only logs wake-up requests.
///
/// Runs stay waiting until resumed by hand (`ledgerflow resume <run_id>`).
#[derive(Debug, Clone, Default)]
pub struct LoggingScheduler;

#[async_trait]
impl Scheduler for LoggingScheduler {
  async fn schedule_resume(
    &self,
    run_id: &str,
    node_id: &str,
    resume_at: DateTime<Utc>,
  ) -> Result<(), SchedulerError> {
    info!(
      run_id = %run_id,
      node_id = %node_id,
      resume_at = %resume_at.to_rfc3339(),
      "resume_scheduled"
    );
    Ok(())
  }
}
