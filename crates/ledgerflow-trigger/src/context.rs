use ledgerflow_config::TriggerType;
use serde::{Deserialize, Serialize};

/// Error type for trigger operations.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
  #[error("invalid event payload: {0}")]
  InvalidEvent(#[from] serde_json::Error),

  #[error("event is missing an organization id")]
  MissingOrg,
}

/// The business event being dispatched into the engine.
///
/// Immutable for the duration of one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEventContext {
  pub org_id: String,
  /// Event name, e.g. "Invoice Overdue".
  pub event_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub invoice_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub amount: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub days_overdue: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contact_tags: Option<Vec<String>>,
  /// Preferred language of the contact, e.g. "en".
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub language: Option<String>,
}

impl FlowEventContext {
  pub fn new(org_id: impl Into<String>, event_type: TriggerType) -> Self {
    Self {
      org_id: org_id.into(),
      event_type: event_type.as_str().to_string(),
      ..Self::default()
    }
  }

  pub fn from_json(json: &str) -> Result<Self, TriggerError> {
    let context: Self = serde_json::from_str(json)?;
    if context.org_id.trim().is_empty() {
      return Err(TriggerError::MissingOrg);
    }
    Ok(context)
  }

  /// The event type as a known trigger type, if it is one.
  pub fn trigger_type(&self) -> Option<TriggerType> {
    self.event_type.parse().ok()
  }
}
