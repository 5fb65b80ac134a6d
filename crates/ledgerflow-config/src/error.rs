use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
  #[error("failed to parse flow definition: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("unknown trigger type: {0}")]
  UnknownTriggerType(String),
}
