use serde::{Deserialize, Serialize};

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Upper bound on log entries per run. Reaching it truncates the run.
  pub max_steps: usize,
  /// Require trigger tag and language filters to match the event.
  pub enforce_trigger_filters: bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      max_steps: 500,
      enforce_trigger_filters: false,
    }
  }
}

impl EngineConfig {
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_fields_use_defaults() {
    let config = EngineConfig::from_json(r#"{"enforce_trigger_filters": true}"#).unwrap();
    assert_eq!(config.max_steps, 500);
    assert!(config.enforce_trigger_filters);

    assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
  }
}
