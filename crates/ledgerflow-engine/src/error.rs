//! Engine errors.

use ledgerflow_store::{RunStatus, StoreError};

/// Errors surfaced to callers of the engine.
///
/// Problems inside a flow (dangling edges, unmatched conditions, rejected
/// dispatches) end up in the run log instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// Flow or run storage failed.
  #[error("storage error: {0}")]
  Store(#[from] StoreError),

  /// Only waiting runs can be resumed.
  #[error("run '{run_id}' is {status} and cannot be resumed")]
  RunNotWaiting { run_id: String, status: RunStatus },

  /// The event runner channel was closed.
  #[error("event runner channel closed")]
  ChannelClosed,
}
