//! Run events and notifiers for observability.
//!
//! Events are emitted as runs are recorded, resumed and dispatched so that
//! consumers can stream them to a UI, persist them or print them.

use ledgerflow_store::RunStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
  /// A run has been recorded.
  RunRecorded {
    run_id: String,
    flow_id: String,
    org_id: String,
    status: RunStatus,
    steps: usize,
  },

  /// A waiting run has been continued.
  RunResumed {
    run_id: String,
    flow_id: String,
    status: RunStatus,
    steps: usize,
  },

  /// The dispatcher refused an enrollment.
  DispatchFailed {
    run_id: String,
    node_id: String,
    error: String,
  },

  /// A flow could not be executed during event fan-out.
  FlowFailed {
    flow_id: String,
    org_id: String,
    error: String,
  },
}

/// Trait for receiving run events.
///
/// The engine calls `notify` for each event; implementations decide what to
/// do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: RunEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: RunEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls the engine. Volume is a
  // handful of events per run.
  sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: RunEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
