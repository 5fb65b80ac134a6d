//! Event runner with channel-based dispatching.
//!
//! The `EventRunner` owns an mpsc channel of business events and fans each
//! one out through the `FlowEngine`.

use ledgerflow_trigger::FlowEventContext;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::FlowEngine;
use crate::error::EngineError;
use crate::mode::ExecutionMode;

/// A runner that executes flows in response to events.
///
/// # Usage
///
/// ```ignore
/// let runner = EventRunner::new(engine, ExecutionMode::Live);
///
/// // Get sender for event producers (webhooks, billing jobs, etc.)
/// let sender = runner.sender();
///
/// // Start the loop; it ends on cancellation or once every sender is dropped
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await?;
/// ```
pub struct EventRunner {
  sender: mpsc::Sender<FlowEventContext>,
  receiver: mpsc::Receiver<FlowEventContext>,
  engine: FlowEngine,
  mode: ExecutionMode,
}

impl EventRunner {
  pub fn new(engine: FlowEngine, mode: ExecutionMode) -> Self {
    Self::with_buffer_size(engine, mode, 100)
  }

  pub fn with_buffer_size(engine: FlowEngine, mode: ExecutionMode, buffer_size: usize) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      engine,
      mode,
    }
  }

  /// Get a sender handle for submitting events.
  pub fn sender(&self) -> mpsc::Sender<FlowEventContext> {
    self.sender.clone()
  }

  /// Submit an event through the channel.
  pub async fn submit(&self, event: FlowEventContext) -> Result<(), EngineError> {
    self
      .sender
      .send(event)
      .await
      .map_err(|_| EngineError::ChannelClosed)
  }

  /// Start the event loop.
  ///
  /// Runs until the cancellation token is triggered or every sender handle
  /// has been dropped and the queue is drained.
  pub async fn start(self, cancel: CancellationToken) -> Result<(), EngineError> {
    let Self {
      sender,
      mut receiver,
      engine,
      mode,
    } = self;
    // Only external handles keep the channel open from here on.
    drop(sender);

    info!(mode = %mode, "starting event runner");

    loop {
      tokio::select! {
          _ = cancel.cancelled() => {
              info!("event runner cancelled");
              break;
          }
          event = receiver.recv() => {
              let Some(event) = event else {
                  info!("event runner channel closed");
                  break;
              };

              match engine.execute_flows_for_event(&event, mode).await {
                  Ok(run_ids) => {
                      info!(
                          org_id = %event.org_id,
                          event_type = %event.event_type,
                          runs = run_ids.len(),
                          "event dispatched"
                      );
                  }
                  Err(e) => {
                      error!(
                          org_id = %event.org_id,
                          event_type = %event.event_type,
                          error = %e,
                          "event dispatch failed"
                      );
                  }
              }
          }
      }
    }

    Ok(())
  }

  pub fn engine(&self) -> &FlowEngine {
    &self.engine
  }
}
