//! Org-wide event fan-out.

use ledgerflow_config::FlowDefinition;
use ledgerflow_store::TriggeredBy;
use ledgerflow_trigger::{FlowEventContext, TriggerMatcher};
use tracing::{error, info, instrument};

use crate::engine::FlowEngine;
use crate::error::EngineError;
use crate::events::RunEvent;
use crate::mode::ExecutionMode;

/// Keep the live flows of the event's organization that have a matching trigger.
pub fn select_flows(
  flows: Vec<FlowDefinition>,
  context: &FlowEventContext,
  matcher: &TriggerMatcher,
) -> Vec<FlowDefinition> {
  flows
    .into_iter()
    .filter(|f| f.org_id == context.org_id && f.is_live())
    .filter(|f| matcher.has_matching_trigger(f, context))
    .collect()
}

impl FlowEngine {
  /// Run every active flow of the event's organization that reacts to it.
  ///
  /// Each flow runs in its own task. A flow that fails or panics is logged
  /// and left out of the result; the others are unaffected. Returns the IDs
  /// of the recorded runs, in flow order.
  #[instrument(
    name = "execute_flows_for_event",
    skip(self, context),
    fields(org_id = %context.org_id, event_type = %context.event_type)
  )]
  pub async fn execute_flows_for_event(
    &self,
    context: &FlowEventContext,
    mode: ExecutionMode,
  ) -> Result<Vec<String>, EngineError> {
    let flows = self.flows.list_active_flows(&context.org_id).await?;
    let selected = select_flows(flows, context, &self.matcher());

    info!(flows = selected.len(), "dispatching event to flows");

    let (flow_ids, handles): (Vec<_>, Vec<_>) = selected
      .into_iter()
      .map(|flow| {
        let engine = self.clone();
        let context = context.clone();
        let flow_id = flow.id.clone();
        let handle = tokio::spawn(async move {
          engine
            .run_flow(&flow, &context, mode, TriggeredBy::Event)
            .await
        });
        (flow_id, handle)
      })
      .unzip();

    let results = futures::future::join_all(handles).await;

    let mut run_ids = Vec::with_capacity(results.len());
    for (flow_id, result) in flow_ids.into_iter().zip(results) {
      let error = match result {
        Ok(Ok(run)) => {
          run_ids.push(run.id);
          continue;
        }
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("flow task failed: {}", e),
      };

      error!(flow_id = %flow_id, error = %error, "flow_failed");
      self.notifier.notify(RunEvent::FlowFailed {
        flow_id,
        org_id: context.org_id.clone(),
        error,
      });
    }

    Ok(run_ids)
  }
}
