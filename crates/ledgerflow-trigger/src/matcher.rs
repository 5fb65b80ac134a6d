use ledgerflow_config::{FlowDefinition, FlowNode, NodeData, TriggerData};

use crate::context::FlowEventContext;

/// Selects the trigger nodes of a flow that apply to an incoming event.
///
/// By default only the trigger type is compared. With `enforce_filters` the
/// trigger's tag and language filters must match the event as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerMatcher {
  enforce_filters: bool,
}

impl TriggerMatcher {
  pub fn new(enforce_filters: bool) -> Self {
    Self { enforce_filters }
  }

  /// Check a single trigger against the event.
  pub fn matches(&self, trigger: &TriggerData, context: &FlowEventContext) -> bool {
    if trigger.trigger_type.as_str() != context.event_type {
      return false;
    }
    if !self.enforce_filters {
      return true;
    }

    let tag_ok = match trigger.filters.tag.as_deref().map(str::trim) {
      None | Some("") => true,
      Some(tag) => context
        .contact_tags
        .iter()
        .flatten()
        .any(|t| t.eq_ignore_ascii_case(tag)),
    };
    let language_ok = match trigger.filters.language.as_deref().map(str::trim) {
      None | Some("") => true,
      Some(language) => context
        .language
        .as_deref()
        .is_some_and(|l| l.eq_ignore_ascii_case(language)),
    };

    tag_ok && language_ok
  }

  /// Trigger nodes of `flow` that match the event, in node order.
  pub fn matching_triggers<'a>(
    &self,
    flow: &'a FlowDefinition,
    context: &FlowEventContext,
  ) -> Vec<&'a FlowNode> {
    flow
      .nodes
      .iter()
      .filter(|node| match &node.data {
        NodeData::Trigger(trigger) => self.matches(trigger, context),
        _ => false,
      })
      .collect()
  }

  pub fn has_matching_trigger(&self, flow: &FlowDefinition, context: &FlowEventContext) -> bool {
    !self.matching_triggers(flow, context).is_empty()
  }
}
