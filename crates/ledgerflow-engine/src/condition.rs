//! Switch branch conditions.
//!
//! A condition reads one field of the event and compares it with a literal:
//!
//! - `amount` → `amount`
//! - `days_overdue` → `daysOverdue`
//! - `tag` → `contactTags`
//!
//! An absent field never matches. `>`, `<` and `=` compare numerically when
//! both sides parse as numbers; otherwise `=` compares text and `contains`
//! looks for a substring. `tag contains x` matches when any single tag
//! contains `x`, ignoring case.

use ledgerflow_config::{Branch, Condition, Operator};
use ledgerflow_trigger::FlowEventContext;

/// A field value read from the event.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Actual<'a> {
  Number(f64),
  Tags(&'a [String]),
}

impl Actual<'_> {
  fn text(&self) -> String {
    match self {
      Actual::Number(n) => n.to_string(),
      Actual::Tags(tags) => tags.join(","),
    }
  }
}

fn resolve<'a>(field: &str, context: &'a FlowEventContext) -> Option<Actual<'a>> {
  match field {
    "amount" => context.amount.map(Actual::Number),
    "days_overdue" => context.days_overdue.map(|d| Actual::Number(d as f64)),
    "tag" => context.contact_tags.as_deref().map(Actual::Tags),
    _ => None,
  }
}

fn parse_number(s: &str) -> Option<f64> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Whether the branch matches the event.
pub fn evaluate(branch: &Branch, context: &FlowEventContext) -> bool {
  evaluate_condition(&branch.condition, context)
}

pub fn evaluate_condition(condition: &Condition, context: &FlowEventContext) -> bool {
  let Some(actual) = resolve(&condition.field, context) else {
    return false;
  };
  let target = condition.value_text();

  if let (Actual::Tags(tags), Operator::Contains) = (actual, condition.operator) {
    let needle = target.to_lowercase();
    return tags.iter().any(|t| t.to_lowercase().contains(&needle));
  }

  let actual_text = actual.text();
  let numbers = parse_number(&actual_text).zip(parse_number(&target));

  match condition.operator {
    Operator::GreaterThan => numbers.is_some_and(|(a, b)| a > b),
    Operator::LessThan => numbers.is_some_and(|(a, b)| a < b),
    Operator::Equals => match numbers {
      Some((a, b)) => a == b,
      None => actual_text == target,
    },
    Operator::Contains => actual_text.contains(&target),
  }
}

/// Render the condition with the value it was checked against,
/// e.g. `amount > 1000 (actual: 1500)`.
pub fn describe(condition: &Condition, context: &FlowEventContext) -> String {
  let actual = resolve(&condition.field, context)
    .map(|a| a.text())
    .unwrap_or_else(|| "missing".to_string());
  format!(
    "{} {} {} (actual: {})",
    condition.field,
    condition.operator,
    condition.value_text(),
    actual
  )
}
