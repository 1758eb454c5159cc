use async_trait::async_trait;
use tracing::debug;

use crate::context::Context;
use crate::platform::Platform;

use super::{Action, ActionError, ActionReport, run_gated};

pub type Predicate = Box<dyn Fn(&Context, Platform) -> bool + Send + Sync>;

/// Runs `then_action` when the predicate holds, `else_action` otherwise.
///
/// Without an else branch a false predicate is a successful no-op. The chosen
/// branch goes through the usual gates, and its rows stand in for the
/// conditional's own.
pub struct ConditionalAction {
  hint: String,
  predicate: Predicate,
  then_action: Box<dyn Action>,
  else_action: Option<Box<dyn Action>>,
}

impl ConditionalAction {
  pub fn new<F>(hint: impl Into<String>, predicate: F, then_action: Box<dyn Action>) -> Self
  where
    F: Fn(&Context, Platform) -> bool + Send + Sync + 'static,
  {
    Self {
      hint: hint.into(),
      predicate: Box::new(predicate),
      then_action,
      else_action: None,
    }
  }

  pub fn otherwise(mut self, else_action: Box<dyn Action>) -> Self {
    self.else_action = Some(else_action);
    self
  }
}

#[async_trait]
impl Action for ConditionalAction {
  fn name(&self) -> &'static str {
    "conditional"
  }

  fn description(&self) -> &'static str {
    "Executes an action only if a condition is met, with optional else action"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  async fn execute(&self, context: &mut Context, platform: Platform) -> Result<ActionReport, ActionError> {
    let holds = (self.predicate)(context, platform);
    debug!(hint = %self.hint, holds, "evaluated condition");

    let branch = if holds {
      Some(self.then_action.as_ref())
    } else {
      self.else_action.as_deref()
    };

    let Some(branch) = branch else {
      return Ok(ActionReport::children(Vec::new()));
    };

    let rows = run_gated(branch, context, platform).await?.unwrap_or_default();
    Ok(ActionReport::children(rows))
  }
}
