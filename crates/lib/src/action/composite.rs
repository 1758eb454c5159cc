use async_trait::async_trait;
use tracing::warn;

use crate::context::Context;
use crate::platform::Platform;

use super::{Action, ActionError, ActionReport, run_gated};

/// Builds the sub-actions of a [`CompositeAction`] for one invocation.
pub type ActionsBuilder = Box<dyn Fn(&Context, Platform) -> Vec<Box<dyn Action>> + Send + Sync>;

/// Runs a list of sub-actions in order.
///
/// The list is built from the context every time the composite executes, so
/// it can depend on values produced by earlier steps. The composite reports
/// one row per child that ran and succeeded, none of its own.
pub struct CompositeAction {
  hint: String,
  swallow_errors: bool,
  exclusivity_key: Option<String>,
  builder: ActionsBuilder,
}

impl CompositeAction {
  pub fn new<F>(hint: impl Into<String>, builder: F) -> Self
  where
    F: Fn(&Context, Platform) -> Vec<Box<dyn Action>> + Send + Sync + 'static,
  {
    Self {
      hint: hint.into(),
      swallow_errors: false,
      exclusivity_key: None,
      builder: Box::new(builder),
    }
  }

  /// Log failing sub-actions and carry on instead of aborting.
  pub fn swallow_errors(mut self) -> Self {
    self.swallow_errors = true;
    self
  }

  pub fn with_exclusivity_key(mut self, key: impl Into<String>) -> Self {
    self.exclusivity_key = Some(key.into());
    self
  }
}

#[async_trait]
impl Action for CompositeAction {
  fn name(&self) -> &'static str {
    "composite"
  }

  fn description(&self) -> &'static str {
    "Executes a series of actions in sequence"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  fn mutual_exclusivity_key(&self) -> Option<&str> {
    self.exclusivity_key.as_deref()
  }

  async fn execute(&self, context: &mut Context, platform: Platform) -> Result<ActionReport, ActionError> {
    let actions = (self.builder)(context, platform);
    let mut timings = Vec::with_capacity(actions.len());

    for action in &actions {
      match run_gated(action.as_ref(), context, platform).await {
        Ok(Some(rows)) => timings.extend(rows),
        Ok(None) => {}
        Err(e) if self.swallow_errors => {
          warn!(composite = %self.hint, child = action.hint(), error = %e, "swallowed sub-action failure");
        }
        Err(e) => return Err(e),
      }
    }

    Ok(ActionReport::children(timings))
  }
}
