use async_trait::async_trait;

use crate::action::{Action, ActionError, ActionReport};
use crate::context::Context;
use crate::platform::Platform;

type AdHocFn = Box<dyn Fn(&mut Context, Platform) -> Result<(), ActionError> + Send + Sync>;

/// Wraps a closure as a step.
pub struct AdHocAction {
  hint: String,
  body: AdHocFn,
}

impl AdHocAction {
  pub fn new<F>(hint: impl Into<String>, body: F) -> Self
  where
    F: Fn(&mut Context, Platform) -> Result<(), ActionError> + Send + Sync + 'static,
  {
    Self {
      hint: hint.into(),
      body: Box::new(body),
    }
  }
}

#[async_trait]
impl Action for AdHocAction {
  fn name(&self) -> &'static str {
    "adhoc"
  }

  fn description(&self) -> &'static str {
    "Adhoc action to plug into flow"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  async fn execute(&self, context: &mut Context, platform: Platform) -> Result<ActionReport, ActionError> {
    (self.body)(context, platform)?;
    Ok(ActionReport::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn closure_mutates_context() {
    let action = AdHocAction::new("set", |ctx, platform| {
      ctx.put("platform", platform.to_string());
      Ok(())
    });
    let mut ctx = Context::new();

    action.execute(&mut ctx, Platform::MacOs).await.unwrap();

    assert_eq!(ctx.get::<String>("platform").map(String::as_str), Some("macos"));
  }

  #[tokio::test]
  async fn closure_error_propagates() {
    let action = AdHocAction::new("fail", |_, _| Err(ActionError::msg("nope")));
    let mut ctx = Context::new();

    assert!(action.execute(&mut ctx, Platform::Linux).await.is_err());
  }
}
