use async_trait::async_trait;
use tracing::info;

use crate::action::{Action, ActionError, ActionReport, Argument};
use crate::context::{Context, MISSING_PLACEHOLDER};
use crate::platform::Platform;

/// Prints a message, or the string stored under a context key.
///
/// An absent key prints `<missing>` instead of failing.
pub struct EchoAction {
  hint: String,
  message: Argument<String>,
  exclusivity_key: Option<String>,
}

impl EchoAction {
  pub fn new(hint: impl Into<String>, message: impl Into<Argument<String>>) -> Self {
    Self {
      hint: hint.into(),
      message: message.into(),
      exclusivity_key: None,
    }
  }

  /// Echo the value of `key`.
  pub fn key(hint: impl Into<String>, key: impl Into<String>) -> Self {
    Self::new(hint, Argument::<String>::key(key))
  }

  pub fn with_exclusivity_key(mut self, key: impl Into<String>) -> Self {
    self.exclusivity_key = Some(key.into());
    self
  }
}

#[async_trait]
impl Action for EchoAction {
  fn name(&self) -> &'static str {
    "echo"
  }

  fn description(&self) -> &'static str {
    "Prints a message or a context value"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  fn mutual_exclusivity_key(&self) -> Option<&str> {
    self.exclusivity_key.as_deref()
  }

  async fn execute(&self, context: &mut Context, _platform: Platform) -> Result<ActionReport, ActionError> {
    let message = self
      .message
      .resolve_optional(context)?
      .unwrap_or_else(|| MISSING_PLACEHOLDER.to_string());

    info!(hint = %self.hint, message = %message, "echo");
    println!("{}", message);

    Ok(ActionReport::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tracing_test::traced_test;

  #[tokio::test]
  #[traced_test]
  async fn echoes_raw_message() {
    let mut ctx = Context::new();

    EchoAction::new("greet", "hello there")
      .execute(&mut ctx, Platform::Linux)
      .await
      .unwrap();

    assert!(logs_contain("hello there"));
  }

  #[tokio::test]
  #[traced_test]
  async fn echoes_context_value() {
    let mut ctx = Context::new();
    ctx.put("version", "3.1.4".to_string());

    EchoAction::key("show", "version")
      .execute(&mut ctx, Platform::Linux)
      .await
      .unwrap();

    assert!(logs_contain("3.1.4"));
  }

  #[tokio::test]
  #[traced_test]
  async fn missing_key_echoes_placeholder() {
    let mut ctx = Context::new();

    let result = EchoAction::key("show", "absent").execute(&mut ctx, Platform::Linux).await;

    assert!(result.is_ok());
    assert!(logs_contain("<missing>"));
  }
}
