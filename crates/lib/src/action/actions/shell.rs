use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::action::{Action, ActionError, ActionReport, Argument};
use crate::context::Context;
use crate::platform::Platform;
use crate::shell::{self, ShellOptions};

/// Runs an external command.
///
/// Arguments are resolved from the context at execution time; arguments whose
/// key is absent are left out. With [`ShellAction::capture_to`] the trimmed
/// stdout is stored as a `String` under the given key.
pub struct ShellAction {
  hint: String,
  command: String,
  arguments: Vec<Argument<String>>,
  capture_output_to_key: Option<String>,
  working_directory: Option<PathBuf>,
  exclusivity_key: Option<String>,
}

impl ShellAction {
  pub fn new(hint: impl Into<String>, command: impl Into<String>) -> Self {
    Self {
      hint: hint.into(),
      command: command.into(),
      arguments: Vec::new(),
      capture_output_to_key: None,
      working_directory: None,
      exclusivity_key: None,
    }
  }

  pub fn arg(mut self, argument: impl Into<Argument<String>>) -> Self {
    self.arguments.push(argument.into());
    self
  }

  pub fn args<I, A>(mut self, arguments: I) -> Self
  where
    I: IntoIterator<Item = A>,
    A: Into<Argument<String>>,
  {
    self.arguments.extend(arguments.into_iter().map(Into::into));
    self
  }

  pub fn capture_to(mut self, key: impl Into<String>) -> Self {
    self.capture_output_to_key = Some(key.into());
    self
  }

  pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_directory = Some(dir.into());
    self
  }

  pub fn with_exclusivity_key(mut self, key: impl Into<String>) -> Self {
    self.exclusivity_key = Some(key.into());
    self
  }
}

#[async_trait]
impl Action for ShellAction {
  fn name(&self) -> &'static str {
    "sh"
  }

  fn description(&self) -> &'static str {
    "Action to execute shell commands"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  fn mutual_exclusivity_key(&self) -> Option<&str> {
    self.exclusivity_key.as_deref()
  }

  async fn execute(&self, context: &mut Context, _platform: Platform) -> Result<ActionReport, ActionError> {
    let mut args = Vec::with_capacity(self.arguments.len());
    for argument in &self.arguments {
      match argument.resolve_optional(context)? {
        Some(value) => args.push(value),
        None => debug!(hint = %self.hint, argument = %argument, "argument not resolved, leaving it out"),
      }
    }

    let options = ShellOptions {
      cwd: self.working_directory.clone(),
      capture: self.capture_output_to_key.is_some(),
    };

    let output = shell::run_checked(&self.command, &args, &options).await?;

    if let Some(key) = &self.capture_output_to_key {
      context.put(key.clone(), output.stdout);
    }

    Ok(ActionReport::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::shell::ShellError;
  use crate::util::testutil::{echo_msg, shell_cmd};

  #[tokio::test]
  async fn captures_output_to_key() {
    let (cmd, args) = echo_msg("captured");
    let action = ShellAction::new("echo", cmd).args(args).capture_to("out");
    let mut ctx = Context::new();

    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    assert_eq!(ctx.get::<String>("out").map(String::as_str), Some("captured"));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn arguments_come_from_context() {
    let action = ShellAction::new("echo", "/bin/echo")
      .arg("version")
      .arg(Argument::<String>::key("version"))
      .arg(Argument::<String>::key("absent"))
      .capture_to("out");
    let mut ctx = Context::new();
    ctx.put("version", "1.2".to_string());

    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    assert_eq!(ctx.get::<String>("out").map(String::as_str), Some("version 1.2"));
  }

  #[tokio::test]
  async fn non_zero_exit_fails() {
    let (cmd, args) = shell_cmd("exit 1");
    let action = ShellAction::new("fail", cmd).args(args);
    let mut ctx = Context::new();

    let result = action.execute(&mut ctx, Platform::Linux).await;

    assert!(matches!(result, Err(ActionError::Shell(ShellError::Failed { .. }))));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn runs_in_working_directory() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let action = ShellAction::new("pwd", "/bin/pwd").in_dir(temp_dir.path()).capture_to("cwd");
    let mut ctx = Context::new();

    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    let cwd = ctx.get_cloned::<String>("cwd").unwrap();
    assert_eq!(
      std::fs::canonicalize(cwd).unwrap(),
      std::fs::canonicalize(temp_dir.path()).unwrap()
    );
  }
}
