//! External process execution.
//!
//! Every leaf action that drives a native tool (tar, zip, cargo, arbitrary
//! shell commands) goes through [`run`] or [`run_checked`].

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ShellError {
  /// The command string was empty.
  #[error("missing command")]
  MissingCommand,

  /// The process could not be started.
  #[error("failed to spawn {command}: {source}")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },

  /// The process exited with a non-zero status.
  #[error("command failed with exit code {code:?}: {command}")]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },
}

/// Options controlling how a process is spawned.
#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
  /// Working directory; inherits the current one when `None`.
  pub cwd: Option<PathBuf>,
  /// Capture stdout/stderr instead of inheriting the parent's streams.
  pub capture: bool,
}

impl ShellOptions {
  pub fn captured() -> Self {
    Self {
      cwd: None,
      capture: true,
    }
  }

  pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
    self.cwd = Some(cwd.into());
    self
  }
}

/// Output of a finished process. Captured streams are trimmed.
#[derive(Debug, Clone)]
pub struct ShellOutput {
  pub status: ExitStatus,
  pub stdout: String,
  pub stderr: String,
}

impl ShellOutput {
  pub fn success(&self) -> bool {
    self.status.success()
  }
}

/// Run `program` with `args` and wait for it to exit.
///
/// The exit status is returned as-is; use [`run_checked`] to treat a non-zero
/// status as an error.
pub async fn run<S: AsRef<str>>(program: &str, args: &[S], options: &ShellOptions) -> Result<ShellOutput, ShellError> {
  let line = command_line(program, args);
  info!(cmd = %line, "executing command");

  let mut command = Command::new(program);
  command.args(args.iter().map(|arg| arg.as_ref()));

  if let Some(cwd) = &options.cwd {
    command.current_dir(cwd);
  }

  debug!(cwd = ?options.cwd, capture = options.capture, "spawning process");
  let spawn_failed = |source| ShellError::Spawn {
    command: line.clone(),
    source,
  };

  if !options.capture {
    // `output()` would pipe the streams; wait on the child so they stay inherited.
    let status = command
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit())
      .spawn()
      .map_err(spawn_failed)?
      .wait()
      .await
      .map_err(spawn_failed)?;

    return Ok(ShellOutput {
      status,
      stdout: String::new(),
      stderr: String::new(),
    });
  }

  let output = command
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .output()
    .await
    .map_err(spawn_failed)?;

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !stderr.is_empty() {
    debug!(stderr = %stderr, "command stderr");
  }
  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(ShellOutput {
    status: output.status,
    stdout,
    stderr,
  })
}

/// Like [`run`], but a non-zero exit status becomes [`ShellError::Failed`].
pub async fn run_checked<S: AsRef<str>>(
  program: &str,
  args: &[S],
  options: &ShellOptions,
) -> Result<ShellOutput, ShellError> {
  let output = run(program, args, options).await?;

  if !output.success() {
    return Err(ShellError::Failed {
      command: command_line(program, args),
      code: output.status.code(),
      stderr: output.stderr,
    });
  }

  Ok(output)
}

/// Split a whitespace separated command line and run it checked.
pub async fn run_line(line: &str, options: &ShellOptions) -> Result<ShellOutput, ShellError> {
  let mut parts = line.split_whitespace();
  let program = parts.next().ok_or(ShellError::MissingCommand)?;
  let args: Vec<&str> = parts.collect();
  run_checked(program, &args, options).await
}

fn command_line<S: AsRef<str>>(program: &str, args: &[S]) -> String {
  let mut line = program.to_string();
  for arg in args {
    line.push(' ');
    line.push_str(arg.as_ref());
  }
  line
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{echo_msg, shell_cmd};
  use tempfile::TempDir;

  #[tokio::test]
  async fn captures_trimmed_stdout() {
    let (cmd, args) = echo_msg("hello");

    let output = run_checked(cmd, &args, &ShellOptions::captured()).await.unwrap();

    assert_eq!(output.stdout, "hello");
    assert!(output.success());
  }

  #[tokio::test]
  async fn non_capturing_run_returns_empty_output() {
    let (cmd, args) = echo_msg("ignored");

    let output = run(cmd, &args, &ShellOptions::default()).await.unwrap();

    assert!(output.stdout.is_empty());
    assert!(output.success());
  }

  #[tokio::test]
  async fn non_capturing_run_keeps_exit_status() {
    let (cmd, args) = shell_cmd("exit 4");

    let result = run_checked(cmd, &args, &ShellOptions::default()).await;

    assert!(matches!(result, Err(ShellError::Failed { code: Some(4), ref stderr, .. }) if stderr.is_empty()));
  }

  #[tokio::test]
  async fn failure_reports_exit_code() {
    let (cmd, args) = shell_cmd("exit 3");

    let result = run_checked(cmd, &args, &ShellOptions::captured()).await;

    assert!(matches!(result, Err(ShellError::Failed { code: Some(3), .. })));
  }

  #[tokio::test]
  async fn unchecked_run_keeps_failure_status() {
    let (cmd, args) = shell_cmd("exit 2");

    let output = run(cmd, &args, &ShellOptions::captured()).await.unwrap();

    assert!(!output.success());
    assert_eq!(output.status.code(), Some(2));
  }

  #[tokio::test]
  async fn spawn_failure_is_reported() {
    let result = run_checked::<&str>("/definitely/not/a/binary", &[], &ShellOptions::captured()).await;

    assert!(matches!(result, Err(ShellError::Spawn { .. })));
  }

  #[tokio::test]
  async fn empty_line_is_missing_command() {
    let result = run_line("   ", &ShellOptions::captured()).await;

    assert!(matches!(result, Err(ShellError::MissingCommand)));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn runs_in_working_directory() {
    let temp_dir = TempDir::new().unwrap();
    let options = ShellOptions::captured().with_cwd(temp_dir.path());

    run_line("touch cwd_marker", &options).await.unwrap();

    assert!(temp_dir.path().join("cwd_marker").exists());
  }
}
