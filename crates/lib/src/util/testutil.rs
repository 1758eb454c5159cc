//! Test utilities for stepwise-lib.
//!
//! Cross-platform command helpers plus small actions that record or fail,
//! used to observe runner behavior without spawning processes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::action::{Action, ActionError, ActionReport};
use crate::context::Context;
use crate::platform::Platform;

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Returns the command and args to echo a message.
#[cfg(unix)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("/bin/echo", vec![msg.to_string()])
}

#[cfg(windows)]
pub fn echo_msg(msg: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo {}", msg)])
}

/// Shared log of hints, in execution order.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> ExecutionLog {
  Arc::new(Mutex::new(Vec::new()))
}

pub fn log_entries(log: &ExecutionLog) -> Vec<String> {
  log.lock().unwrap().clone()
}

/// Action that appends its hint to a shared log, optionally failing afterwards.
pub struct RecordingAction {
  hint: String,
  log: ExecutionLog,
  exclusivity_key: Option<String>,
  platforms: Option<Vec<Platform>>,
  fail: bool,
}

impl RecordingAction {
  pub fn new(hint: &str, log: &ExecutionLog) -> Self {
    Self {
      hint: hint.to_string(),
      log: log.clone(),
      exclusivity_key: None,
      platforms: None,
      fail: false,
    }
  }

  pub fn failing(hint: &str, log: &ExecutionLog) -> Self {
    Self {
      fail: true,
      ..Self::new(hint, log)
    }
  }

  pub fn with_exclusivity_key(mut self, key: &str) -> Self {
    self.exclusivity_key = Some(key.to_string());
    self
  }

  pub fn only_on(mut self, platforms: &[Platform]) -> Self {
    self.platforms = Some(platforms.to_vec());
    self
  }

  pub fn boxed(self) -> Box<dyn Action> {
    Box::new(self)
  }
}

#[async_trait]
impl Action for RecordingAction {
  fn name(&self) -> &'static str {
    "recording"
  }

  fn description(&self) -> &'static str {
    "Records its hint for tests"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  fn mutual_exclusivity_key(&self) -> Option<&str> {
    self.exclusivity_key.as_deref()
  }

  fn is_supported(&self, platform: Platform) -> bool {
    self.platforms.as_ref().is_none_or(|platforms| platforms.contains(&platform))
  }

  async fn execute(&self, _context: &mut Context, _platform: Platform) -> Result<ActionReport, ActionError> {
    self.log.lock().unwrap().push(self.hint.clone());
    if self.fail {
      return Err(ActionError::msg(format!("{} failed", self.hint)));
    }
    Ok(ActionReport::default())
  }
}
