use std::time::Duration;

use thiserror::Error;

use crate::execute::FlowError;
use crate::flow::ActionTiming;
use crate::pattern::PatternError;
use crate::plugin::PackageError;
use crate::shell::ShellError;

use super::Action;

/// Errors returned by an action body.
#[derive(Debug, Error)]
pub enum ActionError {
  /// An external process failed to start or exited non-zero.
  #[error(transparent)]
  Shell(#[from] ShellError),

  /// A file copy or removal failed.
  #[error(transparent)]
  Pattern(#[from] PatternError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// An argument could not be resolved from the context.
  #[error("argument not resolved: {0}")]
  MissingArgument(String),

  /// A nested flow failed.
  #[error("nested flow failed: {0}")]
  Flow(#[from] Box<FlowError>),

  /// Reading or building a cargo package failed.
  #[error(transparent)]
  Package(#[from] PackageError),

  /// A blocking task panicked or was cancelled.
  #[error("background task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  /// Plugin code panicked while running the action.
  #[error("action panicked: {0}")]
  Panicked(String),

  #[error("{0}")]
  Message(String),
}

impl ActionError {
  /// Error with a free-form message, for ad-hoc actions and plugins.
  pub fn msg(message: impl Into<String>) -> Self {
    ActionError::Message(message.into())
  }
}

/// What an executed action hands back to its caller.
///
/// Leaves return the default (empty) report and get one summary row of their
/// own. `CallFlow` returns the timings of the nested flow, listed right after
/// its own row. Composite and Conditional are transparent: they return the
/// rows of the children they ran and get no row themselves.
#[derive(Debug, Clone, Default)]
pub struct ActionReport {
  pub nested_timings: Vec<ActionTiming>,
  /// The action stands for `nested_timings` and has no row of its own.
  pub transparent: bool,
}

impl ActionReport {
  pub fn with_nested(nested_timings: Vec<ActionTiming>) -> Self {
    Self {
      nested_timings,
      transparent: false,
    }
  }

  /// Report of a combinator, made of the rows of the children it ran.
  pub fn children(timings: Vec<ActionTiming>) -> Self {
    Self {
      nested_timings: timings,
      transparent: true,
    }
  }

  /// The summary rows contributed by `action`, which ran for `elapsed`.
  pub fn into_rows(self, action: &dyn Action, elapsed: Duration) -> Vec<ActionTiming> {
    if self.transparent {
      return self.nested_timings;
    }

    let mut rows = Vec::with_capacity(self.nested_timings.len() + 1);
    rows.push(ActionTiming {
      action_name: action.name().to_string(),
      hint: action.hint().to_string(),
      elapsed,
    });
    rows.extend(self.nested_timings);
    rows
  }
}
