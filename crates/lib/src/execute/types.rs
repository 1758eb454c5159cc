//! Error type for flow execution.

use thiserror::Error;

use crate::action::ActionError;
use crate::flow::ExecutionSummary;

/// Errors that can occur while running a flow.
#[derive(Debug, Error)]
pub enum FlowError {
  /// The flow could not compute its action list. Nothing was executed.
  #[error("failed to resolve actions: {0}")]
  Resolve(String),

  /// An action failed. The run stopped there.
  ///
  /// `summary` holds the timings of the actions that completed before it.
  #[error("action {action} ({hint}) failed: {source}")]
  ActionFailed {
    action: String,
    hint: String,
    #[source]
    source: ActionError,
    summary: Box<ExecutionSummary>,
  },
}

impl FlowError {
  pub fn resolve(message: impl Into<String>) -> Self {
    FlowError::Resolve(message.into())
  }

  /// The partial summary of a failed run, if an action failed.
  pub fn partial_summary(&self) -> Option<&ExecutionSummary> {
    match self {
      FlowError::ActionFailed { summary, .. } => Some(summary),
      FlowError::Resolve(_) => None,
    }
  }
}
