//! Top-level entry for running a flow with user supplied context values.

use thiserror::Error;
use tracing::{debug, info};

use crate::context::Context;
use crate::execute::{FlowError, execute_on_platform};
use crate::flow::{ExecutionSummary, Flow};

#[derive(Debug, Error)]
pub enum RunnerError {
  /// A context parameter was not of the form `key=value`.
  #[error("invalid context parameter {0:?}, expected key=value")]
  InvalidContextParameter(String),
}

/// A run that stopped at a failing platform.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
  /// Summaries of the platforms that completed, followed by the partial
  /// summary of the failing one when an action failed.
  pub summaries: Vec<ExecutionSummary>,
  pub error: FlowError,
}

/// Build a context from `key=value` pairs.
///
/// Each pair is split on its first `=` and stored as a `String`. The value
/// may be empty; the key may not. Later pairs overwrite earlier ones.
pub fn seed_context<S: AsRef<str>>(values: &[S]) -> Result<Context, RunnerError> {
  let mut context = Context::new();

  for value in values {
    let value = value.as_ref();
    let (key, parameter) = value
      .split_once('=')
      .filter(|(key, _)| !key.is_empty())
      .ok_or_else(|| RunnerError::InvalidContextParameter(value.to_string()))?;

    debug!(key, value = parameter, "seeding context");
    context.put(key, parameter.to_string());
  }

  Ok(context)
}

/// Run `flow` on all of its platforms in declared order.
///
/// Stops at the first failing platform; the summaries gathered so far travel
/// with the error.
pub async fn run(flow: &dyn Flow, context: &mut Context) -> Result<Vec<ExecutionSummary>, RunFailure> {
  info!(
    flow = %flow.name(),
    platforms = flow.platforms().len(),
    context_keys = context.len(),
    "running flow"
  );

  let mut summaries = Vec::with_capacity(flow.platforms().len());
  for &platform in flow.platforms() {
    match execute_on_platform(flow, context, platform).await {
      Ok(summary) => summaries.push(summary),
      Err(error) => {
        summaries.extend(error.partial_summary().cloned());
        return Err(RunFailure { summaries, error });
      }
    }
  }

  Ok(summaries)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::flow::BasicFlow;
  use crate::platform::Platform;
  use crate::util::testutil::{RecordingAction, log_entries, new_log};

  #[test]
  fn seeds_string_values() {
    let context = seed_context(&["product=app", "flags=a=b", "empty="]).unwrap();

    assert_eq!(context.get::<String>("product").map(String::as_str), Some("app"));
    assert_eq!(context.get::<String>("flags").map(String::as_str), Some("a=b"));
    assert_eq!(context.get::<String>("empty").map(String::as_str), Some(""));
  }

  #[test]
  fn later_pairs_overwrite() {
    let context = seed_context(&["k=1", "k=2"]).unwrap();

    assert_eq!(context.get::<String>("k").map(String::as_str), Some("2"));
    assert_eq!(context.len(), 1);
  }

  #[test]
  fn rejects_pair_without_separator() {
    let result = seed_context(&["product"]);

    assert!(matches!(result, Err(RunnerError::InvalidContextParameter(v)) if v == "product"));
  }

  #[test]
  fn rejects_empty_key() {
    assert!(matches!(
      seed_context(&["=value"]),
      Err(RunnerError::InvalidContextParameter(_))
    ));
  }

  #[tokio::test]
  async fn runs_every_platform() {
    let log = new_log();
    let action_log = log.clone();
    let flow = BasicFlow::new("both", &[Platform::MacOs, Platform::Ios], move |_, platform| {
      Ok(vec![RecordingAction::new(platform.as_str(), &action_log).boxed()])
    });
    let mut context = seed_context(&["mode=ci"]).unwrap();

    let summaries = run(&flow, &mut context).await.unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(log_entries(&log), vec!["macos", "ios"]);
  }

  #[tokio::test]
  async fn failure_keeps_completed_platform_summaries() {
    let log = new_log();
    let action_log = log.clone();
    let flow = BasicFlow::new("second fails", &[Platform::MacOs, Platform::Ios], move |_, platform| {
      let mut actions = vec![RecordingAction::new(platform.as_str(), &action_log).boxed()];
      if platform == Platform::Ios {
        actions.push(RecordingAction::failing("broken", &action_log).boxed());
      }
      Ok(actions)
    });
    let mut context = Context::new();

    let failure = run(&flow, &mut context).await.unwrap_err();

    let platforms: Vec<Platform> = failure.summaries.iter().map(|s| s.platform).collect();
    assert_eq!(platforms, vec![Platform::MacOs, Platform::Ios]);
    assert_eq!(failure.summaries[0].action_timings[0].hint, "macos");
    assert_eq!(failure.summaries[1].action_timings.len(), 1);
    assert!(matches!(failure.error, FlowError::ActionFailed { ref hint, .. } if hint == "broken"));
  }

  #[tokio::test]
  async fn resolve_failure_keeps_earlier_summaries_only() {
    let flow = BasicFlow::new("unresolvable", &[Platform::MacOs, Platform::Linux], |_, platform| {
      if platform == Platform::Linux {
        return Err(FlowError::resolve("no linux steps"));
      }
      Ok(Vec::new())
    });
    let mut context = Context::new();

    let failure = run(&flow, &mut context).await.unwrap_err();

    assert_eq!(failure.summaries.len(), 1);
    assert!(matches!(failure.error, FlowError::Resolve(_)));
  }
}
