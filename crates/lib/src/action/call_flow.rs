use std::time::{Instant, SystemTime};

use async_trait::async_trait;
use tracing::debug;

use crate::context::{Context, Measurement};
use crate::execute::execute_on_platform;
use crate::flow::Flow;
use crate::platform::Platform;

use super::{Action, ActionError, ActionReport};

/// Runs a nested flow against the same context and platform.
///
/// The nested flow's timings are handed back to the caller, which lists them
/// right after this step. With [`CallFlowAction::measured`] the step also
/// records a [`Measurement`] under its hint.
pub struct CallFlowAction {
  hint: String,
  flow: Box<dyn Flow>,
  measure_keys: Option<Vec<String>>,
  exclusivity_key: Option<String>,
}

impl CallFlowAction {
  pub fn new(hint: impl Into<String>, flow: impl Flow + 'static) -> Self {
    Self {
      hint: hint.into(),
      flow: Box::new(flow),
      measure_keys: None,
      exclusivity_key: None,
    }
  }

  /// Record a measurement on success, capturing the values of `keys`.
  pub fn measured<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
    self.measure_keys = Some(keys.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_exclusivity_key(mut self, key: impl Into<String>) -> Self {
    self.exclusivity_key = Some(key.into());
    self
  }
}

#[async_trait]
impl Action for CallFlowAction {
  fn name(&self) -> &'static str {
    "call-flow"
  }

  fn description(&self) -> &'static str {
    "Executes another flow"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  fn mutual_exclusivity_key(&self) -> Option<&str> {
    self.exclusivity_key.as_deref()
  }

  async fn execute(&self, context: &mut Context, platform: Platform) -> Result<ActionReport, ActionError> {
    let start_time = SystemTime::now();
    let started = Instant::now();

    let summary = execute_on_platform(self.flow.as_ref(), context, platform)
      .await
      .map_err(Box::new)?;

    if let Some(keys) = &self.measure_keys {
      let measurement = Measurement {
        context_data: context.extract_subset(keys.as_slice()),
        start_time,
        execution_time: started.elapsed(),
        hint: self.hint.clone(),
      };
      debug!(hint = %self.hint, elapsed_ms = measurement.execution_time.as_millis() as u64, "recorded measurement");
      context.add_measurement(self.hint.clone(), measurement);
    }

    Ok(ActionReport::with_nested(summary.action_timings))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::downcast;
  use crate::flow::BasicFlow;
  use crate::util::testutil::{ExecutionLog, RecordingAction, log_entries, new_log};

  fn inner_flow(log: &ExecutionLog, fail: bool) -> BasicFlow {
    let log = log.clone();
    BasicFlow::new("inner", &[Platform::Linux], move |_, _| {
      let action = if fail {
        RecordingAction::failing("inner-step", &log)
      } else {
        RecordingAction::new("inner-step", &log)
      };
      Ok(vec![action.boxed()])
    })
  }

  #[tokio::test]
  async fn returns_nested_timings() {
    let log = new_log();
    let action = CallFlowAction::new("call", inner_flow(&log, false));
    let mut ctx = Context::new();

    let report = action.execute(&mut ctx, Platform::Linux).await.unwrap();

    assert_eq!(log_entries(&log), vec!["inner-step"]);
    assert_eq!(report.nested_timings.len(), 1);
    assert_eq!(report.nested_timings[0].hint, "inner-step");
    assert!(ctx.measurements().is_empty());
  }

  #[tokio::test]
  async fn measured_call_records_context_subset() {
    let log = new_log();
    let action = CallFlowAction::new("timed", inner_flow(&log, false)).measured(["version", "absent"]);
    let mut ctx = Context::new();
    ctx.put("version", "2.0".to_string());

    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    let measurements = ctx.measurements();
    let measurement = &measurements["timed"];
    assert_eq!(measurement.hint, "timed");
    assert_eq!(downcast::<String>(&measurement.context_data["version"]).unwrap(), "2.0");
    assert_eq!(downcast::<String>(&measurement.context_data["absent"]).unwrap(), "<missing>");
  }

  #[tokio::test]
  async fn failure_records_no_measurement() {
    let log = new_log();
    let action = CallFlowAction::new("timed", inner_flow(&log, true)).measured(["version"]);
    let mut ctx = Context::new();

    let result = action.execute(&mut ctx, Platform::Linux).await;

    assert!(matches!(result, Err(ActionError::Flow(_))));
    assert!(ctx.measurements().is_empty());
  }
}
