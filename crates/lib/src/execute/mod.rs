//! Flow execution.
//!
//! This module drives a [`Flow`] through its actions:
//! - one action at a time, in the order the flow lists them
//! - exclusivity and platform gates before each action
//! - fail-fast on the first failing action, keeping the partial summary
//! - nested flow timings spliced after the step that ran them
//! - composite and conditional steps replaced by the rows of the children they ran

pub mod types;

use std::time::Instant;

use tracing::{debug, error, info};

use crate::action::passes_gates;
use crate::context::Context;
use crate::flow::{ExecutionSummary, Flow};
use crate::platform::Platform;

pub use types::FlowError;

/// Run `flow` once for `platform`.
///
/// The action list is computed first; if that fails nothing runs. Each action
/// that passes the gates is executed and timed. The first failure aborts the
/// run with [`FlowError::ActionFailed`].
pub async fn execute_on_platform(
  flow: &dyn Flow,
  context: &mut Context,
  platform: Platform,
) -> Result<ExecutionSummary, FlowError> {
  info!(flow = %flow.name(), %platform, "executing flow");
  let started = Instant::now();

  let actions = flow.actions(context, platform)?;
  debug!(flow = %flow.name(), action_count = actions.len(), "resolved actions");

  let mut summary = ExecutionSummary::new(flow.name(), platform);

  for action in &actions {
    if !passes_gates(action.as_ref(), context, platform) {
      continue;
    }

    info!(action = action.name(), hint = action.hint(), "executing action");
    let action_started = Instant::now();
    let result = action.execute(context, platform).await;
    let elapsed = action_started.elapsed();

    let report = match result {
      Ok(report) => report,
      Err(source) => {
        error!(action = action.name(), hint = action.hint(), error = %source, "action failed");
        summary.total_time = started.elapsed();
        return Err(FlowError::ActionFailed {
          action: action.name().to_string(),
          hint: action.hint().to_string(),
          source,
          summary: Box::new(summary),
        });
      }
    };

    summary.action_timings.extend(report.into_rows(action.as_ref(), elapsed));
  }

  summary.total_time = started.elapsed();
  info!(
    flow = %flow.name(),
    %platform,
    executed = summary.action_timings.len(),
    total_ms = summary.total_time.as_millis() as u64,
    "flow finished"
  );

  Ok(summary)
}

/// Run `flow` for each of its platforms in declared order.
///
/// Stops at the first platform that fails. Later platforms see the context
/// as left by earlier ones.
pub async fn execute_all_platforms(flow: &dyn Flow, context: &mut Context) -> Result<Vec<ExecutionSummary>, FlowError> {
  let mut summaries = Vec::with_capacity(flow.platforms().len());

  for &platform in flow.platforms() {
    summaries.push(execute_on_platform(flow, context, platform).await?);
  }

  Ok(summaries)
}
