//! Pipeline steps.
//!
//! An [`Action`] is one step of a flow. Actions are either leaves that do
//! work (see [`actions`]) or combinators that run other actions:
//!
//! - [`CompositeAction`] - runs a lazily built list of sub-actions in order
//! - [`ConditionalAction`] - picks a branch from a predicate over the context
//! - [`CallFlowAction`] - runs a whole nested flow
//!
//! # Gating
//!
//! Before any action runs, whether directly in a flow or as the child of a
//! combinator, two gates are checked in order:
//!
//! 1. exclusivity: an action whose mutual exclusivity key was already
//!    registered in the context is skipped; otherwise the key is registered
//! 2. platform: an action that does not support the current platform is skipped
//!
//! The key is registered before the platform check, so an action skipped for
//! its platform still consumes its key.

pub mod actions;
mod argument;
mod call_flow;
mod composite;
mod conditional;
mod types;

pub use argument::{Argument, Modifier};
pub use call_flow::CallFlowAction;
pub use composite::{ActionsBuilder, CompositeAction};
pub use conditional::{ConditionalAction, Predicate};
pub use types::*;

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::context::Context;
use crate::flow::ActionTiming;
use crate::platform::Platform;

/// One step of a flow.
///
/// Implementations must be `Send + Sync` so flows built inside a plugin can be
/// driven from the host's runtime.
#[async_trait]
pub trait Action: Send + Sync {
  /// Stable identifier of the action kind, e.g. `"sh"`.
  fn name(&self) -> &'static str;

  fn description(&self) -> &'static str;

  /// Human readable label of this particular step.
  fn hint(&self) -> &str;

  /// Tag shared by actions of which at most one may run per context.
  fn mutual_exclusivity_key(&self) -> Option<&str> {
    None
  }

  fn is_supported(&self, _platform: Platform) -> bool {
    true
  }

  async fn execute(&self, context: &mut Context, platform: Platform) -> Result<ActionReport, ActionError>;
}

/// Check and register the action's exclusivity key.
///
/// Returns `false` if an action with the same key already passed this gate.
pub fn passes_exclusivity_gate(action: &dyn Action, context: &mut Context) -> bool {
  let Some(key) = action.mutual_exclusivity_key() else {
    return true;
  };

  if context.is_exclusivity_key_executed(key) {
    debug!(action = action.name(), hint = action.hint(), key, "skipping, exclusivity key already executed");
    return false;
  }

  context.add_executed_exclusivity_key(key);
  true
}

/// Both gates, in order. Returns `false` if the action must be skipped.
pub fn passes_gates(action: &dyn Action, context: &mut Context, platform: Platform) -> bool {
  if !passes_exclusivity_gate(action, context) {
    return false;
  }

  if !action.is_supported(platform) {
    debug!(action = action.name(), hint = action.hint(), %platform, "skipping, platform not supported");
    return false;
  }

  true
}

/// Run `action` if it passes the gates and time it.
///
/// Returns `None` when it was skipped, otherwise the summary rows it
/// contributes (see [`ActionReport::into_rows`]).
pub(crate) async fn run_gated(
  action: &dyn Action,
  context: &mut Context,
  platform: Platform,
) -> Result<Option<Vec<ActionTiming>>, ActionError> {
  if !passes_gates(action, context, platform) {
    return Ok(None);
  }

  debug!(action = action.name(), hint = action.hint(), "executing action");
  let started = Instant::now();
  let report = action.execute(context, platform).await?;
  Ok(Some(report.into_rows(action, started.elapsed())))
}
