//! Flows: named, platform-scoped pipelines of actions.
//!
//! A [`Flow`] computes its ordered action list from the context and the
//! platform it runs for. The runner in [`crate::execute`] drives it and
//! produces an [`ExecutionSummary`].

mod types;

pub use types::{ActionTiming, ExecutionSummary};

use crate::action::Action;
use crate::context::Context;
use crate::execute::FlowError;
use crate::platform::Platform;

/// A pipeline definition.
pub trait Flow: Send + Sync {
  fn name(&self) -> &str;

  fn description(&self) -> &str;

  /// Platforms the flow runs for, in execution order.
  fn platforms(&self) -> &[Platform];

  /// The actions to run for `platform`, in order.
  ///
  /// Called once per platform run, after earlier platforms have already
  /// written to the context.
  fn actions(&self, context: &Context, platform: Platform) -> Result<Vec<Box<dyn Action>>, FlowError>;
}

impl<F: Flow + ?Sized> Flow for Box<F> {
  fn name(&self) -> &str {
    (**self).name()
  }

  fn description(&self) -> &str {
    (**self).description()
  }

  fn platforms(&self) -> &[Platform] {
    (**self).platforms()
  }

  fn actions(&self, context: &Context, platform: Platform) -> Result<Vec<Box<dyn Action>>, FlowError> {
    (**self).actions(context, platform)
  }
}

type ActionsFn = Box<dyn Fn(&Context, Platform) -> Result<Vec<Box<dyn Action>>, FlowError> + Send + Sync>;

/// A flow whose action list comes from a closure.
pub struct BasicFlow {
  name: String,
  description: String,
  platforms: Vec<Platform>,
  actions: ActionsFn,
}

impl BasicFlow {
  pub fn new<F>(name: impl Into<String>, platforms: &[Platform], actions: F) -> Self
  where
    F: Fn(&Context, Platform) -> Result<Vec<Box<dyn Action>>, FlowError> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      description: String::new(),
      platforms: platforms.to_vec(),
      actions: Box::new(actions),
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }
}

impl Flow for BasicFlow {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    &self.description
  }

  fn platforms(&self) -> &[Platform] {
    &self.platforms
  }

  fn actions(&self, context: &Context, platform: Platform) -> Result<Vec<Box<dyn Action>>, FlowError> {
    (self.actions)(context, platform)
  }
}

/// Vends flows. This is what a plugin hands to the host.
pub trait FlowBuilder: Send + Sync {
  fn build(&self) -> Box<dyn Flow>;
}

impl<F, T> FlowBuilder for F
where
  F: Fn() -> T + Send + Sync,
  T: Flow + 'static,
{
  fn build(&self) -> Box<dyn Flow> {
    Box::new(self())
  }
}
