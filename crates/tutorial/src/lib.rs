//! Example flows, built as a plugin library.
//!
//! ```text
//! stepwise run --input-folder . --product stepwise-tutorial
//! stepwise run --input-folder . --product stepwise-tutorial --entry-point make_mutual_exclusivity_flow
//! ```

use async_trait::async_trait;
use stepwise_lib::action::actions::{EchoAction, ShellAction};
use stepwise_lib::action::{
  Action, ActionError, ActionReport, Argument, CallFlowAction, CompositeAction, ConditionalAction,
};
use stepwise_lib::context::Context;
use stepwise_lib::execute::FlowError;
use stepwise_lib::flow::{BasicFlow, Flow};
use stepwise_lib::platform::Platform;
use tracing::info;

fn step(action: impl Action + 'static) -> Box<dyn Action> {
  Box::new(action)
}

/// A custom leaf action living in the plugin.
pub struct GreetAction {
  greeting: String,
}

impl GreetAction {
  pub fn new(greeting: impl Into<String>) -> Self {
    Self {
      greeting: greeting.into(),
    }
  }
}

#[async_trait]
impl Action for GreetAction {
  fn name(&self) -> &'static str {
    "greet"
  }

  fn description(&self) -> &'static str {
    "Example action for the example flow"
  }

  fn hint(&self) -> &str {
    &self.greeting
  }

  async fn execute(&self, _context: &mut Context, platform: Platform) -> Result<ActionReport, ActionError> {
    info!(greeting = %self.greeting, %platform, "greeting");
    println!("Hello, {}! This is an example action", self.greeting);
    Ok(ActionReport::default())
  }
}

/// Tour of the built-in actions and combinators.
///
/// Set `run_conditional=true` in the context to take the conditional branch.
pub struct ExampleFlow {
  platforms: Vec<Platform>,
}

impl Default for ExampleFlow {
  fn default() -> Self {
    Self {
      platforms: vec![Platform::MacOs, Platform::Linux],
    }
  }
}

impl Flow for ExampleFlow {
  fn name(&self) -> &str {
    "example_flow"
  }

  fn description(&self) -> &str {
    "Just an example flow"
  }

  fn platforms(&self) -> &[Platform] {
    &self.platforms
  }

  fn actions(&self, _context: &Context, _platform: Platform) -> Result<Vec<Box<dyn Action>>, FlowError> {
    let nested = BasicFlow::new("nested_flow_example", &[Platform::MacOs, Platform::Linux], |_, _| {
      Ok(vec![
        step(EchoAction::new("nested echo", "This is a flow called from CallFlowAction")),
        step(ShellAction::new("nested shell", "echo").arg("Hello from nested flow")),
      ])
    })
    .with_description("A simple flow called from CallFlowAction");

    Ok(vec![
      step(EchoAction::new("raw echo", "Just an echo")),
      step(ShellAction::new("listing", "ls").arg("-la").capture_to("listing")),
      step(EchoAction::key("listing echo", "listing")),
      step(GreetAction::new("World")),
      step(EchoAction::new(
        "modified echo",
        Argument::modified("listing", |_, listing: String| Ok(format!("{} (listed)", listing.lines().count()))),
      )),
      step(
        ConditionalAction::new(
          "conditional",
          |context, _| context.get::<String>("run_conditional").is_some_and(|v| v == "true"),
          step(EchoAction::new("taken", "Conditional action executed")),
        )
        .otherwise(step(EchoAction::new("skipped", "Conditional action skipped"))),
      ),
      step(CompositeAction::new("composite", |_, _| {
        vec![
          step(EchoAction::new("first", "First action in composite")),
          step(ShellAction::new("second", "echo").arg("Second action in composite")),
          step(EchoAction::new("third", "Third action in composite")),
        ]
      })),
      step(CallFlowAction::new("nested flow", nested).measured(["listing"])),
    ])
  }
}

/// Shows that only the first action carrying a given key runs.
pub fn mutual_exclusivity_flow() -> BasicFlow {
  BasicFlow::new("mutual_exclusivity_example", &[Platform::MacOs, Platform::Linux], |_, _| {
    Ok(vec![
      step(
        EchoAction::new("first with key-1", "This is the first action with mutual exclusivity key")
          .with_exclusivity_key("unique-key-1"),
      ),
      step(
        EchoAction::new("second with key-1", "Second action with the same key, should be skipped")
          .with_exclusivity_key("unique-key-1"),
      ),
      step(
        EchoAction::new("third with key-2", "This is the third action with a different key")
          .with_exclusivity_key("unique-key-2"),
      ),
      step(EchoAction::new("fourth without key", "This is the fourth action without a key")),
      step(
        ShellAction::new("shell with shell-key-1", "echo")
          .arg("Shell action with mutual exclusivity key")
          .with_exclusivity_key("shell-key-1"),
      ),
      step(
        ShellAction::new("shell again with shell-key-1", "echo")
          .arg("Another shell action with the same key, should be skipped")
          .with_exclusivity_key("shell-key-1"),
      ),
    ])
  })
  .with_description("Example flow to test mutual exclusivity feature")
}

/// Fails on its last step: a command exiting non-zero stops the flow.
pub fn shell_fail_flow() -> BasicFlow {
  BasicFlow::new("shell_action_fail_example", &[Platform::MacOs, Platform::Linux], |_, _| {
    Ok(vec![
      step(EchoAction::new("announce", "=== a failing command aborts the flow ===")),
      step(
        CompositeAction::new("tolerated failure", |_, _| {
          vec![step(ShellAction::new("ls missing", "ls").arg("/nonexistent_directory"))]
        })
        .swallow_errors(),
      ),
      step(ShellAction::new("fatal failure", "ls").arg("/nonexistent_directory")),
    ])
  })
  .with_description("Example of failing shell commands")
}

stepwise_lib::export_flow!(make_flow, ExampleFlow::default);
stepwise_lib::export_flow!(make_mutual_exclusivity_flow, mutual_exclusivity_flow);
stepwise_lib::export_flow!(make_shell_fail_flow, shell_fail_flow);
