//! Host services handed to plugin code.
//!
//! A plugin library links its own copies of tokio and tracing, each with its
//! own thread locals. Code running inside the plugin only sees the host's
//! runtime and subscriber when they are entered from the plugin side, so
//! every flow a plugin builds is wrapped in a [`HostedFlow`] that does this
//! around each call into plugin code.
//!
//! A panic inside plugin code is caught on the plugin side and turned into an
//! error, since it cannot unwind through the host.

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tracing::Dispatch;

use crate::action::{Action, ActionError, ActionReport};
use crate::context::Context;
use crate::execute::FlowError;
use crate::flow::Flow;
use crate::platform::Platform;

/// The runtime and tracing dispatcher of the host.
///
/// Crosses the plugin boundary by pointer, so host and plugin must agree on
/// its layout; this is covered by the same build requirement as the flow
/// traits themselves.
#[derive(Clone)]
pub struct HostContext {
  runtime: Option<Handle>,
  dispatch: Dispatch,
}

impl HostContext {
  /// Capture the runtime and default dispatcher of the calling thread.
  pub fn current() -> Self {
    Self {
      runtime: Handle::try_current().ok(),
      dispatch: tracing::dispatcher::get_default(Dispatch::clone),
    }
  }

  pub fn has_runtime(&self) -> bool {
    self.runtime.is_some()
  }

  /// Run `f` inside the host runtime with the host dispatcher as default.
  pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
    let _runtime = self.runtime.as_ref().map(Handle::enter);
    tracing::dispatcher::with_default(&self.dispatch, f)
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  payload
    .downcast_ref::<&str>()
    .map(|message| message.to_string())
    .or_else(|| payload.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// A plugin-built flow that enters the host's services on every call.
pub struct HostedFlow {
  flow: Box<dyn Flow>,
  host: HostContext,
}

impl HostedFlow {
  pub fn new(flow: Box<dyn Flow>, host: HostContext) -> Self {
    Self { flow, host }
  }
}

impl Flow for HostedFlow {
  fn name(&self) -> &str {
    self.flow.name()
  }

  fn description(&self) -> &str {
    self.flow.description()
  }

  fn platforms(&self) -> &[Platform] {
    self.flow.platforms()
  }

  fn actions(&self, context: &Context, platform: Platform) -> Result<Vec<Box<dyn Action>>, FlowError> {
    let actions = catch_unwind(AssertUnwindSafe(|| self.host.enter(|| self.flow.actions(context, platform))))
      .map_err(|payload| {
        FlowError::resolve(format!(
          "flow {} panicked: {}",
          self.flow.name(),
          panic_message(payload.as_ref())
        ))
      })??;

    Ok(
      actions
        .into_iter()
        .map(|action| {
          Box::new(HostedAction {
            action,
            host: self.host.clone(),
          }) as Box<dyn Action>
        })
        .collect(),
    )
  }
}

struct HostedAction {
  action: Box<dyn Action>,
  host: HostContext,
}

#[async_trait]
impl Action for HostedAction {
  fn name(&self) -> &'static str {
    self.action.name()
  }

  fn description(&self) -> &'static str {
    self.action.description()
  }

  fn hint(&self) -> &str {
    self.action.hint()
  }

  fn mutual_exclusivity_key(&self) -> Option<&str> {
    self.action.mutual_exclusivity_key()
  }

  fn is_supported(&self, platform: Platform) -> bool {
    self.action.is_supported(platform)
  }

  async fn execute(&self, context: &mut Context, platform: Platform) -> Result<ActionReport, ActionError> {
    Hosted {
      host: &self.host,
      future: self.action.execute(context, platform),
    }
    .await
  }
}

type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<ActionReport, ActionError>> + Send + 'a>>;

/// Polls an action future with the host entered.
struct Hosted<'a> {
  host: &'a HostContext,
  future: ActionFuture<'a>,
}

impl Future for Hosted<'_> {
  type Output = Result<ActionReport, ActionError>;

  fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    let host = this.host;
    let future = &mut this.future;

    match catch_unwind(AssertUnwindSafe(|| host.enter(|| future.as_mut().poll(cx)))) {
      Ok(poll) => poll,
      Err(payload) => Poll::Ready(Err(ActionError::Panicked(panic_message(payload.as_ref())))),
    }
  }
}
