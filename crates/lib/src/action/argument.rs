use std::fmt;
use std::sync::Arc;

use crate::context::Context;

use super::ActionError;

/// Transformation applied to a context value by [`Argument::Modified`].
pub type Modifier<T> = Arc<dyn Fn(&Context, T) -> Result<T, ActionError> + Send + Sync>;

/// An action parameter that is either given directly or read from the context.
///
/// Reading from the context lets a step consume what an earlier step produced,
/// for example a path captured by a shell command.
#[derive(Clone)]
pub enum Argument<T> {
  Raw(T),
  Key(String),
  Modified { key: String, modifier: Modifier<T> },
}

impl<T> Argument<T> {
  pub fn key(key: impl Into<String>) -> Self {
    Argument::Key(key.into())
  }

  pub fn modified<F>(key: impl Into<String>, modifier: F) -> Self
  where
    F: Fn(&Context, T) -> Result<T, ActionError> + Send + Sync + 'static,
  {
    Argument::Modified {
      key: key.into(),
      modifier: Arc::new(modifier),
    }
  }
}

impl<T: Clone + 'static> Argument<T> {
  /// Resolve against `context`. A key that is missing, or holds another
  /// type, resolves to `None`.
  pub fn resolve_optional(&self, context: &Context) -> Result<Option<T>, ActionError> {
    match self {
      Argument::Raw(value) => Ok(Some(value.clone())),
      Argument::Key(key) => Ok(context.get_cloned::<T>(key)),
      Argument::Modified { key, modifier } => context
        .get_cloned::<T>(key)
        .map(|value| modifier(context, value))
        .transpose(),
    }
  }

  /// Resolve against `context`, failing if the value is absent.
  pub fn resolve(&self, context: &Context) -> Result<T, ActionError> {
    self
      .resolve_optional(context)?
      .ok_or_else(|| ActionError::MissingArgument(self.to_string()))
  }
}

impl From<&str> for Argument<String> {
  fn from(value: &str) -> Self {
    Argument::Raw(value.to_string())
  }
}

impl From<String> for Argument<String> {
  fn from(value: String) -> Self {
    Argument::Raw(value)
  }
}

impl<T> fmt::Display for Argument<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Argument::Raw(_) => write!(f, "<raw>"),
      Argument::Key(key) => write!(f, "key:{}", key),
      Argument::Modified { key, .. } => write!(f, "modified:{}", key),
    }
  }
}

impl<T: fmt::Debug> fmt::Debug for Argument<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Argument::Raw(value) => f.debug_tuple("Raw").field(value).finish(),
      Argument::Key(key) => f.debug_tuple("Key").field(key).finish(),
      Argument::Modified { key, .. } => f.debug_struct("Modified").field("key", key).finish_non_exhaustive(),
    }
  }
}
