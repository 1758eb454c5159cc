//! The typed key/value store threaded through a flow run.
//!
//! A [`Context`] maps string keys to type-erased values. Every action of a run
//! receives the same context by mutable reference, so values written by one
//! step are visible to the steps after it.
//!
//! Reads are typed: [`Context::get`] only returns a value when the stored
//! value has exactly the requested type. A type mismatch is treated as
//! absence, never as an error.
//!
//! Two reserved keys hold engine bookkeeping inside the same store:
//! - [`MEASUREMENTS_KEY`] - measurements recorded by `CallFlow` steps
//! - [`EXCLUSIVITY_KEYS_KEY`] - the mutual exclusivity registry

mod exclusivity;
mod measurement;

pub use measurement::Measurement;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Reserved key holding `BTreeMap<String, Measurement>`.
pub const MEASUREMENTS_KEY: &str = "measurements";

/// Reserved key holding the `BTreeSet<String>` of executed exclusivity keys.
pub const EXCLUSIVITY_KEYS_KEY: &str = "mutual_exclusivity_keys";

/// Placeholder stored by [`Context::extract_subset`] for keys that are absent.
pub const MISSING_PLACEHOLDER: &str = "<missing>";

/// A value that can live in a [`Context`].
///
/// Implemented for every `Debug + Send + Sync + 'static` type, so callers
/// never implement it by hand.
pub trait ContextValue: Any + fmt::Debug + Send + Sync {
  fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> ContextValue for T {
  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// A shared, immutable, type-erased context value.
pub type Value = Arc<dyn ContextValue>;

/// Downcast an erased value to a concrete type.
pub fn downcast<T: 'static>(value: &Value) -> Option<&T> {
  let inner: &dyn ContextValue = &**value;
  inner.as_any().downcast_ref::<T>()
}

#[derive(Default)]
pub struct Context {
  storage: BTreeMap<String, Value>,
}

impl Context {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store `value` under `key`, replacing whatever was there.
  pub fn put<T: ContextValue>(&mut self, key: impl Into<String>, value: T) {
    self.storage.insert(key.into(), Arc::new(value));
  }

  /// Store an already erased value under `key`.
  pub fn put_value(&mut self, key: impl Into<String>, value: Value) {
    self.storage.insert(key.into(), value);
  }

  /// Typed read. Returns `None` when the key is missing or holds another type.
  pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
    self.storage.get(key).and_then(downcast::<T>)
  }

  /// Typed read returning an owned copy.
  pub fn get_cloned<T: Clone + 'static>(&self, key: &str) -> Option<T> {
    self.get::<T>(key).cloned()
  }

  /// Remove `key`. Returns `true` if it existed.
  pub fn drop(&mut self, key: &str) -> bool {
    self.storage.remove(key).is_some()
  }

  /// The erased value stored under `key`, for generic enumeration or printing.
  pub fn option(&self, key: &str) -> Option<&Value> {
    self.storage.get(key)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.storage.contains_key(key)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.storage.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.storage.len()
  }

  pub fn is_empty(&self) -> bool {
    self.storage.is_empty()
  }

  /// Snapshot the values of `keys`.
  ///
  /// The result always has one entry per requested key; absent keys map to
  /// the [`MISSING_PLACEHOLDER`] string so measurement records stay complete.
  pub fn extract_subset<S: AsRef<str>>(&self, keys: &[S]) -> BTreeMap<String, Value> {
    keys
      .iter()
      .map(|key| {
        let key = key.as_ref();
        let value = self
          .storage
          .get(key)
          .cloned()
          .unwrap_or_else(|| Arc::new(MISSING_PLACEHOLDER.to_string()));
        (key.to_string(), value)
      })
      .collect()
  }

  /// Sorted `(key, debug representation)` pairs, for printing.
  pub fn describe(&self) -> Vec<(String, String)> {
    self
      .storage
      .iter()
      .map(|(key, value)| (key.clone(), format!("{:?}", value)))
      .collect()
  }
}

impl fmt::Debug for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map().entries(self.storage.iter()).finish()
  }
}
