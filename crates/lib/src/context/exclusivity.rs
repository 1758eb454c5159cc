use std::collections::BTreeSet;

use super::{Context, EXCLUSIVITY_KEYS_KEY};

impl Context {
  /// Exclusivity keys of actions that already passed the exclusivity gate.
  pub fn executed_exclusivity_keys(&self) -> BTreeSet<String> {
    self
      .get::<BTreeSet<String>>(EXCLUSIVITY_KEYS_KEY)
      .cloned()
      .unwrap_or_default()
  }

  pub fn is_exclusivity_key_executed(&self, key: &str) -> bool {
    self
      .get::<BTreeSet<String>>(EXCLUSIVITY_KEYS_KEY)
      .is_some_and(|keys| keys.contains(key))
  }

  pub fn add_executed_exclusivity_key(&mut self, key: impl Into<String>) {
    let mut keys = self.executed_exclusivity_keys();
    keys.insert(key.into());
    self.put(EXCLUSIVITY_KEYS_KEY, keys);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn registry_starts_empty() {
    let ctx = Context::new();
    assert!(ctx.executed_exclusivity_keys().is_empty());
    assert!(!ctx.is_exclusivity_key_executed("k"));
  }

  #[test]
  fn added_keys_are_reported() {
    let mut ctx = Context::new();
    ctx.add_executed_exclusivity_key("k1");
    ctx.add_executed_exclusivity_key("k2");
    ctx.add_executed_exclusivity_key("k1");

    assert!(ctx.is_exclusivity_key_executed("k1"));
    assert!(ctx.is_exclusivity_key_executed("k2"));
    assert_eq!(ctx.executed_exclusivity_keys().len(), 2);
  }
}
