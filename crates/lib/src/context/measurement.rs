use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use super::{Context, MEASUREMENTS_KEY, Value};

/// Timing record of a long step, with the context values visible to it.
#[derive(Debug, Clone)]
pub struct Measurement {
  /// Values of the keys requested by the measuring step.
  pub context_data: BTreeMap<String, Value>,
  /// Wall clock time the step started.
  pub start_time: SystemTime,
  /// Monotonic duration of the step.
  pub execution_time: Duration,
  pub hint: String,
}

impl Context {
  /// All measurements recorded so far, keyed by hint.
  pub fn measurements(&self) -> BTreeMap<String, Measurement> {
    self
      .get::<BTreeMap<String, Measurement>>(MEASUREMENTS_KEY)
      .cloned()
      .unwrap_or_default()
  }

  /// Record `measurement` under `key`, replacing an earlier one with the same key.
  pub fn add_measurement(&mut self, key: impl Into<String>, measurement: Measurement) {
    let mut measurements = self.measurements();
    measurements.insert(key.into(), measurement);
    self.put(MEASUREMENTS_KEY, measurements);
  }
}
