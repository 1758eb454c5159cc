use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::platform::Platform;

/// Time spent in one executed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionTiming {
  pub action_name: String,
  pub hint: String,
  #[serde(serialize_with = "as_seconds")]
  pub elapsed: Duration,
}

/// Audit record of one flow run on one platform.
///
/// `action_timings` lists executed actions in order. Gated-out actions have no
/// entry. Timings of a nested flow follow the entry of the step that ran it.
/// Composite and conditional steps have no entry; the children they ran do.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
  pub flow_name: String,
  pub platform: Platform,
  pub action_timings: Vec<ActionTiming>,
  #[serde(serialize_with = "as_seconds")]
  pub total_time: Duration,
}

impl ExecutionSummary {
  pub fn new(flow_name: impl Into<String>, platform: Platform) -> Self {
    Self {
      flow_name: flow_name.into(),
      platform,
      action_timings: Vec::new(),
      total_time: Duration::ZERO,
    }
  }
}

fn as_seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn serializes_durations_as_seconds() {
    let mut summary = ExecutionSummary::new("release", Platform::MacOs);
    summary.action_timings.push(ActionTiming {
      action_name: "sh".to_string(),
      hint: "build".to_string(),
      elapsed: Duration::from_millis(1500),
    });
    summary.total_time = Duration::from_secs(2);

    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["flow_name"], "release");
    assert_eq!(json["platform"], "macos");
    assert_eq!(json["action_timings"][0]["elapsed"], 1.5);
    assert_eq!(json["total_time"], 2.0);
  }
}
