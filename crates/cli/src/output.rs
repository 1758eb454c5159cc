//! CLI output formatting utilities.
//!
//! Colored status messages, the execution summary table and the context dump.

use std::time::Duration;

use anyhow::Context as _;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use stepwise_lib::context::Context;
use stepwise_lib::flow::ExecutionSummary;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

const STEP_WIDTH: usize = 4;
const TIME_WIDTH: usize = 14;

fn pad(text: &str, width: usize) -> String {
  format!("{:<width$}", text, width = width)
}

fn center(text: &str, width: usize) -> String {
  format!("{:^width$}", text, width = width)
}

/// Lines of the summary table: one section per platform, one row per
/// executed action.
pub fn render_summary_table(summaries: &[ExecutionSummary]) -> Vec<String> {
  let timings = summaries.iter().flat_map(|s| &s.action_timings);
  let action_width = timings.clone().map(|t| t.action_name.len()).fold("Action".len(), usize::max);
  let hint_width = timings.map(|t| t.hint.len()).fold("Hint".len(), usize::max);

  let inner_width = STEP_WIDTH + action_width + hint_width + TIME_WIDTH + 9;
  let separator = format!(
    "+{}+{}+{}+{}+",
    "-".repeat(STEP_WIDTH + 2),
    "-".repeat(action_width + 2),
    "-".repeat(hint_width + 2),
    "-".repeat(TIME_WIDTH + 2)
  );
  let row = |step: &str, action: &str, hint: &str, time: &str| {
    format!(
      "| {} | {} | {} | {} |",
      pad(step, STEP_WIDTH),
      pad(action, action_width),
      pad(hint, hint_width),
      pad(time, TIME_WIDTH)
    )
  };

  let mut lines = vec![
    separator.clone(),
    format!("|{}|", center("Execution summary", inner_width + 2)),
    separator.clone(),
    row("Step", "Action", "Hint", "Time (in s)"),
    separator.clone(),
  ];

  for summary in summaries {
    lines.push(format!("| {} |", center(&format!("Platform: {}", summary.platform), inner_width)));
    lines.push(separator.clone());
    for (index, timing) in summary.action_timings.iter().enumerate() {
      lines.push(row(
        &index.to_string(),
        &timing.action_name,
        &timing.hint,
        &format!("{:.2}", timing.elapsed.as_secs_f64()),
      ));
    }
    lines.push(separator.clone());
  }

  lines
}

/// The closing line under the summary table.
pub fn time_saved(summaries: &[ExecutionSummary]) -> String {
  let total: Duration = summaries.iter().map(|s| s.total_time).sum();
  if total.as_secs() >= 60 {
    format!("stepwise saved you {} minutes", total.as_secs() / 60)
  } else {
    format!("stepwise saved you {:.2} seconds", total.as_secs_f64())
  }
}

pub fn print_summary_table(summaries: &[ExecutionSummary]) {
  if summaries.is_empty() {
    return;
  }

  println!();
  for line in render_summary_table(summaries) {
    println!("{}", line.if_supports_color(Stream::Stdout, |s| s.bold()));
  }
  println!();
  print_success(&time_saved(summaries));
}

pub fn print_context(context: &Context) {
  println!();
  println!("Context:");
  if context.is_empty() {
    print_stat("(empty)", "");
    return;
  }
  for (key, value) in context.describe() {
    print_stat(&key, &value);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use stepwise_lib::flow::ActionTiming;
  use stepwise_lib::platform::Platform;

  fn summary(platform: Platform, rows: &[(&str, &str, u64)], total_secs: u64) -> ExecutionSummary {
    let mut summary = ExecutionSummary::new("release", platform);
    summary.action_timings = rows
      .iter()
      .map(|(name, hint, millis)| ActionTiming {
        action_name: name.to_string(),
        hint: hint.to_string(),
        elapsed: Duration::from_millis(*millis),
      })
      .collect();
    summary.total_time = Duration::from_secs(total_secs);
    summary
  }

  #[test]
  fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
    assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
  }

  #[test]
  fn table_has_a_section_per_platform() {
    let summaries = vec![
      summary(Platform::Ios, &[("sh", "build the framework", 1250)], 2),
      summary(Platform::MacOs, &[("echo", "done", 0)], 1),
    ];

    let lines = render_summary_table(&summaries);

    assert!(lines.iter().any(|l| l.contains("Platform: ios")));
    assert!(lines.iter().any(|l| l.contains("Platform: macos")));
    assert!(lines.contains(&"| 0    | sh     | build the framework | 1.25           |".to_string()));
    assert!(lines.iter().all(|l| l.len() == lines[0].len()));
  }

  #[test]
  fn time_saved_switches_to_minutes() {
    assert_eq!(time_saved(&[summary(Platform::Linux, &[], 5)]), "stepwise saved you 5.00 seconds");
    assert_eq!(
      time_saved(&[summary(Platform::Linux, &[], 100), summary(Platform::MacOs, &[], 30)]),
      "stepwise saved you 2 minutes"
    );
  }
}
