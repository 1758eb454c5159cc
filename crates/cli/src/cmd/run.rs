//! Implementation of the `stepwise run` command.
//!
//! Builds (or takes) the plugin library, loads it, builds its flow, seeds the
//! context from `-c key=value` pairs and runs the flow on all its platforms.

use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use tracing::info;

use stepwise_lib::context::Context;
use stepwise_lib::flow::{ExecutionSummary, Flow};
use stepwise_lib::plugin::PluginLoader;
use stepwise_lib::runner::{run, seed_context};

use super::build::build_plugin;
use crate::output::{
  OutputFormat, format_duration, print_context, print_error, print_info, print_json, print_stat, print_summary_table,
};

#[derive(Debug)]
pub struct RunOptions {
  pub input_folder: PathBuf,
  pub product: Option<String>,
  pub entry_point: String,
  pub artifact: Option<PathBuf>,
  pub profile: String,
  pub context: Vec<String>,
  pub print_context: bool,
  pub output: OutputFormat,
}

pub fn cmd_run(options: &RunOptions) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(run_plugin(options))
}

async fn resolve_artifact(options: &RunOptions) -> Result<PathBuf> {
  if let Some(artifact) = &options.artifact {
    return Ok(artifact.clone());
  }

  let product = options
    .product
    .as_deref()
    .context("--product is required unless --artifact is given")?;
  if !options.output.is_json() {
    print_info(&format!("Building {}", product));
  }
  build_plugin(&options.input_folder, product, &options.profile).await
}

async fn run_plugin(options: &RunOptions) -> Result<()> {
  // Declared first so it is dropped last.
  let mut loader = PluginLoader::new();
  let mut context = seed_context(&options.context)?;
  let artifact = resolve_artifact(options).await?;

  let id = loader
    .load(&artifact, &options.entry_point)
    .with_context(|| format!("Failed to load plugin: {}", artifact.display()))?;
  let flow = loader.build(id).context("Failed to build flow")?;

  info!(flow = %flow.name(), artifact = %artifact.display(), "loaded flow");
  if !options.output.is_json() {
    print_info(&format!("Running {} ({})", flow.name(), flow.description()));
  }

  let outcome = match run(&flow, &mut context).await {
    Ok(summaries) => {
      report(options, &summaries, &context)?;
      Ok(())
    }
    Err(failure) => {
      report(options, &failure.summaries, &context)?;
      print_error(&failure.error.to_string());
      Err(anyhow!("Flow {} failed: {}", flow.name(), failure.error))
    }
  };

  // Values and flows built by the plugin must be gone before its library closes.
  drop(context);
  drop(flow);
  loader.release(id);

  outcome
}

fn report(options: &RunOptions, summaries: &[ExecutionSummary], context: &Context) -> Result<()> {
  if options.output.is_json() {
    let mut value = serde_json::json!({ "summaries": summaries });
    if options.print_context {
      let entries: serde_json::Map<_, _> = context
        .describe()
        .into_iter()
        .map(|(key, value)| (key, serde_json::Value::String(value)))
        .collect();
      value["context"] = serde_json::Value::Object(entries);
    }
    return print_json(&value);
  }

  print_summary_table(summaries);
  for summary in summaries {
    print_stat(summary.platform.as_str(), &format_duration(summary.total_time));
  }
  if options.print_context {
    print_context(context);
  }
  Ok(())
}
