mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stepwise_lib::plugin::DEFAULT_ENTRY_POINT;

use crate::cmd::{RunOptions, cmd_build, cmd_info, cmd_run};
use crate::output::OutputFormat;

/// stepwise - run build pipelines loaded from plugin libraries
#[derive(Parser)]
#[command(name = "stepwise")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a flow plugin, load it and run its flow
  Run {
    /// Cargo workspace or package containing the plugin
    #[arg(short, long, default_value = ".")]
    input_folder: PathBuf,

    /// Package name of the plugin
    #[arg(short, long, required_unless_present = "artifact")]
    product: Option<String>,

    /// Exported factory symbol
    #[arg(short, long, default_value = DEFAULT_ENTRY_POINT)]
    entry_point: String,

    /// Load this shared library instead of building
    #[arg(long)]
    artifact: Option<PathBuf>,

    /// Cargo profile used to build the plugin
    #[arg(long, default_value = "release")]
    profile: String,

    /// Context value as key=value (repeatable)
    #[arg(short, long = "context", value_name = "KEY=VALUE")]
    context: Vec<String>,

    /// Print the final context after the run
    #[arg(long)]
    print_context: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Build a flow plugin and print the path of its shared library
  Build {
    /// Cargo workspace or package containing the plugin
    #[arg(short, long, default_value = ".")]
    input_folder: PathBuf,

    /// Package name of the plugin
    #[arg(short, long)]
    product: String,

    /// Cargo profile
    #[arg(long, default_value = "release")]
    profile: String,
  },

  /// Display host and plugin ABI information
  Info,
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match cli.command {
    Commands::Run {
      input_folder,
      product,
      entry_point,
      artifact,
      profile,
      context,
      print_context,
      output,
    } => cmd_run(&RunOptions {
      input_folder,
      product,
      entry_point,
      artifact,
      profile,
      context,
      print_context,
      output,
    }),
    Commands::Build {
      input_folder,
      product,
      profile,
    } => cmd_build(&input_folder, &product, &profile),
    Commands::Info => {
      cmd_info();
      Ok(())
    }
  }
}
