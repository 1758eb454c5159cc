//! Implementation of the `stepwise build` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use stepwise_lib::plugin::{BuildOptions, build_product};

/// Build `product` in `input_folder` and return its shared library.
pub async fn build_plugin(input_folder: &Path, product: &str, profile: &str) -> Result<PathBuf> {
  let dir = dunce::canonicalize(input_folder)
    .with_context(|| format!("Input folder not found: {}", input_folder.display()))?;

  info!(product, dir = %dir.display(), profile, "building plugin");

  let options = BuildOptions {
    profile: profile.to_string(),
  };
  build_product(&dir, product, &options)
    .await
    .with_context(|| format!("Failed to build product {}", product))
}

pub fn cmd_build(input_folder: &Path, product: &str, profile: &str) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let artifact = rt.block_on(build_plugin(input_folder, product, profile))?;

  println!("{}", artifact.display());
  Ok(())
}
