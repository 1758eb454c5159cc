//! Building plugin libraries with cargo.
//!
//! [`build_product`] checks that a product is a package of the workspace with
//! a `cdylib` target, builds it, and finds the produced shared library.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::platform::{shared_library_extension, shared_library_prefix};
use crate::shell::{self, ShellError, ShellOptions};

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("cargo failed: {0}")]
  Cargo(#[from] ShellError),

  #[error("failed to decode cargo metadata: {0}")]
  Metadata(#[from] serde_json::Error),

  /// No package with that name, or it has no `cdylib` target.
  #[error("no cdylib product named {product} in {}", dir.display())]
  NoSuchProduct { product: String, dir: PathBuf },

  #[error("no shared library for {product} in {}", dir.display())]
  BinaryProductMissing { product: String, dir: PathBuf },

  #[error("ambiguous shared library for {product}: {}", candidates.join(", "))]
  AmbiguousProduct { product: String, candidates: Vec<String> },
}

/// The subset of `cargo metadata --format-version 1` output we use.
#[derive(Debug, Clone, Deserialize)]
pub struct CargoMetadata {
  pub packages: Vec<CargoPackage>,
  pub target_directory: PathBuf,
  pub workspace_root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CargoPackage {
  pub name: String,
  pub version: String,
  pub manifest_path: PathBuf,
  pub targets: Vec<CargoTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CargoTarget {
  pub name: String,
  pub kind: Vec<String>,
  #[serde(default)]
  pub crate_types: Vec<String>,
}

impl CargoMetadata {
  pub fn package(&self, name: &str) -> Option<&CargoPackage> {
    self.packages.iter().find(|package| package.name == name)
  }
}

impl CargoPackage {
  /// The library target that builds a `cdylib`, if any.
  pub fn cdylib_target(&self) -> Option<&CargoTarget> {
    self
      .targets
      .iter()
      .find(|target| target.crate_types.iter().chain(&target.kind).any(|t| t == "cdylib"))
  }
}

impl CargoTarget {
  /// File stem of the produced library, without platform prefix.
  pub fn library_name(&self) -> String {
    self.name.replace('-', "_")
  }
}

/// Options for [`build_product`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Cargo profile; `dev` builds land in `debug`.
  pub profile: String,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      profile: "release".to_string(),
    }
  }
}

impl BuildOptions {
  fn profile_args(&self) -> Vec<String> {
    match self.profile.as_str() {
      "release" => vec!["--release".to_string()],
      "dev" | "debug" => Vec::new(),
      other => vec!["--profile".to_string(), other.to_string()],
    }
  }

  fn output_dir_name(&self) -> &str {
    match self.profile.as_str() {
      "dev" | "debug" => "debug",
      other => other,
    }
  }
}

/// The cargo binary: `$CARGO` if set, otherwise `cargo` from `PATH`.
pub fn cargo_bin() -> String {
  std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string())
}

/// Read the manifest of the workspace or package in `dir`.
pub async fn load_manifest(dir: &Path) -> Result<CargoMetadata, PackageError> {
  let options = ShellOptions::captured().with_cwd(dir);
  let output = shell::run_checked(
    &cargo_bin(),
    &["metadata", "--format-version", "1", "--no-deps"],
    &options,
  )
  .await?;

  Ok(serde_json::from_str(&output.stdout)?)
}

/// Build `product` in `dir` and return the path of its shared library.
pub async fn build_product(dir: &Path, product: &str, options: &BuildOptions) -> Result<PathBuf, PackageError> {
  let metadata = load_manifest(dir).await?;

  let target = metadata
    .package(product)
    .and_then(CargoPackage::cdylib_target)
    .ok_or_else(|| PackageError::NoSuchProduct {
      product: product.to_string(),
      dir: dir.to_path_buf(),
    })?;

  info!(product, profile = %options.profile, "building product");

  let mut args = vec!["build".to_string(), "--lib".to_string(), "-p".to_string(), product.to_string()];
  args.extend(options.profile_args());
  shell::run_checked(&cargo_bin(), &args, &ShellOptions::default().with_cwd(dir)).await?;

  let output_dir = metadata.target_directory.join(options.output_dir_name());
  locate_artifact(&output_dir, &target.library_name())
}

/// Find the shared library for `library_name` in `dir`.
///
/// Candidates are files with the host's shared library extension whose name
/// contains `library_name`. The exact `{prefix}{library_name}.{ext}` wins;
/// otherwise there must be exactly one candidate.
pub fn locate_artifact(dir: &Path, library_name: &str) -> Result<PathBuf, PackageError> {
  let missing = || PackageError::BinaryProductMissing {
    product: library_name.to_string(),
    dir: dir.to_path_buf(),
  };

  let entries = fs::read_dir(dir).map_err(|e| {
    debug!(dir = %dir.display(), error = %e, "cannot read output directory");
    missing()
  })?;

  let extension = shared_library_extension();
  let exact = format!("{}{}.{}", shared_library_prefix(), library_name, extension);

  let mut candidates: Vec<String> = entries
    .filter_map(Result::ok)
    .filter(|entry| entry.file_type().is_ok_and(|t| !t.is_dir()))
    .filter_map(|entry| entry.file_name().into_string().ok())
    .filter(|name| name.contains(library_name))
    .filter(|name| Path::new(name).extension().is_some_and(|ext| ext == extension))
    .collect();
  candidates.sort();

  if candidates.iter().any(|name| *name == exact) {
    return Ok(dir.join(exact));
  }

  match candidates.len() {
    0 => Err(missing()),
    1 => Ok(dir.join(&candidates[0])),
    _ => {
      warn!(library = library_name, ?candidates, "ambiguous shared library");
      Err(PackageError::AmbiguousProduct {
        product: library_name.to_string(),
        candidates,
      })
    }
  }
}
