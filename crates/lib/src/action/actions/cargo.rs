use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::action::{Action, ActionError, ActionReport, Argument};
use crate::context::Context;
use crate::platform::Platform;
use crate::plugin::package::{self, cargo_bin};
use crate::shell::{self, ShellOptions};

/// A cargo operation performed by [`CargoAction`].
#[derive(Debug, Clone)]
pub enum CargoJob {
  /// `cargo build -p <package>`; a `profile` other than `dev` is passed on.
  Build {
    package: Argument<String>,
    profile: Option<String>,
  },
  /// Store the workspace target directory as a `String` under `to_key`.
  GatherTargetDir { to_key: String },
  /// Store the decoded [`CargoMetadata`](crate::plugin::CargoMetadata) under `to_key`.
  GatherMetadata { to_key: String },
}

/// Builds cargo packages and reads workspace metadata.
pub struct CargoAction {
  hint: String,
  job: CargoJob,
  working_directory: Option<PathBuf>,
}

impl CargoAction {
  pub fn new(hint: impl Into<String>, job: CargoJob) -> Self {
    Self {
      hint: hint.into(),
      job,
      working_directory: None,
    }
  }

  pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_directory = Some(dir.into());
    self
  }

  fn working_directory(&self) -> Result<PathBuf, ActionError> {
    match &self.working_directory {
      Some(dir) => Ok(dir.clone()),
      None => Ok(std::env::current_dir()?),
    }
  }
}

#[async_trait]
impl Action for CargoAction {
  fn name(&self) -> &'static str {
    "cargo"
  }

  fn description(&self) -> &'static str {
    "Builds cargo packages and gathers workspace metadata"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  async fn execute(&self, context: &mut Context, _platform: Platform) -> Result<ActionReport, ActionError> {
    let dir = self.working_directory()?;

    match &self.job {
      CargoJob::Build { package, profile } => {
        let package = package.resolve(context)?;
        let mut args = vec!["build".to_string(), "-p".to_string(), package.clone()];
        match profile.as_deref() {
          None | Some("dev") => {}
          Some("release") => args.push("--release".to_string()),
          Some(other) => {
            args.push("--profile".to_string());
            args.push(other.to_string());
          }
        }
        info!(package = %package, profile = ?profile, "building package");
        shell::run_checked(&cargo_bin(), &args, &ShellOptions::default().with_cwd(&dir)).await?;
      }

      CargoJob::GatherTargetDir { to_key } => {
        let metadata = package::load_manifest(&dir).await?;
        let target = metadata.target_directory.display().to_string();
        info!(key = %to_key, target = %target, "gathered target directory");
        context.put(to_key.clone(), target);
      }

      CargoJob::GatherMetadata { to_key } => {
        let metadata = package::load_manifest(&dir).await?;
        info!(key = %to_key, packages = metadata.packages.len(), "gathered cargo metadata");
        context.put(to_key.clone(), metadata);
      }
    }

    Ok(ActionReport::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::plugin::CargoMetadata;
  use serial_test::serial;
  use std::path::Path;

  fn manifest_dir() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
  }

  #[tokio::test]
  #[serial]
  async fn gathers_target_directory() {
    let action = CargoAction::new(
      "target",
      CargoJob::GatherTargetDir {
        to_key: "target_dir".to_string(),
      },
    )
    .in_dir(manifest_dir());
    let mut ctx = Context::new();

    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    let target = ctx.get::<String>("target_dir").unwrap();
    assert!(!target.is_empty());
  }

  #[tokio::test]
  #[serial]
  async fn gathers_metadata() {
    let action = CargoAction::new(
      "metadata",
      CargoJob::GatherMetadata {
        to_key: "metadata".to_string(),
      },
    )
    .in_dir(manifest_dir());
    let mut ctx = Context::new();

    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    let metadata = ctx.get::<CargoMetadata>("metadata").unwrap();
    assert!(metadata.package("stepwise-lib").is_some());
  }

  #[tokio::test]
  async fn build_without_package_fails() {
    let action = CargoAction::new(
      "build",
      CargoJob::Build {
        package: Argument::key("package"),
        profile: None,
      },
    );
    let mut ctx = Context::new();

    let result = action.execute(&mut ctx, Platform::Linux).await;

    assert!(matches!(result, Err(ActionError::MissingArgument(_))));
  }
}
