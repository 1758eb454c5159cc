use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::task::spawn_blocking;
use tracing::info;

use crate::action::{Action, ActionError, ActionReport, Argument};
use crate::context::Context;
use crate::pattern::{self, WildcardMode};
use crate::platform::Platform;

use super::{resolve_dir, resolve_path};

/// A file operation performed by [`FileAction`].
#[derive(Debug, Clone)]
pub enum FileJob {
  /// Create a directory. With `ensure_created` missing parents are created
  /// and an existing directory is fine, like `mkdir -p`.
  MakeDirectory { path: Argument<String>, ensure_created: bool },
  /// Copy everything matching the `from` pattern into the `to` directory.
  Copy {
    from: Argument<String>,
    to: Argument<String>,
    wildcard_mode: WildcardMode,
  },
  /// Remove everything matching `pattern`.
  Remove { pattern: Argument<String> },
}

/// Predefined file operations. Relative paths are taken from the working
/// directory when one is set.
pub struct FileAction {
  hint: String,
  job: FileJob,
  working_directory: Option<PathBuf>,
}

impl FileAction {
  pub fn new(hint: impl Into<String>, job: FileJob) -> Self {
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

  fn working_directory(&self) -> Option<&Path> {
    self.working_directory.as_deref()
  }
}

#[async_trait]
impl Action for FileAction {
  fn name(&self) -> &'static str {
    "file"
  }

  fn description(&self) -> &'static str {
    "Action to execute some predefined file operations"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  async fn execute(&self, context: &mut Context, _platform: Platform) -> Result<ActionReport, ActionError> {
    match &self.job {
      FileJob::MakeDirectory { path, ensure_created } => {
        let path = resolve_dir(self.working_directory(), &path.resolve(context)?);
        info!(path = %path.display(), ensure_created, "creating directory");
        if *ensure_created {
          tokio::fs::create_dir_all(&path).await?;
        } else {
          tokio::fs::create_dir(&path).await?;
        }
      }

      FileJob::Copy { from, to, wildcard_mode } => {
        let from = resolve_path(self.working_directory(), &from.resolve(context)?);
        let to = resolve_dir(self.working_directory(), &to.resolve(context)?);
        let mode = *wildcard_mode;
        spawn_blocking(move || pattern::recursive_copy(&from, &to, mode)).await??;
      }

      FileJob::Remove { pattern } => {
        let pattern = resolve_path(self.working_directory(), &pattern.resolve(context)?);
        spawn_blocking(move || pattern::recursive_remove(&pattern)).await??;
      }
    }

    Ok(ActionReport::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pattern::PatternError;
  use std::fs;
  use tempfile::TempDir;

  #[tokio::test]
  async fn make_directory_with_parents() {
    let temp = TempDir::new().unwrap();
    let action = FileAction::new(
      "mkdir",
      FileJob::MakeDirectory {
        path: "a/b/c".into(),
        ensure_created: true,
      },
    )
    .in_dir(temp.path());
    let mut ctx = Context::new();

    action.execute(&mut ctx, Platform::Linux).await.unwrap();
    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    assert!(temp.path().join("a/b/c").is_dir());
  }

  #[tokio::test]
  async fn make_directory_without_ensure_fails_on_missing_parent() {
    let temp = TempDir::new().unwrap();
    let action = FileAction::new(
      "mkdir",
      FileJob::MakeDirectory {
        path: "a/b".into(),
        ensure_created: false,
      },
    )
    .in_dir(temp.path());
    let mut ctx = Context::new();

    let result = action.execute(&mut ctx, Platform::Linux).await;

    assert!(matches!(result, Err(ActionError::Io(_))));
  }

  #[tokio::test]
  async fn copy_uses_context_paths() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("src/nested")).unwrap();
    fs::write(temp.path().join("src/nested/lib.so"), "bin").unwrap();
    let action = FileAction::new(
      "copy",
      FileJob::Copy {
        from: "src/**.so".into(),
        to: Argument::key("dest"),
        wildcard_mode: WildcardMode::Last,
      },
    )
    .in_dir(temp.path());
    let mut ctx = Context::new();
    ctx.put("dest", "out".to_string());

    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    // The part matched by the trailing `**` is kept below the destination.
    assert!(temp.path().join("out/nested/lib.so").exists());
    assert!(!temp.path().join("out/lib.so").exists());
  }

  #[tokio::test]
  async fn copy_with_missing_argument_fails() {
    let action = FileAction::new(
      "copy",
      FileJob::Copy {
        from: Argument::key("absent"),
        to: "out".into(),
        wildcard_mode: WildcardMode::First,
      },
    );
    let mut ctx = Context::new();

    let result = action.execute(&mut ctx, Platform::Linux).await;

    assert!(matches!(result, Err(ActionError::MissingArgument(_))));
  }

  #[tokio::test]
  async fn remove_by_pattern() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("build")).unwrap();
    fs::write(temp.path().join("build/a.o"), "").unwrap();
    fs::write(temp.path().join("build/keep.txt"), "").unwrap();
    let action = FileAction::new("clean", FileJob::Remove { pattern: "build/*.o".into() }).in_dir(temp.path());
    let mut ctx = Context::new();

    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    assert!(!temp.path().join("build/a.o").exists());
    assert!(temp.path().join("build/keep.txt").exists());
  }

  #[tokio::test]
  async fn remove_missing_base_fails() {
    let temp = TempDir::new().unwrap();
    let action = FileAction::new("clean", FileJob::Remove { pattern: "nowhere/*".into() }).in_dir(temp.path());
    let mut ctx = Context::new();

    let result = action.execute(&mut ctx, Platform::Linux).await;

    assert!(matches!(result, Err(ActionError::Pattern(PatternError::BasePathNotFound(_)))));
  }
}
