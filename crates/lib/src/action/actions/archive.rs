//! Tar and zip archiving through the system `tar` and `zip` tools.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::action::{Action, ActionError, ActionReport, Argument};
use crate::context::Context;
use crate::platform::Platform;
use crate::shell::{self, ShellOptions};

use super::resolve_dir;

fn source_missing(path: &Path) -> ActionError {
  ActionError::Io(io::Error::new(
    io::ErrorKind::NotFound,
    format!("source does not exist: {}", path.display()),
  ))
}

fn current_dir() -> Result<PathBuf, ActionError> {
  Ok(std::env::current_dir()?)
}

/// Packs the contents of a directory into a tar archive.
///
/// Runs `tar -cvf <tar_path> -C <path> .` in the working directory, after
/// removing a stale archive at `tar_path`.
pub struct TarAction {
  hint: String,
  path: Argument<String>,
  tar_path: Argument<String>,
  working_directory: Option<PathBuf>,
}

impl TarAction {
  pub fn new(hint: impl Into<String>, path: impl Into<Argument<String>>, tar_path: impl Into<Argument<String>>) -> Self {
    Self {
      hint: hint.into(),
      path: path.into(),
      tar_path: tar_path.into(),
      working_directory: None,
    }
  }

  pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_directory = Some(dir.into());
    self
  }
}

#[async_trait]
impl Action for TarAction {
  fn name(&self) -> &'static str {
    "tar"
  }

  fn description(&self) -> &'static str {
    "Packs a directory into a tar archive"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  async fn execute(&self, context: &mut Context, _platform: Platform) -> Result<ActionReport, ActionError> {
    let working_directory = match &self.working_directory {
      Some(dir) => dir.clone(),
      None => current_dir()?,
    };
    let path = self.path.resolve(context)?;
    let tar_path = self.tar_path.resolve(context)?;

    let source = resolve_dir(Some(&working_directory), &path);
    if !tokio::fs::try_exists(&source).await? {
      return Err(source_missing(&source));
    }

    let destination = resolve_dir(Some(&working_directory), &tar_path);
    if tokio::fs::try_exists(&destination).await? {
      tokio::fs::remove_file(&destination).await?;
    }

    let source_arg = source.display().to_string();
    let args = ["-cvf", tar_path.as_str(), "-C", source_arg.as_str(), "."];
    shell::run_checked("tar", &args, &ShellOptions::captured().with_cwd(&working_directory)).await?;

    info!(archive = %destination.display(), "created tar archive");
    Ok(ActionReport::default())
  }
}

/// Parameters of a [`ZipAction`].
#[derive(Debug, Clone)]
pub struct ZipParams {
  /// File or directory to archive.
  pub path: String,
  /// Archive to create; defaults to `path` with a `.zip` extension.
  pub output_path: Option<String>,
  pub verbose: bool,
  pub password: Option<String>,
  /// Store symbolic links as links.
  pub symlinks: bool,
  /// Patterns, relative to the archived directory, to include.
  pub include: Vec<String>,
  /// Patterns, relative to the archived directory, to exclude.
  pub exclude: Vec<String>,
  pub working_directory: Option<PathBuf>,
}

impl ZipParams {
  pub fn new(path: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      output_path: None,
      verbose: true,
      password: None,
      symlinks: false,
      include: Vec::new(),
      exclude: Vec::new(),
      working_directory: None,
    }
  }

  fn working_directory(&self) -> Result<PathBuf, ActionError> {
    match &self.working_directory {
      Some(dir) => Ok(dir.clone()),
      None => current_dir(),
    }
  }

  /// Absolute path of the archived file or directory.
  pub fn source_path(&self) -> Result<PathBuf, ActionError> {
    Ok(resolve_dir(Some(&self.working_directory()?), &self.path))
  }

  /// The `zip` arguments and the directory to run them in.
  ///
  /// `zip` archives paths relative to where it runs, so the command runs in
  /// the parent of the source and names the source by its base name. The
  /// output directory is created if needed.
  pub fn build_command(&self) -> Result<(Vec<String>, PathBuf), ActionError> {
    let working_directory = self.working_directory()?;
    let source = self.source_path()?;

    let output = match &self.output_path {
      Some(output) => resolve_dir(Some(&working_directory), output),
      None if source.extension().is_some_and(|ext| ext == "zip") => source.clone(),
      None => PathBuf::from(format!("{}.zip", source.display())),
    };

    if let Some(parent) = output.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let mut options = String::from(if self.verbose { "-r" } else { "-rq" });
    if self.symlinks {
      options.push('y');
    }

    let mut command = vec![options];
    if let Some(password) = &self.password {
      command.push("-P".to_string());
      command.push(password.clone());
    }
    command.push(output.display().to_string());

    let base_name = source
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .ok_or_else(|| ActionError::msg(format!("no file name in {}", source.display())))?;
    command.push(base_name.clone());

    if !self.include.is_empty() {
      command.push("-i".to_string());
      command.extend(self.include.iter().map(|p| format!("{}/{}", base_name, p)));
    }
    if !self.exclude.is_empty() {
      command.push("-x".to_string());
      command.extend(self.exclude.iter().map(|p| format!("{}/{}", base_name, p)));
    }

    let source_directory = source.parent().map(Path::to_path_buf).unwrap_or(working_directory);
    Ok((command, source_directory))
  }
}

/// Compresses a file or directory into a zip archive with the system `zip`.
pub struct ZipAction {
  hint: String,
  params: ZipParams,
}

impl ZipAction {
  pub fn new(hint: impl Into<String>, params: ZipParams) -> Self {
    Self {
      hint: hint.into(),
      params,
    }
  }
}

#[async_trait]
impl Action for ZipAction {
  fn name(&self) -> &'static str {
    "zip"
  }

  fn description(&self) -> &'static str {
    "Compress a file or folder to a zip archive"
  }

  fn hint(&self) -> &str {
    &self.hint
  }

  fn is_supported(&self, platform: Platform) -> bool {
    platform != Platform::Ios
  }

  async fn execute(&self, _context: &mut Context, _platform: Platform) -> Result<ActionReport, ActionError> {
    let source = self.params.source_path()?;
    if !tokio::fs::try_exists(&source).await? {
      return Err(source_missing(&source));
    }

    let (args, source_directory) = self.params.build_command()?;
    info!(args = %args.join(" "), cwd = %source_directory.display(), "executing zip");

    shell::run_checked("zip", &args, &ShellOptions::captured().with_cwd(source_directory)).await?;

    info!(hint = %self.hint, "created zip archive");
    Ok(ActionReport::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn params_in(dir: &Path, path: &str) -> ZipParams {
    ZipParams {
      working_directory: Some(dir.to_path_buf()),
      ..ZipParams::new(path)
    }
  }

  #[test]
  fn zip_command_defaults() {
    let temp = TempDir::new().unwrap();
    let params = params_in(temp.path(), "dist/app");

    let (command, cwd) = params.build_command().unwrap();

    let output = format!("{}/dist/app.zip", temp.path().display());
    assert_eq!(command, vec!["-r".to_string(), output, "app".to_string()]);
    assert_eq!(cwd, temp.path().join("dist"));
  }

  #[test]
  fn zip_command_with_all_options() {
    let temp = TempDir::new().unwrap();
    let params = ZipParams {
      output_path: Some("out/release.zip".to_string()),
      verbose: false,
      password: Some("secret".to_string()),
      symlinks: true,
      include: vec!["*.so".to_string()],
      exclude: vec!["*.tmp".to_string(), "cache/*".to_string()],
      ..params_in(temp.path(), "app")
    };

    let (command, _) = params.build_command().unwrap();

    let output = format!("{}/out/release.zip", temp.path().display());
    assert_eq!(
      command,
      vec![
        "-rqy", "-P", "secret", output.as_str(), "app", "-i", "app/*.so", "-x", "app/*.tmp", "app/cache/*"
      ]
    );
    assert!(temp.path().join("out").is_dir());
  }

  #[test]
  fn zip_source_already_zip_is_not_suffixed() {
    let temp = TempDir::new().unwrap();
    let params = params_in(temp.path(), "bundle.zip");

    let (command, _) = params.build_command().unwrap();

    assert_eq!(command[1], format!("{}/bundle.zip", temp.path().display()));
  }

  #[test]
  fn zip_is_not_supported_on_ios() {
    let action = ZipAction::new("zip", ZipParams::new("x"));
    assert!(!action.is_supported(Platform::Ios));
    assert!(action.is_supported(Platform::MacOs));
  }

  #[tokio::test]
  async fn zip_missing_source_fails() {
    let temp = TempDir::new().unwrap();
    let action = ZipAction::new("zip", params_in(temp.path(), "missing"));
    let mut ctx = Context::new();

    let result = action.execute(&mut ctx, Platform::Linux).await;

    assert!(matches!(result, Err(ActionError::Io(e)) if e.kind() == io::ErrorKind::NotFound));
  }

  #[tokio::test]
  async fn tar_missing_source_fails() {
    let temp = TempDir::new().unwrap();
    let action = TarAction::new("tar", "missing", "out.tar").in_dir(temp.path());
    let mut ctx = Context::new();

    let result = action.execute(&mut ctx, Platform::Linux).await;

    assert!(matches!(result, Err(ActionError::Io(e)) if e.kind() == io::ErrorKind::NotFound));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn tar_packs_directory_and_replaces_stale_archive() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("payload")).unwrap();
    std::fs::write(temp.path().join("payload/file.txt"), "data").unwrap();
    std::fs::write(temp.path().join("out.tar"), "stale").unwrap();
    let action = TarAction::new("tar", "payload", Argument::<String>::key("archive")).in_dir(temp.path());
    let mut ctx = Context::new();
    ctx.put("archive", "out.tar".to_string());

    action.execute(&mut ctx, Platform::Linux).await.unwrap();

    let size = std::fs::metadata(temp.path().join("out.tar")).unwrap().len();
    assert!(size > "stale".len() as u64);
  }
}
