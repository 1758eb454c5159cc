//! Built-in leaf actions.
//!
//! - [`echo`] - print a message or a context value
//! - [`shell`] - run an external command, optionally capturing its output
//! - [`adhoc`] - wrap a closure as a step
//! - [`file`] - make directories, copy and remove with wildcard patterns
//! - [`archive`] - tar and zip archives
//! - [`cargo`] - build cargo packages and read their metadata

pub mod adhoc;
pub mod archive;
pub mod cargo;
pub mod echo;
pub mod file;
pub mod shell;

pub use adhoc::AdHocAction;
pub use archive::{TarAction, ZipAction, ZipParams};
pub use cargo::{CargoAction, CargoJob};
pub use echo::EchoAction;
pub use file::{FileAction, FileJob};
pub use shell::ShellAction;

use std::path::{Path, PathBuf};

/// Resolve `path` against an optional working directory.
///
/// Absolute paths and paths without a working directory are returned as-is.
/// Joining keeps `/` so the result is still a valid wildcard pattern.
pub(crate) fn resolve_path(working_directory: Option<&Path>, path: &str) -> String {
  match working_directory {
    Some(dir) if !Path::new(path).is_absolute() => format!("{}/{}", dir.display(), path),
    _ => path.to_string(),
  }
}

pub(crate) fn resolve_dir(working_directory: Option<&Path>, path: &str) -> PathBuf {
  PathBuf::from(resolve_path(working_directory, path))
}
