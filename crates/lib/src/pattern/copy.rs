use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::{PatternError, PatternMatcher, WildcardMode, has_wildcard, parse_pattern, relative_path, walk};

/// Copy every file matching `source_pattern` into `destination_dir`.
///
/// When the base path of the pattern is a plain file it is copied directly
/// under its own name. Otherwise every non-hidden file below the base path
/// that matches is copied, keeping the directory structure selected by
/// `wildcard_mode`. Existing destination entries are replaced.
///
/// Returns the number of files copied; zero matches is not an error.
pub fn recursive_copy(
  source_pattern: &str,
  destination_dir: &Path,
  wildcard_mode: WildcardMode,
) -> Result<usize, PatternError> {
  let parsed = parse_pattern(source_pattern)?;
  let base = Path::new(&parsed.base_path);

  let metadata = fs::metadata(base).map_err(|_| PatternError::BasePathNotFound(base.to_path_buf()))?;

  create_dir_all(destination_dir)?;

  if !metadata.is_dir() {
    let file_name = base
      .file_name()
      .ok_or_else(|| PatternError::InvalidPattern(format!("no file name in {}", parsed.base_path)))?;
    let destination = destination_dir.join(file_name);
    replace_with_copy(base, &destination)?;
    info!(source = %base.display(), destination = %destination.display(), "copy finished, 1 file copied");
    return Ok(1);
  }

  let matcher = PatternMatcher::new(&parsed.match_pattern)?;
  let mut copied = 0;

  for entry in walk(base) {
    let entry = entry?;
    if entry.file_type().is_dir() {
      continue;
    }

    let relative = relative_path(entry.path(), base);
    if !matcher.matches(&relative) {
      continue;
    }

    let destination_relative = destination_relative_path(&relative, &parsed.match_pattern, wildcard_mode);
    let destination = destination_dir.join(&destination_relative);
    if let Some(parent) = destination.parent() {
      create_dir_all(parent)?;
    }

    replace_with_copy(entry.path(), &destination)?;
    debug!(path = %destination_relative, "copied");
    copied += 1;
  }

  info!(pattern = %source_pattern, copied, "copy finished");
  Ok(copied)
}

/// Path below the destination directory for a matched file.
///
/// In [`WildcardMode::Last`] the leading components up to (not including)
/// the last wildcard component of the match pattern are dropped, so for
/// pattern `*/*/c/*.txt` the file `a/b/c/file1.txt` lands at `file1.txt`.
fn destination_relative_path(relative: &str, match_pattern: &str, mode: WildcardMode) -> String {
  match mode {
    WildcardMode::First => relative.to_string(),
    WildcardMode::Last => {
      let pattern_components: Vec<&str> = match_pattern.split('/').collect();
      let Some(last_wildcard) = pattern_components.iter().rposition(|c| has_wildcard(c)) else {
        return relative.to_string();
      };

      let components: Vec<&str> = relative.split('/').collect();
      if components.len() <= last_wildcard {
        return relative.to_string();
      }

      components[last_wildcard..].join("/")
    }
  }
}

fn create_dir_all(path: &Path) -> Result<(), PatternError> {
  if path.is_dir() {
    return Ok(());
  }
  fs::create_dir_all(path).map_err(|source| PatternError::DirectoryCreationFailed {
    path: path.to_path_buf(),
    source,
  })
}

fn replace_with_copy(from: &Path, to: &Path) -> Result<(), PatternError> {
  if let Ok(existing) = to.symlink_metadata() {
    let removed = if existing.is_dir() {
      fs::remove_dir_all(to)
    } else {
      fs::remove_file(to)
    };
    removed.map_err(|source| PatternError::RemovalFailed {
      path: to.to_path_buf(),
      source,
    })?;
  }

  fs::copy(from, to).map_err(|source| PatternError::CopyFailed {
    from: from.to_path_buf(),
    to: to.to_path_buf(),
    source,
  })?;

  Ok(())
}
