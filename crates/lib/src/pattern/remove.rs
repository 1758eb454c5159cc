use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{PatternError, PatternMatcher, parse_pattern, relative_path, walk};

/// Remove every file and directory matching `pattern`.
///
/// A pattern without wildcards removes that single path, recursively if it
/// is a directory. Otherwise all non-hidden entries below the base path that
/// match are removed deepest first, so children always go before the
/// directories containing them.
///
/// Returns the number of entries removed; zero matches is not an error.
pub fn recursive_remove(pattern: &str) -> Result<usize, PatternError> {
  let parsed = parse_pattern(pattern)?;
  let base = Path::new(&parsed.base_path);

  if base.symlink_metadata().is_err() {
    return Err(PatternError::BasePathNotFound(base.to_path_buf()));
  }

  if parsed.is_literal(pattern) {
    remove_entry(base)?;
    info!(path = %base.display(), "remove finished, 1 item removed");
    return Ok(1);
  }

  let matcher = PatternMatcher::new(&parsed.match_pattern)?;
  let mut matches: Vec<(usize, PathBuf)> = Vec::new();

  for entry in walk(base) {
    let entry = entry?;
    if entry.depth() == 0 {
      continue;
    }
    if matcher.matches(&relative_path(entry.path(), base)) {
      matches.push((entry.depth(), entry.into_path()));
    }
  }

  // Deepest first; the sort is stable so siblings keep walk order.
  matches.sort_by(|a, b| b.0.cmp(&a.0));

  let mut removed = 0;
  for (_, path) in &matches {
    remove_entry(path)?;
    debug!(path = %relative_path(path, base), "removed");
    removed += 1;
  }

  info!(pattern = %pattern, removed, "remove finished");
  Ok(removed)
}

fn remove_entry(path: &Path) -> Result<(), PatternError> {
  let result = match path.symlink_metadata() {
    Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
    _ => fs::remove_file(path),
  };

  result.map_err(|source| PatternError::RemovalFailed {
    path: path.to_path_buf(),
    source,
  })
}
