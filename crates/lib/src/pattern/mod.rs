//! Wildcard path patterns for file copy and removal.
//!
//! A pattern is a `/` separated path whose components may contain wildcards:
//!
//! - `?` matches exactly one character other than `/`
//! - `*` matches zero or more characters other than `/`
//! - `**` matches zero or more characters, including `/`
//!
//! Every other character matches itself. A pattern is split into a *base
//! path* (the leading components without wildcards, which must exist on disk)
//! and a *match pattern* applied to paths relative to the base.
//!
//! ```text
//! build/output/**/*.dylib
//! ^^^^^^^^^^^^ ^^^^^^^^^^
//! base path    match pattern
//! ```

mod copy;
mod remove;

pub use copy::recursive_copy;
pub use remove::recursive_remove;

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum PatternError {
  /// The base path of the pattern does not exist.
  #[error("base path not found: {}", .0.display())]
  BasePathNotFound(PathBuf),

  #[error("failed to create directory {}: {source}", path.display())]
  DirectoryCreationFailed {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid pattern: {0}")]
  InvalidPattern(String),

  #[error("failed to enumerate {}: {message}", path.display())]
  EnumerationFailed { path: PathBuf, message: String },

  #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
  CopyFailed {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove {}: {source}", path.display())]
  RemovalFailed {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// How much of a matched file's directory structure survives a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WildcardMode {
  /// Keep the whole path relative to the base path.
  #[default]
  First,
  /// Keep only the components from the last wildcard component onwards.
  Last,
}

impl fmt::Display for WildcardMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WildcardMode::First => write!(f, "first"),
      WildcardMode::Last => write!(f, "last"),
    }
  }
}

impl FromStr for WildcardMode {
  type Err = PatternError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "first" => Ok(WildcardMode::First),
      "last" => Ok(WildcardMode::Last),
      other => Err(PatternError::InvalidPattern(format!("unknown wildcard mode: {}", other))),
    }
  }
}

/// A pattern split into the directory to search and what to match inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPattern {
  pub base_path: String,
  pub match_pattern: String,
}

impl ParsedPattern {
  /// True when the pattern had no wildcard at all and names a single path.
  pub fn is_literal(&self, pattern: &str) -> bool {
    self.base_path == pattern
  }
}

fn has_wildcard(component: &str) -> bool {
  component.contains(['*', '?'])
}

/// Split `pattern` into its base path and match pattern.
///
/// A pattern without wildcards is its own base path, matched with `*`.
/// Fails when the first component already has a wildcard, because no
/// directory can be inferred to search in.
pub fn parse_pattern(pattern: &str) -> Result<ParsedPattern, PatternError> {
  let components: Vec<&str> = pattern.split('/').collect();

  let Some(first_wildcard) = components.iter().position(|c| has_wildcard(c)) else {
    return Ok(ParsedPattern {
      base_path: pattern.to_string(),
      match_pattern: "*".to_string(),
    });
  };

  let base_path = components[..first_wildcard].join("/");
  if base_path.is_empty() {
    return Err(PatternError::InvalidPattern(format!(
      "can't infer base path from pattern: {}",
      pattern
    )));
  }

  Ok(ParsedPattern {
    base_path,
    match_pattern: components[first_wildcard..].join("/"),
  })
}

/// A compiled match pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
  regex: Regex,
}

impl PatternMatcher {
  pub fn new(match_pattern: &str) -> Result<Self, PatternError> {
    let regex = Regex::new(&wildcard_to_regex(match_pattern))
      .map_err(|e| PatternError::InvalidPattern(format!("{}: {}", match_pattern, e)))?;
    Ok(Self { regex })
  }

  /// Match a `/` separated path relative to the base path.
  pub fn matches(&self, relative_path: &str) -> bool {
    self.regex.is_match(relative_path)
  }
}

fn wildcard_to_regex(pattern: &str) -> String {
  let mut regex = String::from("^");
  let mut chars = pattern.chars().peekable();

  while let Some(c) = chars.next() {
    match c {
      '*' if chars.peek() == Some(&'*') => {
        chars.next();
        regex.push_str(".*");
      }
      '*' => regex.push_str("[^/]*"),
      '?' => regex.push_str("[^/]"),
      other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
    }
  }

  regex.push('$');
  regex
}

/// `path` relative to `base`, with `/` separators and no leading separator.
///
/// Paths outside `base` are returned whole.
pub fn relative_path(path: &Path, base: &Path) -> String {
  let relative = path.strip_prefix(base).unwrap_or(path);
  relative
    .components()
    .filter_map(|component| match component {
      Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
      Component::ParentDir => Some("..".to_string()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}

/// Whether `path`, taken relative to `base_path`, matches `match_pattern`.
pub fn matches_pattern(path: &Path, base_path: &Path, match_pattern: &str) -> bool {
  match PatternMatcher::new(match_pattern) {
    Ok(matcher) => matcher.matches(&relative_path(path, base_path)),
    Err(_) => false,
  }
}

fn is_hidden(entry: &DirEntry) -> bool {
  entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Walk everything below `base`, skipping hidden entries and their children.
///
/// The base itself is yielded at depth 0 and is never treated as hidden.
fn walk(base: &Path) -> impl Iterator<Item = Result<DirEntry, PatternError>> {
  let base_path = base.to_path_buf();
  WalkDir::new(base)
    .into_iter()
    .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
    .map(move |entry| {
      entry.map_err(|e| PatternError::EnumerationFailed {
        path: base_path.clone(),
        message: e.to_string(),
      })
    })
}
