//! Target platforms a flow can be declared for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A platform a flow can run its actions for.
///
/// Flows list the platforms they support; the runner executes the flow once
/// per platform, in declaration order. The platform is a build *target*, so
/// `Ios` is a valid value even though the host can never be iOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
  Ios,
  MacOs,
  Linux,
  Windows,
}

impl Platform {
  /// All platforms, in a stable order.
  pub const ALL: [Platform; 4] = [Platform::Ios, Platform::MacOs, Platform::Linux, Platform::Windows];

  /// Detect the platform of the running host.
  ///
  /// Returns `None` if the host OS is not supported.
  pub fn host() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this platform
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Ios => "ios",
      Self::MacOs => "macos",
      Self::Linux => "linux",
      Self::Windows => "windows",
    }
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
  type Err = UnknownPlatform;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "ios" => Ok(Self::Ios),
      "macos" | "darwin" => Ok(Self::MacOs),
      "linux" => Ok(Self::Linux),
      "windows" => Ok(Self::Windows),
      _ => Err(UnknownPlatform(s.to_string())),
    }
  }
}

/// File name prefix of shared libraries on the host (`lib` on Unix).
pub fn shared_library_prefix() -> &'static str {
  std::env::consts::DLL_PREFIX
}

/// File extension of shared libraries on the host, without the dot.
pub fn shared_library_extension() -> &'static str {
  std::env::consts::DLL_EXTENSION
}
