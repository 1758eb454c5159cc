//! Loading flows from separately built shared libraries.
//!
//! A plugin is a `cdylib` that exports a flow factory with
//! [`export_flow!`](crate::export_flow). The host opens the library, resolves
//! the factory, takes ownership of the builder it returns, and builds flows
//! from it. Flows keep their library open, so a library is only closed once
//! every flow built from it is gone.
//!
//! [`PluginLoader`] owns all loaded plugins of a process and releases them in
//! reverse load order.

mod abi;
mod host;
pub mod package;

pub use abi::{ABI_VERSION, DEFAULT_ENTRY_POINT, FlowFactory, OwnedFlowBuilder, RawFlowBuilder, into_raw};
pub use host::{HostContext, HostedFlow};
pub use package::{BuildOptions, CargoMetadata, PackageError, build_product, load_manifest, locate_artifact};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use thiserror::Error;
use tracing::{debug, info};

use crate::action::Action;
use crate::context::Context;
use crate::execute::FlowError;
use crate::flow::Flow;
use crate::platform::Platform;

#[derive(Debug, Error)]
pub enum PluginError {
  /// The library could not be opened: missing file, wrong architecture or
  /// unresolved dependencies.
  #[error("failed to load library {}: {message}", path.display())]
  LibraryLoad { path: PathBuf, message: String },

  #[error("symbol {symbol} not found in {}: {message}", path.display())]
  SymbolNotFound {
    path: PathBuf,
    symbol: String,
    message: String,
  },

  /// No builder is available: the plugin was never loaded or was released.
  #[error("plugin is not loaded")]
  NotLoaded,

  #[error("factory {symbol} returned a null builder")]
  NullHandle { symbol: String },

  #[error("plugin ABI version {found} does not match host ABI version {expected}")]
  AbiMismatch { expected: u32, found: u32 },
}

/// A flow built by a plugin. Keeps the plugin's library loaded.
pub struct LoadedFlow {
  // Dropped before the library, which holds its code.
  flow: Box<dyn Flow>,
  _library: Arc<Library>,
}

impl Flow for LoadedFlow {
  fn name(&self) -> &str {
    self.flow.name()
  }

  fn description(&self) -> &str {
    self.flow.description()
  }

  fn platforms(&self) -> &[Platform] {
    self.flow.platforms()
  }

  fn actions(&self, context: &Context, platform: Platform) -> Result<Vec<Box<dyn Action>>, FlowError> {
    self.flow.actions(context, platform)
  }
}

/// One plugin library and the builder it vended.
pub struct Plugin {
  path: PathBuf,
  entry_point: String,
  // Released before the library is closed.
  builder: Option<OwnedFlowBuilder>,
  library: Option<Arc<Library>>,
}

impl Plugin {
  pub fn new(path: impl Into<PathBuf>, entry_point: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      entry_point: entry_point.into(),
      builder: None,
      library: None,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn entry_point(&self) -> &str {
    &self.entry_point
  }

  pub fn is_loaded(&self) -> bool {
    self.builder.is_some()
  }

  /// Open the library. Does nothing if it is already open.
  pub fn load_library(&mut self) -> Result<(), PluginError> {
    if self.library.is_some() {
      return Ok(());
    }

    debug!(path = %self.path.display(), "opening library");
    // SAFETY: opening a library runs its initializers; plugins are trusted code.
    let library = unsafe { Library::new(&self.path) }.map_err(|e| PluginError::LibraryLoad {
      path: self.path.clone(),
      message: e.to_string(),
    })?;

    self.library = Some(Arc::new(library));
    Ok(())
  }

  /// Resolve the entry point and take ownership of the builder it returns.
  pub fn make_flow_builder(&mut self) -> Result<(), PluginError> {
    let library = self.library.as_ref().ok_or(PluginError::NotLoaded)?;

    // SAFETY: the symbol is declared by `export_flow!` with the FlowFactory signature.
    let factory: FlowFactory = unsafe {
      let symbol = library
        .get::<FlowFactory>(self.entry_point.as_bytes())
        .map_err(|e| PluginError::SymbolNotFound {
          path: self.path.clone(),
          symbol: self.entry_point.clone(),
          message: e.to_string(),
        })?;
      *symbol
    };

    // SAFETY: the factory hands out a fresh builder from `into_raw`, and the
    // library stays open for as long as `self.library` holds it.
    let builder = unsafe { OwnedFlowBuilder::take_ownership(factory(), &self.entry_point) }?;
    self.builder = Some(builder);

    info!(path = %self.path.display(), entry_point = %self.entry_point, "plugin loaded");
    Ok(())
  }

  /// Open the library and obtain its builder.
  pub fn load(&mut self) -> Result<(), PluginError> {
    self.load_library()?;
    self.make_flow_builder()
  }

  /// Build a new flow from the loaded builder.
  pub fn build(&self) -> Result<LoadedFlow, PluginError> {
    let (Some(builder), Some(library)) = (&self.builder, &self.library) else {
      return Err(PluginError::NotLoaded);
    };

    Ok(LoadedFlow {
      flow: builder.build(),
      _library: library.clone(),
    })
  }

  /// Release the builder and drop this plugin's hold on the library.
  pub fn unload(&mut self) {
    if self.builder.take().is_some() {
      debug!(path = %self.path.display(), "released flow builder");
    }
    self.library = None;
  }
}

impl Drop for Plugin {
  fn drop(&mut self) {
    self.unload();
  }
}

/// Handle of a plugin in a [`PluginLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(usize);

/// Table of loaded plugins.
#[derive(Default)]
pub struct PluginLoader {
  plugins: BTreeMap<PluginId, Plugin>,
  next_id: usize,
}

impl PluginLoader {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load the library at `path` and obtain its builder from `entry_point`.
  pub fn load(&mut self, path: impl Into<PathBuf>, entry_point: &str) -> Result<PluginId, PluginError> {
    let mut plugin = Plugin::new(path, entry_point);
    plugin.load()?;

    let id = PluginId(self.next_id);
    self.next_id += 1;
    self.plugins.insert(id, plugin);
    Ok(id)
  }

  pub fn build(&self, id: PluginId) -> Result<LoadedFlow, PluginError> {
    self.plugins.get(&id).ok_or(PluginError::NotLoaded)?.build()
  }

  pub fn get(&self, id: PluginId) -> Option<&Plugin> {
    self.plugins.get(&id)
  }

  /// Release one plugin. Returns `false` for an unknown id.
  pub fn release(&mut self, id: PluginId) -> bool {
    match self.plugins.remove(&id) {
      Some(mut plugin) => {
        plugin.unload();
        true
      }
      None => false,
    }
  }

  /// Release every plugin, most recently loaded first.
  pub fn release_all(&mut self) {
    while let Some((_, mut plugin)) = self.plugins.pop_last() {
      plugin.unload();
    }
  }

  pub fn len(&self) -> usize {
    self.plugins.len()
  }

  pub fn is_empty(&self) -> bool {
    self.plugins.is_empty()
  }
}

impl Drop for PluginLoader {
  fn drop(&mut self) {
    self.release_all();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn missing_library_fails_to_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("libmissing.so");
    let mut plugin = Plugin::new(&path, DEFAULT_ENTRY_POINT);

    let result = plugin.load();

    assert!(matches!(result, Err(PluginError::LibraryLoad { path: p, .. }) if p == path));
    assert!(!plugin.is_loaded());
  }

  #[test]
  fn build_before_load_is_not_loaded() {
    let plugin = Plugin::new("libwhatever.so", DEFAULT_ENTRY_POINT);

    assert!(matches!(plugin.build(), Err(PluginError::NotLoaded)));
  }

  #[test]
  fn builder_requires_open_library() {
    let mut plugin = Plugin::new("libwhatever.so", DEFAULT_ENTRY_POINT);

    assert!(matches!(plugin.make_flow_builder(), Err(PluginError::NotLoaded)));
  }

  #[test]
  fn non_library_file_fails_to_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("not-a-library.so");
    std::fs::write(&path, "plain text").unwrap();

    let result = Plugin::new(&path, DEFAULT_ENTRY_POINT).load();

    assert!(matches!(result, Err(PluginError::LibraryLoad { .. })));
  }

  #[test]
  #[cfg(all(target_os = "linux", target_env = "gnu"))]
  fn missing_symbol_is_reported() {
    let mut plugin = Plugin::new("libc.so.6", "definitely_not_a_flow_factory");

    let result = plugin.load();

    assert!(matches!(result, Err(PluginError::SymbolNotFound { symbol, .. }) if symbol == "definitely_not_a_flow_factory"));
    assert!(matches!(plugin.build(), Err(PluginError::NotLoaded)));
  }

  #[test]
  fn loader_reports_failures_and_unknown_ids() {
    let temp = TempDir::new().unwrap();
    let mut loader = PluginLoader::new();

    let result = loader.load(temp.path().join("libmissing.so"), DEFAULT_ENTRY_POINT);

    assert!(matches!(result, Err(PluginError::LibraryLoad { .. })));
    assert!(loader.is_empty());
    assert!(matches!(loader.build(PluginId(0)), Err(PluginError::NotLoaded)));
    assert!(!loader.release(PluginId(0)));
  }
}
