//! The boundary between a plugin library and the host.
//!
//! A plugin exports one `extern "C"` factory (by default `make_flow`) that
//! returns a heap allocated [`RawFlowBuilder`]. The host takes ownership of
//! that pointer exactly once through [`OwnedFlowBuilder::take_ownership`] and
//! hands it back to the plugin's `release` function when done.
//!
//! The flows themselves cross the boundary as Rust trait objects, so host and
//! plugin must be built by the same compiler against the same `stepwise-lib`.
//! `abi_version` catches the most obvious mismatches.
//!
//! When building a flow the host passes its [`HostContext`]; the plugin wraps
//! the flow in a [`HostedFlow`] so its own tokio and tracing copies find the
//! host's runtime and subscriber.

use std::ffi::c_void;
use std::ptr::NonNull;

use crate::flow::{Flow, FlowBuilder};

use super::PluginError;
use super::host::{HostContext, HostedFlow};

/// Bumped whenever [`RawFlowBuilder`] or the flow traits change shape.
pub const ABI_VERSION: u32 = 2;

/// Symbol looked up when no entry point is given.
pub const DEFAULT_ENTRY_POINT: &str = "make_flow";

/// The factory signature a plugin exports.
pub type FlowFactory = unsafe extern "C" fn() -> *mut RawFlowBuilder;

/// A flow builder as laid out across the boundary.
#[repr(C)]
pub struct RawFlowBuilder {
  pub abi_version: u32,
  /// Plugin-owned builder state.
  pub state: *mut c_void,
  /// Returns a `Box<Box<dyn Flow>>` as a raw pointer; the caller owns it.
  /// `host` is null or points at a [`HostContext`] valid for the call.
  pub build: unsafe extern "C" fn(state: *mut c_void, host: *const HostContext) -> *mut c_void,
  /// Frees `state` and the struct itself.
  pub release: unsafe extern "C" fn(raw: *mut RawFlowBuilder),
}

/// Leak `builder` into a [`RawFlowBuilder`] for the host to own.
pub fn into_raw<B: FlowBuilder + 'static>(builder: B) -> *mut RawFlowBuilder {
  let state = Box::into_raw(Box::new(builder)).cast::<c_void>();
  Box::into_raw(Box::new(RawFlowBuilder {
    abi_version: ABI_VERSION,
    state,
    build: build_flow::<B>,
    release: release_builder::<B>,
  }))
}

unsafe extern "C" fn build_flow<B: FlowBuilder>(state: *mut c_void, host: *const HostContext) -> *mut c_void {
  // SAFETY: `state` was produced by `into_raw::<B>` and is still owned by the builder.
  let builder = unsafe { &*state.cast::<B>() };

  // SAFETY: the host passes null or a live HostContext.
  let flow: Box<dyn Flow> = match unsafe { host.as_ref() } {
    Some(host) => Box::new(HostedFlow::new(host.enter(|| builder.build()), host.clone())),
    None => builder.build(),
  };
  Box::into_raw(Box::new(flow)).cast::<c_void>()
}

unsafe extern "C" fn release_builder<B: FlowBuilder>(raw: *mut RawFlowBuilder) {
  // SAFETY: `raw` and its state were both leaked by `into_raw::<B>`, and the
  // host calls this exactly once.
  unsafe {
    let raw = Box::from_raw(raw);
    drop(Box::from_raw(raw.state.cast::<B>()));
  }
}

/// Host side owner of a [`RawFlowBuilder`]. Releases it on drop.
pub struct OwnedFlowBuilder {
  raw: NonNull<RawFlowBuilder>,
}

// SAFETY: the state behind the pointer is a `FlowBuilder`, which is Send + Sync.
unsafe impl Send for OwnedFlowBuilder {}
unsafe impl Sync for OwnedFlowBuilder {}

impl OwnedFlowBuilder {
  /// Take ownership of a pointer returned by a plugin factory.
  ///
  /// A builder with a foreign ABI version is leaked rather than released,
  /// since its `release` may not have the expected signature.
  ///
  /// # Safety
  ///
  /// `raw` must be null or come from [`into_raw`] in a library that stays
  /// loaded while the returned value and every flow it builds are alive.
  /// It must not be taken twice.
  pub unsafe fn take_ownership(raw: *mut RawFlowBuilder, symbol: &str) -> Result<Self, PluginError> {
    let raw = NonNull::new(raw).ok_or_else(|| PluginError::NullHandle {
      symbol: symbol.to_string(),
    })?;

    // SAFETY: non-null and, per the contract, points at a live RawFlowBuilder.
    let found = unsafe { raw.as_ref().abi_version };
    if found != ABI_VERSION {
      return Err(PluginError::AbiMismatch {
        expected: ABI_VERSION,
        found,
      });
    }

    Ok(Self { raw })
  }

  /// Build a flow bound to the runtime and subscriber of the calling thread.
  pub fn build(&self) -> Box<dyn Flow> {
    let host = HostContext::current();
    if !host.has_runtime() {
      tracing::warn!("building a flow outside a tokio runtime, plugin actions cannot spawn processes");
    }

    // SAFETY: `raw` is live until drop; `build` hands us a leaked Box<Box<dyn Flow>>.
    unsafe {
      let raw = self.raw.as_ref();
      let flow = (raw.build)(raw.state, &host).cast::<Box<dyn Flow>>();
      *Box::from_raw(flow)
    }
  }
}

impl Drop for OwnedFlowBuilder {
  fn drop(&mut self) {
    // SAFETY: ownership was taken exactly once; release frees the allocation.
    unsafe {
      let release = self.raw.as_ref().release;
      release(self.raw.as_ptr());
    }
  }
}

/// Export a flow factory from a plugin library.
///
/// ```ignore
/// stepwise_lib::export_flow!(make_flow, || MyFlow::default());
/// ```
#[macro_export]
macro_rules! export_flow {
  ($name:ident, $builder:expr) => {
    #[unsafe(no_mangle)]
    pub extern "C" fn $name() -> *mut $crate::plugin::RawFlowBuilder {
      $crate::plugin::into_raw($builder)
    }
  };
}
