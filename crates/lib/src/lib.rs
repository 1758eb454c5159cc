//! stepwise-lib: building blocks for scripted build pipelines.
//!
//! A [`Flow`](flow::Flow) is a named, platform-scoped list of
//! [`Action`](action::Action)s that run one after another against a shared
//! [`Context`](context::Context):
//! - `action`: the action trait, combinators and built-in leaf actions
//! - `execute`: runs a flow, producing an `ExecutionSummary`
//! - `plugin`: loads flows from separately built shared libraries
//! - `pattern`: wildcard copy and removal

pub mod action;
pub mod context;
pub mod execute;
pub mod flow;
pub mod pattern;
pub mod platform;
pub mod plugin;
pub mod runner;
pub mod shell;

#[cfg(test)]
mod util;
