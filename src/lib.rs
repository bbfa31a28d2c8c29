#![forbid(unsafe_code)]
//! Notebook demo verification harness
//!
//! nbvet discovers runnable demo notebooks across a directory tree, converts
//! each one into a directly executable script via an external conversion
//! tool, executes the script through a target interpreter with the expensive
//! mechanics solve replaced by a deterministic stand-in, and reports
//! passed/failed/skipped per demo with a pytest-style summary.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `harness` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Generated code**: The executor renders interpreter bootstrap programs as *string literals*. Anything that
//!   looks like patching or mocking in those strings runs inside the child interpreter, not in the harness.

pub mod cli;
pub mod harness;
pub mod version;

pub use harness::convert::JupytextConverter;
pub use harness::discovery::{Demo, discover_demos};
pub use harness::executor::{ExecutionContext, PythonExecutor, Substitution};
pub use harness::interfaces::{DemoExecutor, HarnessError, NotebookConverter};
pub use harness::policy::{Capabilities, skip_reason};
pub use harness::runner::{
    ConsoleReporter, DemoOutcome, DemoReporter, HarnessConfig, JsonReporter, RunOptions,
    RunSummary, run_demos,
};
