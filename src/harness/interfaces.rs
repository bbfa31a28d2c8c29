//! Harness I/O boundary interfaces
//!
//! This module defines trait-based abstractions for the two side-effecting
//! stages of the pipeline:
//! - Notebook conversion (external tool invocation)
//! - Script execution (interpreter subprocess with the substitution active)
//!
//! These interfaces allow for custom strategies (dry-run, fakes in tests,
//! alternative interpreters) without changing the runner's orchestration.
//! The solve substitution is plain data consumed by an injected executor -
//! nothing in the harness is patched at runtime.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::discovery::Demo;
use super::executor::ExecutionContext;

/// Errors that occur during harness operations
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Invalid demo root or unreadable tree. Fatal to the whole run.
    #[error("failed to discover demos: {0}")]
    Discovery(String),

    /// External conversion tool failure. Fails one demo only.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// Interpreter fault, non-zero exit, or timeout. Fails one demo only.
    #[error("execution failed: {0}")]
    Execution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Notebook Converter Interface
// ============================================================================

/// Convert a demo notebook into a directly executable script.
///
/// The output path is deterministic: same directory, same stem, script
/// suffix. A conversion failure aborts the demo before any execution is
/// attempted.
pub trait NotebookConverter {
    /// Convert the demo's notebook, returning the path of the generated
    /// script.
    fn convert(&self, demo: &Demo) -> Result<PathBuf, HarnessError>;
}

// ============================================================================
// Demo Executor Interface
// ============================================================================

/// Execute a converted script under a per-demo isolation context.
///
/// Implementations receive the context (working directory, search-path
/// addition, plotting backend, substitution) as data and must not mutate
/// harness-process state. Faults raised by the demo's own code surface as
/// errors; they are never swallowed.
pub trait DemoExecutor {
    /// Run the converted script to completion.
    fn execute(&self, script: &Path, ctx: &ExecutionContext) -> Result<(), HarnessError>;
}
