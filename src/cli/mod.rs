//! CLI module for the nbvet harness
//!
//! This module provides the command-line interface for the harness.
//!
//! ## Commands
//!
//! - `run [PATH]` - Discover, convert, and execute demo notebooks
//! - `list [PATH]` - List discovered demos and the policy decision for each
//! - `convert <FILE>` - Convert a single notebook without executing it
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::harness::convert::DEFAULT_CONVERTER;
use crate::harness::executor::DEFAULT_INTERPRETER;
use crate::version::NBVET_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Notebook demo verification harness
#[derive(Parser, Debug)]
#[command(name = "nbvet")]
#[command(version = NBVET_VERSION)]
#[command(about = "Notebook demo verification harness", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover, convert, and execute demo notebooks
    Run {
        /// Demo root directory
        #[arg(value_name = "PATH", default_value = "demo")]
        path: PathBuf,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
        /// Stop on first failure
        #[arg(short = 'x', long = "exitfirst")]
        exit_first: bool,
        /// Only run demos whose file name contains EXPR
        #[arg(short = 'k', value_name = "EXPR")]
        filter: Option<String>,
        /// Emit a JSON report instead of console output
        #[arg(long)]
        json: bool,
        /// Interpreter used to execute converted scripts
        #[arg(long, value_name = "BIN", default_value = DEFAULT_INTERPRETER)]
        interpreter: String,
        /// Conversion tool invoked on each notebook
        #[arg(long, value_name = "BIN", default_value = DEFAULT_CONVERTER)]
        converter: String,
        /// Per-demo timeout in seconds (unbounded when omitted)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Treat the mesh-generation capability as present (skip the probe)
        #[arg(long, conflicts_with = "no_meshgen")]
        meshgen: bool,
        /// Treat the mesh-generation capability as absent (skip the probe)
        #[arg(long = "no-meshgen")]
        no_meshgen: bool,
    },

    /// List discovered demos and the policy decision for each
    List {
        /// Demo root directory
        #[arg(value_name = "PATH", default_value = "demo")]
        path: PathBuf,
        /// Interpreter probed for optional capabilities
        #[arg(long, value_name = "BIN", default_value = DEFAULT_INTERPRETER)]
        interpreter: String,
        /// Treat the mesh-generation capability as present (skip the probe)
        #[arg(long, conflicts_with = "no_meshgen")]
        meshgen: bool,
        /// Treat the mesh-generation capability as absent (skip the probe)
        #[arg(long = "no-meshgen")]
        no_meshgen: bool,
    },

    /// Convert a single notebook without executing it
    Convert {
        /// Notebook file to convert
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Conversion tool to invoke
        #[arg(long, value_name = "BIN", default_value = DEFAULT_CONVERTER)]
        converter: String,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run {
            path,
            verbose,
            exit_first,
            filter,
            json,
            interpreter,
            converter,
            timeout,
            meshgen,
            no_meshgen,
        } => commands::run_demos_command(commands::RunSettings {
            path,
            verbose,
            exit_first,
            filter,
            json,
            interpreter,
            converter,
            timeout,
            meshgen_override: meshgen_override(meshgen, no_meshgen),
        }),
        Command::List {
            path,
            interpreter,
            meshgen,
            no_meshgen,
        } => commands::list_demos(&path, &interpreter, meshgen_override(meshgen, no_meshgen)),
        Command::Convert { file, converter } => commands::convert_notebook(&file, &converter),
    }
}

/// Fold the two capability flags into an optional override; `None` means
/// probe the interpreter.
fn meshgen_override(meshgen: bool, no_meshgen: bool) -> Option<bool> {
    match (meshgen, no_meshgen) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::try_parse_from(["nbvet", "run", "demo"]).unwrap();
        assert!(matches!(cli.command, Command::Run { .. }));
    }

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::try_parse_from(["nbvet", "run"]).unwrap();
        if let Command::Run {
            path,
            interpreter,
            converter,
            timeout,
            ..
        } = cli.command
        {
            assert_eq!(path, PathBuf::from("demo"));
            assert_eq!(interpreter, DEFAULT_INTERPRETER);
            assert_eq!(converter, DEFAULT_CONVERTER);
            assert_eq!(timeout, None);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_flags() {
        let cli =
            Cli::try_parse_from(["nbvet", "run", "-v", "-x", "-k", "ex1", "--timeout", "30"])
                .unwrap();
        if let Command::Run {
            verbose,
            exit_first,
            filter,
            timeout,
            ..
        } = cli.command
        {
            assert!(verbose);
            assert!(exit_first);
            assert_eq!(filter.as_deref(), Some("ex1"));
            assert_eq!(timeout, Some(30));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_meshgen_flags_conflict() {
        assert!(Cli::try_parse_from(["nbvet", "run", "--meshgen", "--no-meshgen"]).is_err());
    }

    #[test]
    fn test_cli_parse_list() {
        let cli = Cli::try_parse_from(["nbvet", "list", "demo", "--no-meshgen"]).unwrap();
        if let Command::List { no_meshgen, .. } = cli.command {
            assert!(no_meshgen);
        } else {
            panic!("Expected List command");
        }
    }

    #[test]
    fn test_cli_parse_convert() {
        let cli = Cli::try_parse_from(["nbvet", "convert", "ex1.ipynb"]).unwrap();
        if let Command::Convert { file, .. } = cli.command {
            assert_eq!(file, PathBuf::from("ex1.ipynb"));
        } else {
            panic!("Expected Convert command");
        }
    }

    #[test]
    fn test_meshgen_override_folding() {
        assert_eq!(meshgen_override(false, false), None);
        assert_eq!(meshgen_override(true, false), Some(true));
        assert_eq!(meshgen_override(false, true), Some(false));
    }
}
