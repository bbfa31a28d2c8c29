//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::harness::convert::JupytextConverter;
use crate::harness::discovery::{Demo, discover_demos, is_notebook};
use crate::harness::executor::PythonExecutor;
use crate::harness::interfaces::NotebookConverter;
use crate::harness::policy::{Capabilities, skip_reason};
use crate::harness::runner::{
    ConsoleReporter, DemoReporter, HarnessConfig, JsonReporter, RunOptions, run_demos,
};

use super::{CliError, CliResult, ExitCode};

/// Settings for the `run` command, resolved from CLI flags.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub path: PathBuf,
    pub verbose: bool,
    pub exit_first: bool,
    pub filter: Option<String>,
    pub json: bool,
    pub interpreter: String,
    pub converter: String,
    pub timeout: Option<u64>,
    /// `Some` forces the capability; `None` probes the interpreter.
    pub meshgen_override: Option<bool>,
}

/// Run all demos under the configured root.
pub fn run_demos_command(settings: RunSettings) -> CliResult<ExitCode> {
    let caps = resolve_capabilities(settings.meshgen_override, &settings.interpreter);
    let converter = JupytextConverter::new(settings.converter.as_str());
    let executor = PythonExecutor::new(settings.interpreter.as_str())
        .with_timeout(settings.timeout.map(Duration::from_secs));
    let config = HarnessConfig::default();
    let options = RunOptions {
        exit_first: settings.exit_first,
        filter: settings.filter,
    };

    let mut console = ConsoleReporter::new(settings.verbose);
    let mut json = JsonReporter::new();
    let reporter: &mut dyn DemoReporter = if settings.json { &mut json } else { &mut console };

    let summary = run_demos(
        &settings.path,
        &config,
        &caps,
        &converter,
        &executor,
        reporter,
        &options,
    )
    .map_err(|e| CliError::failure(format!("Error: {}", e)))?;

    if summary.failed > 0 {
        // Demos failed - return error with empty message (summary already printed)
        Err(CliError::new("", ExitCode::FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// List discovered demos with the policy decision for each, without side
/// effects.
pub fn list_demos(
    path: &Path,
    interpreter: &str,
    meshgen_override: Option<bool>,
) -> CliResult<ExitCode> {
    let caps = resolve_capabilities(meshgen_override, interpreter);
    let demos =
        discover_demos(path).map_err(|e| CliError::failure(format!("Error: {}", e)))?;

    if demos.is_empty() {
        println!("No demos found under {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    for demo in &demos {
        match skip_reason(demo, &caps) {
            Some(reason) => println!("{}  skip ({})", demo.notebook_path().display(), reason),
            None => println!("{}  run", demo.notebook_path().display()),
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Convert one notebook and print the script path. The script is left on
/// disk; only the `run` pipeline cleans up after itself.
pub fn convert_notebook(file: &Path, tool: &str) -> CliResult<ExitCode> {
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::failure(format!("Error: '{}' is not a file", file.display())))?;

    if !is_notebook(&file_name) {
        return Err(CliError::failure(format!(
            "Error: '{}' is not a notebook",
            file.display()
        )));
    }

    let dir = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let demo = Demo { dir, file_name };

    let converter = JupytextConverter::new(tool);
    let script = converter
        .convert(&demo)
        .map_err(|e| CliError::failure(format!("Error: {}", e)))?;

    println!("{}", script.display());
    Ok(ExitCode::SUCCESS)
}

fn resolve_capabilities(meshgen_override: Option<bool>, interpreter: &str) -> Capabilities {
    match meshgen_override {
        Some(forced) => Capabilities {
            mesh_generation: forced,
        },
        None => Capabilities::detect(interpreter),
    }
}
