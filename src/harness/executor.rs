//! Script execution with the solve substitution active
//!
//! The default executor runs the converted script through the target
//! interpreter. Per-demo isolation is explicit data: the demo directory
//! becomes the child's working directory, is prepended to the child's
//! module search path, and the non-interactive plotting backend is set in
//! the child's environment. The substitution is rendered into a bootstrap
//! program executed by the interpreter, so it dies with the child and can
//! never leak into a later demo or into the harness itself.

use std::env;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::interfaces::{DemoExecutor, HarnessError};

/// Default interpreter for converted scripts.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Default non-interactive plotting backend.
pub const DEFAULT_BACKEND: &str = "agg";

/// Fully-qualified name of the iterative solve operation on the mechanics
/// collaborator.
pub const DEFAULT_SOLVE_TARGET: &str = "pulse.mechanicsproblem.MechanicsProblem.solve";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Replacement of one fully-qualified operation with a fixed deterministic
/// return value, active only while one demo executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// Fully-qualified operation name to replace.
    pub target: String,
    /// Iteration count reported by the stand-in.
    pub iterations: u32,
    /// Convergence flag reported by the stand-in.
    pub converged: bool,
}

impl Substitution {
    /// The stand-in for the mechanics solve: immediately reports one
    /// iteration and convergence.
    pub fn solve_sentinel() -> Self {
        Self {
            target: DEFAULT_SOLVE_TARGET.to_string(),
            iterations: 1,
            converged: true,
        }
    }
}

/// Per-demo isolation context consumed by an executor.
///
/// Carrying this as data (rather than mutating process-wide state) keeps
/// demos independent: nothing here outlives one execution.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The demo's directory; becomes the child's working directory and is
    /// prepended to its module search path.
    pub demo_dir: PathBuf,
    /// The operation replacement active during execution.
    pub substitution: Substitution,
    /// Non-interactive plotting backend for the child.
    pub plot_backend: String,
}

/// Runs converted scripts through a Python interpreter subprocess.
#[derive(Debug, Clone)]
pub struct PythonExecutor {
    interpreter: String,
    timeout: Option<Duration>,
}

impl PythonExecutor {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout: None,
        }
    }

    /// Bound each demo's execution; the child is killed on expiry.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PythonExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER)
    }
}

impl DemoExecutor for PythonExecutor {
    fn execute(&self, script: &Path, ctx: &ExecutionContext) -> Result<(), HarnessError> {
        let bootstrap = render_bootstrap(script, &ctx.substitution)?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-c")
            .arg(bootstrap)
            .current_dir(&ctx.demo_dir)
            .env(
                "PYTHONPATH",
                search_path_for(&ctx.demo_dir, env::var_os("PYTHONPATH").as_deref()),
            )
            .env("MPLBACKEND", &ctx.plot_backend);

        let captured = run_captured(cmd, self.timeout).map_err(|e| {
            HarnessError::Execution(format!("failed to run {}: {}", self.interpreter, e))
        })?;

        if captured.timed_out {
            return Err(HarnessError::Execution(format!(
                "timed out after {}s",
                self.timeout.map(|t| t.as_secs()).unwrap_or_default()
            )));
        }
        if !captured.success {
            let code = captured
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let mut detail = format!("{} exited with status {}", self.interpreter, code);
            let output = format!("{}\n{}", captured.stdout, captured.stderr);
            let output = output.trim();
            if !output.is_empty() {
                detail.push('\n');
                detail.push_str(output);
            }
            return Err(HarnessError::Execution(detail));
        }
        Ok(())
    }
}

/// Render the bootstrap program the interpreter runs: install the
/// substitution, then execute the script file as `__main__`.
///
/// The patch is scoped to exactly one fully-qualified operation so that
/// unrelated failures inside the demo are never masked.
fn render_bootstrap(script: &Path, sub: &Substitution) -> Result<String, HarnessError> {
    let target = py_string(&sub.target)?;
    let script = py_string(&script.to_string_lossy())?;
    let converged = if sub.converged { "True" } else { "False" };
    Ok(format!(
        "import runpy\n\
         from unittest import mock\n\
         \n\
         with mock.patch({target}) as _solve:\n\
         \x20\x20\x20\x20_solve.return_value = ({iterations}, {converged})\n\
         \x20\x20\x20\x20runpy.run_path({script}, run_name=\"__main__\")\n",
        target = target,
        iterations = sub.iterations,
        converged = converged,
        script = script,
    ))
}

/// Quote a string as an interpreter literal. JSON string syntax is a valid
/// Python string literal, including escapes.
fn py_string(s: &str) -> Result<String, HarnessError> {
    serde_json::to_string(s)
        .map_err(|e| HarnessError::Execution(format!("failed to encode literal '{s}': {e}")))
}

/// Child module search path: the demo directory first, then anything the
/// harness inherited.
fn search_path_for(dir: &Path, inherited: Option<&OsStr>) -> OsString {
    let mut paths = vec![dir.to_path_buf()];
    if let Some(existing) = inherited {
        paths.extend(env::split_paths(existing));
    }
    env::join_paths(paths).unwrap_or_else(|_| dir.as_os_str().to_os_string())
}

#[derive(Debug)]
struct Captured {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
    timed_out: bool,
}

/// Run a command to completion, capturing output. With a timeout, the
/// child's pipes are drained on reader threads while the parent polls for
/// exit; on expiry the child is killed and reaped.
fn run_captured(mut cmd: Command, timeout: Option<Duration>) -> std::io::Result<Captured> {
    let Some(limit) = timeout else {
        let output = cmd.output()?;
        return Ok(Captured {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
        });
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let stdout_reader = child.stdout.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + limit;
    let mut timed_out = false;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            timed_out = true;
            let _ = child.kill();
            break child.wait()?;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    Ok(Captured {
        success: status.success(),
        code: status.code(),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        timed_out,
    })
}
