//! Demo runner: orchestration, cleanup, and reporting
//!
//! ## DemoReporter Trait
//!
//! The runner uses a `DemoReporter` trait to separate reporting from
//! execution. This allows for custom output formats by implementing the
//! trait; console (pytest-style) and JSON reporters are provided.
//!
//! ## Per-demo state machine
//!
//! DISCOVERED -> SKIPPED (terminal) when a skip rule matches, before any
//! side effect; otherwise CONVERTING -> FAILED (terminal) on conversion
//! error; otherwise EXECUTING -> PASSED or FAILED. The converted script is
//! deleted on every exit path by a drop guard. A failure in one demo never
//! prevents the next demo from running.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::json;

use super::discovery::{Demo, discover_demos};
use super::executor::{DEFAULT_BACKEND, ExecutionContext, Substitution};
use super::interfaces::{DemoExecutor, HarnessError, NotebookConverter};
use super::policy::{Capabilities, skip_reason};

// ============================================================================
// Outcomes and summary
// ============================================================================

/// Terminal status of one demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoOutcome {
    Passed(Duration),
    Failed(Duration, String),
    Skipped(String),
}

/// Aggregate of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

// ============================================================================
// Demo Reporter Trait
// ============================================================================

/// Trait for reporting demo execution results.
///
/// Implement this trait to customize report output format.
pub trait DemoReporter {
    /// Called when collection (discovery + filtering) is complete
    fn on_collection_complete(&mut self, demo_count: usize);

    /// Called when a demo is about to be processed
    fn on_demo_start(&mut self, _demo: &Demo) {}

    /// Called when a demo reaches a terminal status
    fn on_demo_complete(&mut self, demo: &Demo, outcome: &DemoOutcome);

    /// Called when the whole run has completed
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Default console reporter (pytest-style)
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
    failures: Vec<(String, String)>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            failures: Vec::new(),
        }
    }
}

impl DemoReporter for ConsoleReporter {
    fn on_collection_complete(&mut self, demo_count: usize) {
        if demo_count == 0 {
            eprintln!("No demos collected");
            return;
        }
        println!("\x1b[1m=================== demo session starts ===================\x1b[0m");
        println!("collected {} demo(s)", demo_count);
        println!();
    }

    fn on_demo_complete(&mut self, demo: &Demo, outcome: &DemoOutcome) {
        let status = match outcome {
            DemoOutcome::Passed(d) => {
                if self.verbose {
                    format!("\x1b[32mPASSED\x1b[0m ({:.0}ms)", d.as_millis())
                } else {
                    "\x1b[32mPASSED\x1b[0m".to_string()
                }
            }
            DemoOutcome::Failed(d, _) => {
                if self.verbose {
                    format!("\x1b[31mFAILED\x1b[0m ({:.0}ms)", d.as_millis())
                } else {
                    "\x1b[31mFAILED\x1b[0m".to_string()
                }
            }
            DemoOutcome::Skipped(reason) => {
                format!("\x1b[33mSKIPPED\x1b[0m ({})", reason)
            }
        };
        println!("{} {}", demo.label(), status);

        if let DemoOutcome::Failed(_, detail) = outcome {
            self.failures.push((demo.label(), detail.clone()));
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        if !self.failures.is_empty() {
            println!();
            println!("\x1b[1;31m=================== FAILURES ===================\x1b[0m");
            for (label, detail) in &self.failures {
                println!();
                println!("\x1b[1m___________ {} ___________\x1b[0m", label);
                println!();
                for line in detail.lines() {
                    println!("    {}", line);
                }
            }
        }

        println!();
        let color = if summary.failed > 0 {
            "\x1b[1;31m"
        } else {
            "\x1b[1;32m"
        };

        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("{} passed", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed));
        }
        if summary.skipped > 0 {
            parts.push(format!("{} skipped", summary.skipped));
        }
        if parts.is_empty() {
            parts.push("no demos run".to_string());
        }

        println!(
            "{}=================== {} in {:.2}s ===================\x1b[0m",
            color,
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
    }
}

/// Machine-readable reporter: one JSON document with per-demo records and
/// the summary, printed when the run completes.
#[derive(Debug, Default)]
pub struct JsonReporter {
    demos: Vec<serde_json::Value>,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DemoReporter for JsonReporter {
    fn on_collection_complete(&mut self, _demo_count: usize) {}

    fn on_demo_complete(&mut self, demo: &Demo, outcome: &DemoOutcome) {
        let label = demo.label();
        let path = demo.notebook_path().display().to_string();
        let record = match outcome {
            DemoOutcome::Passed(d) => json!({
                "demo": label,
                "path": path,
                "status": "passed",
                "duration_ms": d.as_millis() as u64,
            }),
            DemoOutcome::Failed(d, detail) => json!({
                "demo": label,
                "path": path,
                "status": "failed",
                "duration_ms": d.as_millis() as u64,
                "detail": detail,
            }),
            DemoOutcome::Skipped(reason) => json!({
                "demo": label,
                "path": path,
                "status": "skipped",
                "reason": reason,
            }),
        };
        self.demos.push(record);
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let doc = json!({
            "demos": std::mem::take(&mut self.demos),
            "summary": {
                "total": summary.total,
                "passed": summary.passed,
                "failed": summary.failed,
                "skipped": summary.skipped,
                "duration_ms": summary.duration.as_millis() as u64,
            },
        });
        match serde_json::to_string_pretty(&doc) {
            Ok(s) => println!("{}", s),
            Err(e) => tracing::warn!(error = %e, "failed to serialize report"),
        }
    }
}

// ============================================================================
// Orchestration
// ============================================================================

/// Harness-wide execution configuration shared by all demos.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Operation replacement applied during every demo's execution.
    pub substitution: Substitution,
    /// Non-interactive plotting backend, configured once and applied to
    /// every demo's environment.
    pub plot_backend: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            substitution: Substitution::solve_sentinel(),
            plot_backend: DEFAULT_BACKEND.to_string(),
        }
    }
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after the first failing demo instead of continuing the batch.
    pub exit_first: bool,
    /// Only process demos whose file name contains this substring.
    pub filter: Option<String>,
}

/// Run all demos under `root`.
///
/// Discovery errors are fatal; conversion and execution errors fail only
/// the demo that raised them. Every discovered, non-filtered demo reaches
/// exactly one terminal status and is reported exactly once.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn run_demos(
    root: &Path,
    config: &HarnessConfig,
    caps: &Capabilities,
    converter: &dyn NotebookConverter,
    executor: &dyn DemoExecutor,
    reporter: &mut dyn DemoReporter,
    options: &RunOptions,
) -> Result<RunSummary, HarnessError> {
    let start = Instant::now();

    let demos: Vec<Demo> = discover_demos(root)?
        .into_iter()
        .filter(|d| {
            options
                .filter
                .as_deref()
                .is_none_or(|k| d.file_name.contains(k))
        })
        .collect();

    reporter.on_collection_complete(demos.len());

    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for demo in &demos {
        reporter.on_demo_start(demo);

        let outcome = match skip_reason(demo, caps) {
            Some(reason) => DemoOutcome::Skipped(reason),
            None => run_single_demo(demo, config, converter, executor),
        };

        match &outcome {
            DemoOutcome::Passed(_) => passed += 1,
            DemoOutcome::Failed(_, _) => failed += 1,
            DemoOutcome::Skipped(_) => skipped += 1,
        }
        let stop = options.exit_first && matches!(outcome, DemoOutcome::Failed(_, _));
        reporter.on_demo_complete(demo, &outcome);
        if stop {
            break;
        }
    }

    let summary = RunSummary {
        total: passed + failed + skipped,
        passed,
        failed,
        skipped,
        duration: start.elapsed(),
    };
    reporter.on_run_complete(&summary);
    Ok(summary)
}

/// Convert and execute one demo. The converted script is removed on every
/// exit path, including conversion failures that left partial output.
fn run_single_demo(
    demo: &Demo,
    config: &HarnessConfig,
    converter: &dyn NotebookConverter,
    executor: &dyn DemoExecutor,
) -> DemoOutcome {
    let start = Instant::now();

    let _cleanup = ScriptCleanup::new(demo.script_path());

    let script = match converter.convert(demo) {
        Ok(path) => path,
        Err(e) => return DemoOutcome::Failed(start.elapsed(), e.to_string()),
    };

    let ctx = ExecutionContext {
        demo_dir: demo.dir.clone(),
        substitution: config.substitution.clone(),
        plot_backend: config.plot_backend.clone(),
    };

    match executor.execute(&script, &ctx) {
        Ok(()) => DemoOutcome::Passed(start.elapsed()),
        Err(e) => DemoOutcome::Failed(start.elapsed(), e.to_string()),
    }
}

/// Removes the converted script when dropped. Removal failures after the
/// demo's outcome is decided are tolerated and logged, never escalated.
struct ScriptCleanup {
    path: PathBuf,
}

impl ScriptCleanup {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for ScriptCleanup {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if self.path.exists() {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove converted script"
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_consistent() {
        let summary = RunSummary {
            total: 3,
            passed: 1,
            failed: 0,
            skipped: 2,
            duration: Duration::from_millis(5),
        };
        assert_eq!(summary.total, summary.passed + summary.failed + summary.skipped);
    }

    #[test]
    fn test_cleanup_tolerates_missing_file() {
        // Dropping a guard for a file that never existed must not panic
        let guard = ScriptCleanup::new(PathBuf::from("/nonexistent/dir/ex.py"));
        drop(guard);
    }

    #[test]
    fn test_cleanup_removes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ex.py");
        fs::write(&path, "print(1)").unwrap();
        drop(ScriptCleanup::new(path.clone()));
        assert!(!path.exists());
    }
}
