//! Skip policy and capability detection
//!
//! Skip rules are directory-name string equality on the demo's containing
//! directory - case-sensitive and exact, not path matching. They are
//! evaluated before any conversion or execution side effect occurs.

use std::process::{Command, Stdio};

use super::discovery::Demo;

/// Directory name of the known-unsupported coupled-simulation demos.
pub const CLOSED_LOOP_DIR: &str = "closed_loop";

/// Directory name of demos that require the optional mesh-generation
/// capability.
pub const GEOMETRY_DIR: &str = "creating_geometries";

/// Interpreter module whose presence marks the mesh-generation capability.
pub const MESHGEN_MODULE: &str = "mshr";

/// Optional capabilities of the execution environment, detected once at
/// startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the interpreter can import the mesh-generation library.
    pub mesh_generation: bool,
}

impl Capabilities {
    /// Probe the target interpreter for the optional mesh-generation
    /// module. A probe that cannot run at all counts as absent.
    pub fn detect(interpreter: &str) -> Self {
        let available = Command::new(interpreter)
            .args(["-c", &format!("import {MESHGEN_MODULE}")])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        tracing::debug!(available, module = MESHGEN_MODULE, "capability probe");
        Self {
            mesh_generation: available,
        }
    }
}

/// Why a demo is excluded from execution, if any rule matches.
///
/// Rules are checked in order: the closed-loop rule is unconditional, the
/// geometry rule applies only when the capability is absent.
pub fn skip_reason(demo: &Demo, caps: &Capabilities) -> Option<String> {
    let base = demo.dir.file_name().map(|n| n.to_string_lossy());
    match base.as_deref() {
        Some(CLOSED_LOOP_DIR) => Some("closed-loop demos are not supported".to_string()),
        Some(GEOMETRY_DIR) if !caps.mesh_generation => Some(format!(
            "mesh generation ({MESHGEN_MODULE}) is unavailable"
        )),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn demo_in(dir: &str) -> Demo {
        Demo {
            dir: PathBuf::from("demo").join(dir),
            file_name: "ex.ipynb".to_string(),
        }
    }

    const WITH_MESHGEN: Capabilities = Capabilities {
        mesh_generation: true,
    };
    const WITHOUT_MESHGEN: Capabilities = Capabilities {
        mesh_generation: false,
    };

    #[test]
    fn test_closed_loop_always_skipped() {
        assert!(skip_reason(&demo_in("closed_loop"), &WITH_MESHGEN).is_some());
        assert!(skip_reason(&demo_in("closed_loop"), &WITHOUT_MESHGEN).is_some());
    }

    #[test]
    fn test_geometry_skip_gated_on_capability() {
        assert!(skip_reason(&demo_in("creating_geometries"), &WITHOUT_MESHGEN).is_some());
        assert!(skip_reason(&demo_in("creating_geometries"), &WITH_MESHGEN).is_none());
    }

    #[test]
    fn test_other_dirs_run() {
        assert!(skip_reason(&demo_in("a"), &WITHOUT_MESHGEN).is_none());
    }

    #[test]
    fn test_matching_is_exact_and_case_sensitive() {
        assert!(skip_reason(&demo_in("Closed_Loop"), &WITHOUT_MESHGEN).is_none());
        assert!(skip_reason(&demo_in("closed_loop_v2"), &WITHOUT_MESHGEN).is_none());
        // Only the base name is consulted, not the full path
        let nested = Demo {
            dir: PathBuf::from("closed_loop/sub"),
            file_name: "ex.ipynb".to_string(),
        };
        assert!(skip_reason(&nested, &WITHOUT_MESHGEN).is_none());
    }

    #[test]
    fn test_probe_with_missing_interpreter_is_absent() {
        let caps = Capabilities::detect("/nonexistent/interpreter-xyz");
        assert!(!caps.mesh_generation);
    }
}
