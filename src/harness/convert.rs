//! Notebook-to-script conversion
//!
//! The conversion tool is an external black box invoked as a subprocess in
//! the demo's directory. It reads the notebook and writes the executable
//! script next to it; the harness only checks the exit status and that the
//! expected output file appeared.

use std::path::PathBuf;
use std::process::Command;

use super::discovery::Demo;
use super::interfaces::{HarnessError, NotebookConverter};

/// Default conversion tool.
pub const DEFAULT_CONVERTER: &str = "jupytext";

/// Converts notebooks with the `jupytext` command-line tool
/// (`jupytext <file> --to .py`).
#[derive(Debug, Clone)]
pub struct JupytextConverter {
    tool: String,
}

impl JupytextConverter {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }
}

impl Default for JupytextConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER)
    }
}

impl NotebookConverter for JupytextConverter {
    fn convert(&self, demo: &Demo) -> Result<PathBuf, HarnessError> {
        let output = Command::new(&self.tool)
            .arg(&demo.file_name)
            .args(["--to", ".py"])
            .current_dir(&demo.dir)
            .output()
            .map_err(|e| {
                HarnessError::Conversion(format!("failed to run {}: {}", self.tool, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HarnessError::Conversion(format!(
                "{} exited with {}: {}",
                self.tool,
                output.status,
                stderr.trim()
            )));
        }

        let script = demo.script_path();
        if !script.is_file() {
            return Err(HarnessError::Conversion(format!(
                "{} produced no output at {}",
                self.tool,
                script.display()
            )));
        }
        Ok(script)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    fn demo_in(dir: &std::path::Path) -> Demo {
        fs::write(dir.join("ex1.ipynb"), b"{}").unwrap();
        Demo {
            dir: dir.to_path_buf(),
            file_name: "ex1.ipynb".to_string(),
        }
    }

    #[test]
    fn test_missing_tool_is_a_conversion_error() {
        let root = tempfile::tempdir().unwrap();
        let demo = demo_in(root.path());
        let converter = JupytextConverter::new("/nonexistent/converter-xyz");
        let err = converter.convert(&demo).unwrap_err();
        assert!(matches!(err, HarnessError::Conversion(_)));
        assert!(err.to_string().contains("failed to run"));
    }

    #[test]
    fn test_nonzero_exit_is_a_conversion_error() {
        let root = tempfile::tempdir().unwrap();
        let demo = demo_in(root.path());
        // `false` accepts any arguments and exits 1 without writing output
        let converter = JupytextConverter::new("false");
        let err = converter.convert(&demo).unwrap_err();
        assert!(matches!(err, HarnessError::Conversion(_)));
        assert!(err.to_string().contains("exited with"));
    }

    #[test]
    fn test_missing_output_is_a_conversion_error() {
        let root = tempfile::tempdir().unwrap();
        let demo = demo_in(root.path());
        // `true` exits 0 but produces no converted file
        let converter = JupytextConverter::new("true");
        let err = converter.convert(&demo).unwrap_err();
        assert!(matches!(err, HarnessError::Conversion(_)));
        assert!(err.to_string().contains("produced no output"));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_conversion_returns_script_path() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let demo = demo_in(root.path());

        // Stand-in tool: writes the sibling script like the real converter
        let tool = root.path().join("fake-jupytext");
        fs::write(&tool, "#!/bin/sh\nout=\"${1%.ipynb}.py\"\necho 'print(1)' > \"$out\"\n")
            .unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let converter = JupytextConverter::new(tool.to_string_lossy());
        let script = converter.convert(&demo).unwrap();
        assert_eq!(script, demo.script_path());
        assert!(script.is_file());
    }
}
