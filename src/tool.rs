//! External solver invocation.
//!
//! The rSPR computations are delegated to cwhidden's `rspr` and
//! `spr_dense_graph` executables. Everything the crate needs from them is
//! "write this input to stdin, wait for exit, give me stdout and stderr",
//! so that is the whole interface; process mechanics and platform
//! differences stay behind it, and tests substitute canned output.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use crate::PhyloError;
use crate::Result;

#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs a named external tool on an input string, blocking until it exits.
pub trait ToolRunner {
    fn run(&self, tool: &str, input: &str) -> Result<ToolOutput>;
}

/// Runs tools as child processes with piped stdio.
///
/// By default the executable is resolved through `PATH`; `with_dir` pins a
/// directory instead (the usual setup when the solvers ship next to the
/// binary). On Windows the `.exe` suffix is appended.
#[derive(Default)]
pub struct SystemTools {
    dir: Option<PathBuf>,
}

impl SystemTools {
    pub fn new() -> Self {
        SystemTools { dir: None }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        SystemTools {
            dir: Some(dir.into()),
        }
    }

    fn resolve(&self, tool: &str) -> PathBuf {
        let file = if cfg!(windows) {
            format!("{tool}.exe")
        } else {
            tool.to_owned()
        };
        match &self.dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }
}

impl ToolRunner for SystemTools {
    fn run(&self, tool: &str, input: &str) -> Result<ToolOutput> {
        let path = self.resolve(tool);
        let spawn_err = |detail: String| PhyloError::ExternalTool {
            tool: tool.to_owned(),
            detail,
        };

        let mut child = Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_err(format!("could not start `{}`: {e}", path.display())))?;

        child
            .stdin
            .take()
            .ok_or_else(|| spawn_err("stdin not captured".to_owned()))?
            .write_all(input.as_bytes())
            .map_err(|e| spawn_err(format!("could not write input: {e}")))?;

        let output = child
            .wait_with_output()
            .map_err(|e| spawn_err(format!("could not collect output: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        //solver chatter on stderr is a warning, not a failure; unusable
        //stdout is diagnosed by the caller that knows the output grammar
        if !stderr.trim().is_empty() {
            eprintln!("warning: `{tool}` wrote to stderr: {}", stderr.trim());
        }
        Ok(ToolOutput { stdout, stderr })
    }
}
