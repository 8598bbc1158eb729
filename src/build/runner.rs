// src/build/runner.rs

//! Pluggable child-process runner.
//!
//! The orchestrator talks to a [`ProcessRunner`] instead of spawning
//! processes itself, so tests can script toolchain behaviour (missing
//! compiler, warnings on stdout, a build that blocks until released) without
//! a real compiler installed.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

/// One child process to run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Directory prepended to the child's `PATH` (toolchain activation).
    pub path_prefix: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            path_prefix: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn path_prefix(mut self, prefix: Option<PathBuf>) -> Self {
        self.path_prefix = prefix;
        self
    }
}

/// Captured result of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

/// Trait abstracting how child processes are run.
///
/// An `Err` means the process could not be started (or waited on) at all;
/// a process that ran and exited non-zero is an `Ok` with that status.
pub trait ProcessRunner: Send + Sync {
    fn run(
        &self,
        spec: ProcessSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + '_>>;
}

/// Production runner backed by `tokio::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct RealProcessRunner;

impl ProcessRunner for RealProcessRunner {
    fn run(
        &self,
        spec: ProcessSpec,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + '_>> {
        Box::pin(async move {
            let program = resolve_program(&spec);
            debug!(program = ?program, args = ?spec.args, "spawning process");

            let mut cmd = Command::new(&program);
            cmd.args(&spec.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            if let Some(cwd) = &spec.cwd {
                cmd.current_dir(cwd);
            }
            if let Some(prefix) = &spec.path_prefix {
                cmd.env("PATH", prefixed_path(prefix)?);
            }

            let output = cmd
                .output()
                .await
                .with_context(|| format!("running `{}`", spec.program))?;

            Ok(ProcessOutput {
                status_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

/// Prefer the copy of the program inside the activation directory, if any.
fn resolve_program(spec: &ProcessSpec) -> PathBuf {
    if let Some(prefix) = &spec.path_prefix {
        let candidate = prefix.join(&spec.program);
        if candidate.is_file() {
            return candidate;
        }
    }
    PathBuf::from(&spec.program)
}

fn prefixed_path(prefix: &Path) -> Result<OsString> {
    let current = std::env::var_os("PATH").unwrap_or_default();
    let dirs = std::iter::once(prefix.to_path_buf()).chain(std::env::split_paths(&current));
    std::env::join_paths(dirs).context("building PATH with toolchain activation dir")
}
