// src/build/toolchain.rs

use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::build::runner::{ProcessRunner, ProcessSpec};
use crate::config::{ConfigFile, ResolvedPaths};
use crate::errors::BuildError;
use crate::fs::FileSystem;

/// A compiler that answered its version probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToolchain {
    pub compiler: String,
    /// Set when the compiler was only found via the activation directory.
    pub path_prefix: Option<PathBuf>,
    /// First line of the version output.
    pub version: String,
}

/// Make sure the configured compiler can be run.
///
/// Probes `<compiler> --version`. If that fails and the activation directory
/// (`[toolchain].activation_dir` under the workspace) exists, probes once more
/// with that directory prepended to `PATH`. There is no further retry.
pub async fn ensure_toolchain(
    runner: &dyn ProcessRunner,
    fs: &dyn FileSystem,
    cfg: &ConfigFile,
    paths: &ResolvedPaths,
) -> Result<ResolvedToolchain, BuildError> {
    let compiler = cfg.toolchain.compiler.clone();

    if let Some(version) = probe(runner, &compiler, None).await {
        info!(compiler = %compiler, version = %version, "toolchain found");
        return Ok(ResolvedToolchain {
            compiler,
            path_prefix: None,
            version,
        });
    }

    let activation_dir = paths.workspace.join(&cfg.toolchain.activation_dir);
    if fs.is_dir(&activation_dir) {
        info!(dir = ?activation_dir, "compiler not on PATH; activating toolchain environment");
        if let Some(version) = probe(runner, &compiler, Some(activation_dir.clone())).await {
            info!(compiler = %compiler, version = %version, "toolchain found after activation");
            return Ok(ResolvedToolchain {
                compiler,
                path_prefix: Some(activation_dir),
                version,
            });
        }
    }

    error!(compiler = %compiler, "toolchain not found");
    Err(BuildError::ToolchainUnavailable { compiler })
}

async fn probe(
    runner: &dyn ProcessRunner,
    compiler: &str,
    path_prefix: Option<PathBuf>,
) -> Option<String> {
    let spec = ProcessSpec::new(compiler)
        .arg("--version")
        .path_prefix(path_prefix);

    match runner.run(spec).await {
        Ok(output) if output.success() => Some(
            output
                .stdout
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string(),
        ),
        Ok(output) => {
            debug!(compiler, status = ?output.status_code, "version probe exited non-zero");
            None
        }
        Err(err) => {
            debug!(compiler, error = %err, "version probe failed to start");
            None
        }
    }
}
