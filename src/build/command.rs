// src/build/command.rs

//! Compiler invocation assembly.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{ConfigFile, ResolvedPaths};
use crate::fs::FileSystem;
use crate::types::BuildMode;

/// A fully assembled compiler command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// The two files a successful build is expected to leave in the public dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `<public_dir>/<output_name>.js`
    pub script: PathBuf,
    /// `<public_dir>/<output_name>.wasm`
    pub binary: PathBuf,
}

impl ArtifactPaths {
    pub fn new(cfg: &ConfigFile, paths: &ResolvedPaths) -> Self {
        let base = &cfg.toolchain.output_name;
        Self {
            script: paths.public_dir.join(format!("{base}.js")),
            binary: paths.public_dir.join(format!("{base}.wasm")),
        }
    }
}

/// Assemble the compiler command line for `mode`.
///
/// Argument order: sources, include flag, common flags, optimisation flag,
/// mode flags, output flag. Configured sources that do not exist are
/// skipped. Each flag string is split on whitespace, so `"-s MALLOC=emmalloc"`
/// becomes two arguments.
pub fn assemble(
    fs: &dyn FileSystem,
    cfg: &ConfigFile,
    paths: &ResolvedPaths,
    mode: BuildMode,
) -> BuildCommand {
    let mode_cfg = cfg.mode_config(mode);
    let mut args = Vec::new();

    for source in existing_sources(fs, cfg, &paths.source_dir) {
        args.push(display(&source));
    }

    args.push(format!(
        "-I{}",
        display(&paths.source_dir.join(&cfg.toolchain.include_dir))
    ));

    for flag in cfg.common_flags.iter() {
        args.extend(split_flag(flag));
    }
    args.extend(split_flag(&mode_cfg.optimization));
    for flag in mode_cfg.flags.iter() {
        args.extend(split_flag(flag));
    }

    args.push("-o".to_string());
    args.push(display(&ArtifactPaths::new(cfg, paths).script));

    BuildCommand {
        program: cfg.toolchain.compiler.clone(),
        args,
        cwd: paths.workspace.clone(),
    }
}

fn existing_sources(fs: &dyn FileSystem, cfg: &ConfigFile, source_dir: &Path) -> Vec<PathBuf> {
    cfg.toolchain
        .sources
        .iter()
        .map(|s| source_dir.join(s))
        .filter(|p| fs.is_file(p))
        .collect()
}

fn split_flag(flag: &str) -> impl Iterator<Item = String> + '_ {
    flag.split_whitespace().map(str::to_string)
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
