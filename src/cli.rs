// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::types::BuildMode;

/// Command-line arguments for `buildmon`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildmon",
    version,
    about = "Watch a C/C++ source tree and rebuild WebAssembly artifacts on change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML, or JSON if it ends in `.json`).
    ///
    /// A missing file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path(), global = true)]
    pub config: PathBuf,

    /// Build mode used by `build` and `watch`.
    #[arg(long, value_enum, default_value_t = BuildMode::Release, global = true)]
    pub mode: BuildMode,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDMON_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build once and exit.
    Build,
    /// Build once, then rebuild whenever sources change (until Ctrl-C).
    Watch,
    /// Print build statistics and recent history.
    Stats,
    /// Remove the change cache so the next build sees every file as changed.
    Clean,
    /// Serve the public dir with cross-origin isolation headers.
    Serve {
        /// Port to listen on. Defaults to `[server].port`.
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
