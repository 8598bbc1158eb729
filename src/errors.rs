// src/errors.rs

//! Crate-wide error types.
//!
//! [`BuildmonError`] covers the failures that can reach `main` (config,
//! filesystem, CLI wiring). [`BuildError`] covers a single build attempt and
//! never escapes the orchestrator: it is folded into a failed `BuildRecord`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildmonError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a build attempt could not produce a compiler exit status.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(
        "toolchain unavailable: `{compiler}` not found on PATH and no activation fallback succeeded"
    )]
    ToolchainUnavailable { compiler: String },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("internal build failure: {0}")]
    Internal(String),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildmonError>;
