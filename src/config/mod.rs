// src/config/mod.rs

//! Configuration loading and validation for buildmon.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate value ranges once at load time (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    LoadOutcome, default_config_path, load_and_validate, load_from_path, load_or_default,
    load_quiet, report_load,
};
pub use model::{
    ConfigFile, HistorySection, ModeConfig, PathsSection, RawConfigFile, ResolvedPaths,
    ServerSection, ToolchainSection, WatchSection,
};
