// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// Files ending in `.json` are parsed as JSON; everything else as TOML. This
/// only performs deserialization; use [`load_and_validate`] for the checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config: RawConfigFile = if is_json {
        serde_json::from_str(&contents)?
    } else {
        toml::from_str(&contents)?
    };

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// How a config load went, kept so it can be reported once logging is up.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    Missing,
    Invalid(String),
}

/// Load the configuration without logging, falling back to built-in
/// defaults.
///
/// The caller needs the configured logs dir before the subscriber exists,
/// so reporting is split out into [`report_load`].
pub fn load_quiet(path: impl AsRef<Path>) -> (ConfigFile, LoadOutcome) {
    let path = path.as_ref();

    if !path.exists() {
        return (ConfigFile::default(), LoadOutcome::Missing);
    }

    match load_and_validate(path) {
        Ok(cfg) => (cfg, LoadOutcome::Loaded),
        Err(err) => (ConfigFile::default(), LoadOutcome::Invalid(err.to_string())),
    }
}

/// A missing file is expected (fresh checkout) and only logged at info.
/// Anything else (unreadable, malformed, failing validation) is logged as a
/// warning.
pub fn report_load(path: impl AsRef<Path>, outcome: &LoadOutcome) {
    let path = path.as_ref();
    match outcome {
        LoadOutcome::Loaded => info!(path = ?path, "loaded config"),
        LoadOutcome::Missing => info!(path = ?path, "config file not found; using defaults"),
        LoadOutcome::Invalid(err) => {
            warn!(path = ?path, error = %err, "invalid config; using defaults")
        }
    }
}

/// Load the configuration, falling back to built-in defaults.
///
/// Configuration problems never stop the daemon.
pub fn load_or_default(path: impl AsRef<Path>) -> ConfigFile {
    let (cfg, outcome) = load_quiet(&path);
    report_load(&path, &outcome);
    cfg
}

/// Default config location: `buildmon.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("buildmon.toml")
}
