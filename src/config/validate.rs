// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BuildmonError, Result};
use crate::types::BuildMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BuildmonError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        normalize(&mut raw);
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_build_modes(cfg)?;
    validate_watch(cfg)?;
    validate_toolchain(cfg)?;
    validate_history(cfg)?;
    Ok(())
}

fn validate_build_modes(cfg: &RawConfigFile) -> Result<()> {
    for (name, mode) in cfg.build_modes.iter() {
        if name.parse::<BuildMode>().is_err() {
            return Err(BuildmonError::ConfigError(format!(
                "[build_modes] has unknown mode '{name}' (expected debug, profile or release)"
            )));
        }
        if mode.optimization.trim().is_empty() {
            return Err(BuildmonError::ConfigError(format!(
                "[build_modes.{name}].optimization must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(BuildmonError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.watch.poll_interval_ms == 0 {
        return Err(BuildmonError::ConfigError(
            "[watch].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.watch.extensions.iter().all(|e| e.trim().is_empty()) {
        return Err(BuildmonError::ConfigError(
            "[watch].extensions must list at least one source extension".to_string(),
        ));
    }
    for pattern in cfg.watch.exclude.iter() {
        if let Err(err) = Glob::new(pattern) {
            return Err(BuildmonError::ConfigError(format!(
                "[watch].exclude has invalid glob '{pattern}': {err}"
            )));
        }
    }
    Ok(())
}

fn validate_toolchain(cfg: &RawConfigFile) -> Result<()> {
    if cfg.toolchain.compiler.trim().is_empty() {
        return Err(BuildmonError::ConfigError(
            "[toolchain].compiler must not be empty".to_string(),
        ));
    }
    if cfg.toolchain.output_name.trim().is_empty() {
        return Err(BuildmonError::ConfigError(
            "[toolchain].output_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_history(cfg: &RawConfigFile) -> Result<()> {
    if cfg.history.limit == 0 {
        return Err(BuildmonError::ConfigError(
            "[history].limit must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Fix up values that are accepted but need adjusting.
fn normalize(cfg: &mut RawConfigFile) {
    // A coalescing cap shorter than the quiet period would flush every burst
    // at the cap.
    if cfg.watch.max_coalesce_ms < cfg.watch.debounce_ms {
        cfg.watch.max_coalesce_ms = cfg.watch.debounce_ms;
    }

    cfg.watch.extensions = cfg
        .watch
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
}
