use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Compiler configuration profile a build runs under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Debug,
    Profile,
    Release,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Debug => "debug",
            BuildMode::Profile => "profile",
            BuildMode::Release => "release",
        }
    }
}

impl Default for BuildMode {
    fn default() -> Self {
        BuildMode::Release
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(BuildMode::Debug),
            "profile" => Ok(BuildMode::Profile),
            "release" => Ok(BuildMode::Release),
            other => Err(format!(
                "invalid build mode: {other} (expected \"debug\", \"profile\" or \"release\")"
            )),
        }
    }
}

/// How the watcher learns about source changes.
///
/// - `Auto`: use OS notifications when the platform supports them, otherwise
///   fall back to polling (default).
/// - `Events`: OS notifications only; startup fails if they are unavailable.
/// - `Polling`: periodic rescan with content hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStrategy {
    Auto,
    Events,
    Polling,
}

impl Default for WatchStrategy {
    fn default() -> Self {
        WatchStrategy::Auto
    }
}

impl fmt::Display for WatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatchStrategy::Auto => "auto",
            WatchStrategy::Events => "events",
            WatchStrategy::Polling => "polling",
        };
        f.write_str(s)
    }
}
