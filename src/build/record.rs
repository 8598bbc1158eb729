// src/build/record.rs

//! Build records.
//!
//! A build starts life as a [`PendingBuild`] (no end time). Finishing it
//! consumes the pending value and yields an immutable [`BuildRecord`], so a
//! record can only be finalised once.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::BuildMode;

static WARNING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)warning").expect("static regex is valid"));

/// Lines of compiler stdout that mention a warning (case-insensitive).
pub fn collect_warnings(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| WARNING_MARKER.is_match(line))
        .map(|line| line.trim_end().to_string())
        .collect()
}

/// What a build step produced, before timing is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub success: bool,
    pub error_message: String,
    pub output_size_primary: u64,
    pub output_size_binary: u64,
    pub warnings: Vec<String>,
}

impl BuildOutcome {
    pub fn succeeded(output_size_primary: u64, output_size_binary: u64, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            error_message: String::new(),
            output_size_primary,
            output_size_binary,
            warnings,
        }
    }

    /// A failed outcome. An empty `message` is replaced so a failed record
    /// always carries an error.
    pub fn failed(message: impl Into<String>, warnings: Vec<String>) -> Self {
        let mut error_message: String = message.into();
        if error_message.trim().is_empty() {
            error_message = "build failed".to_string();
        }
        Self {
            success: false,
            error_message,
            output_size_primary: 0,
            output_size_binary: 0,
            warnings,
        }
    }
}

/// A build that has started but not finished.
#[derive(Debug)]
pub struct PendingBuild {
    start_time: DateTime<Utc>,
    mode: BuildMode,
    files_changed: Vec<String>,
}

impl PendingBuild {
    pub fn start(mode: BuildMode, files_changed: Vec<String>) -> Self {
        Self::start_at(mode, files_changed, Utc::now())
    }

    pub fn start_at(mode: BuildMode, files_changed: Vec<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            mode,
            files_changed,
        }
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn files_changed(&self) -> &[String] {
        &self.files_changed
    }

    pub fn finish(self, outcome: BuildOutcome) -> BuildRecord {
        self.finish_at(outcome, Utc::now())
    }

    /// Finalise at `end_time`, clamped so it is never before the start.
    pub fn finish_at(self, outcome: BuildOutcome, end_time: DateTime<Utc>) -> BuildRecord {
        BuildRecord {
            start_time: self.start_time,
            end_time: end_time.max(self.start_time),
            success: outcome.success,
            mode: self.mode,
            files_changed: self.files_changed,
            output_size_primary: outcome.output_size_primary,
            output_size_binary: outcome.output_size_binary,
            error_message: outcome.error_message,
            warnings: outcome.warnings,
        }
    }
}

/// Immutable summary of one build attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    success: bool,
    mode: BuildMode,
    #[serde(default)]
    files_changed: Vec<String>,
    /// Size of the `.js` loader.
    #[serde(default)]
    output_size_primary: u64,
    /// Size of the `.wasm` payload.
    #[serde(default)]
    output_size_binary: u64,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    warnings: Vec<String>,
}

impl BuildRecord {
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn files_changed(&self) -> &[String] {
        &self.files_changed
    }

    pub fn output_size_primary(&self) -> u64 {
        self.output_size_primary
    }

    pub fn output_size_binary(&self) -> u64 {
        self.output_size_binary
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn duration(&self) -> chrono::TimeDelta {
        self.end_time - self.start_time
    }

    /// Duration in fractional seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration()
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}
