// src/stats.rs

//! Running build statistics for the lifetime of the process.
//!
//! Stats are deliberately not persisted: a fresh process starts from zero,
//! while history and the change cache survive restarts.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::build::BuildRecord;

/// Totals accumulated from finalised build records.
///
/// `total_builds == successful_builds + failed_builds` holds at all times.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunningStats {
    pub total_builds: u64,
    pub successful_builds: u64,
    pub failed_builds: u64,
    /// Sum of build durations, in seconds.
    pub total_build_time: f64,
    pub last_build_timestamp: Option<DateTime<Utc>>,
}

impl RunningStats {
    fn record(&mut self, record: &BuildRecord) {
        self.total_builds += 1;
        if record.success() {
            self.successful_builds += 1;
        } else {
            self.failed_builds += 1;
        }
        self.total_build_time += record.duration_secs();
        self.last_build_timestamp = Some(record.end_time());
    }

    /// Totals over `records`, e.g. a restored history.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a BuildRecord>,
    {
        let mut stats = Self::default();
        for record in records {
            stats.record(record);
        }
        stats
    }

    /// Percentage of successful builds, `None` before the first build.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_builds > 0)
            .then(|| self.successful_builds as f64 / self.total_builds as f64 * 100.0)
    }

    /// Mean build duration in seconds, `None` before the first build.
    pub fn average_build_time(&self) -> Option<f64> {
        (self.total_builds > 0).then(|| self.total_build_time / self.total_builds as f64)
    }
}

/// Thread-safe accumulator.
///
/// Recording and snapshotting take the same lock, so a snapshot taken while a
/// build is being recorded never shows counters from two different states.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    stats: Mutex<RunningStats>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RunningStats> {
        self.stats.lock().unwrap_or_else(|poisoned| {
            warn!("stats mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Fold one finalised record in and return the updated totals.
    pub fn record(&self, record: &BuildRecord) -> RunningStats {
        let mut stats = self.lock();
        stats.record(record);
        stats.clone()
    }

    pub fn snapshot(&self) -> RunningStats {
        self.lock().clone()
    }
}
