// src/persist.rs

//! Durable state: the change cache and the bounded build history.
//!
//! Both are pretty-printed JSON so they can be inspected by hand. Writes go
//! to `<file>.json.tmp` first and are renamed into place, so an interrupted
//! write never leaves a truncated file behind. Every failure here is logged
//! and swallowed: losing a cache write only costs an extra rebuild.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::build::BuildRecord;
use crate::config::ResolvedPaths;
use crate::fs::FileSystem;
use crate::watch::hash::Digest;

/// The most recent build records, oldest first.
#[derive(Debug, Clone)]
pub struct BuildHistory {
    records: VecDeque<BuildRecord>,
    limit: usize,
}

impl BuildHistory {
    /// `limit` is clamped to at least 1.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            records: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Keep the newest `limit` of `records` (given oldest first).
    pub fn from_records(records: Vec<BuildRecord>, limit: usize) -> Self {
        let mut history = Self::new(limit);
        for record in records {
            history.push(record);
        }
        history
    }

    /// Append a record, evicting the oldest once the limit is exceeded.
    pub fn push(&mut self, record: BuildRecord) {
        self.records.push_back(record);
        while self.records.len() > self.limit {
            self.records.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BuildRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&BuildRecord> {
        self.records.back()
    }
}

#[derive(Serialize)]
struct HistoryEntry<'a> {
    #[serde(flatten)]
    record: &'a BuildRecord,
    duration_secs: f64,
}

/// Reads and writes the cache and history files.
#[derive(Debug, Clone)]
pub struct Persister {
    fs: Arc<dyn FileSystem>,
    cache_file: PathBuf,
    history_file: PathBuf,
}

impl Persister {
    pub fn new(fs: Arc<dyn FileSystem>, cache_file: PathBuf, history_file: PathBuf) -> Self {
        Self {
            fs,
            cache_file,
            history_file,
        }
    }

    pub fn from_paths(fs: Arc<dyn FileSystem>, paths: &ResolvedPaths) -> Self {
        Self::new(fs, paths.cache_file(), paths.history_file())
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn history_file(&self) -> &Path {
        &self.history_file
    }

    /// Write both files. Failures are logged, never returned.
    pub fn persist(&self, cache: &BTreeMap<String, Digest>, history: &BuildHistory) {
        match self.write_json(&self.cache_file, cache) {
            Ok(()) => debug!(path = ?self.cache_file, entries = cache.len(), "saved change cache"),
            Err(err) => error!(path = ?self.cache_file, error = %format!("{err:#}"), "failed to save change cache"),
        }

        let entries: Vec<HistoryEntry<'_>> = history
            .iter()
            .map(|record| HistoryEntry {
                record,
                duration_secs: record.duration_secs(),
            })
            .collect();

        match self.write_json(&self.history_file, &entries) {
            Ok(()) => debug!(path = ?self.history_file, entries = entries.len(), "saved build history"),
            Err(err) => error!(path = ?self.history_file, error = %format!("{err:#}"), "failed to save build history"),
        }
    }

    /// Load the change cache. Missing or malformed files yield an empty map.
    pub fn restore_cache(&self) -> BTreeMap<String, Digest> {
        match self.read_json::<BTreeMap<String, Digest>>(&self.cache_file) {
            Ok(Some(cache)) => {
                info!(path = ?self.cache_file, entries = cache.len(), "loaded change cache");
                cache
            }
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!(path = ?self.cache_file, error = %format!("{err:#}"), "ignoring unreadable change cache");
                BTreeMap::new()
            }
        }
    }

    /// Load the build history, keeping the newest `limit` records.
    pub fn restore_history(&self, limit: usize) -> BuildHistory {
        match self.read_json::<Vec<BuildRecord>>(&self.history_file) {
            Ok(Some(records)) => {
                let history = BuildHistory::from_records(records, limit);
                info!(path = ?self.history_file, entries = history.len(), "loaded build history");
                history
            }
            Ok(None) => BuildHistory::new(limit),
            Err(err) => {
                warn!(path = ?self.history_file, error = %format!("{err:#}"), "ignoring unreadable build history");
                BuildHistory::new(limit)
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("serializing JSON")?;
        let tmp = path.with_extension("json.tmp");
        self.fs.write(&tmp, json.as_bytes())?;
        self.fs.rename(&tmp, path)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !self.fs.exists(path) {
            return Ok(None);
        }
        let contents = self.fs.read_to_string(path)?;
        let value = serde_json::from_str(&contents)
            .with_context(|| format!("parsing JSON from {:?}", path))?;
        Ok(Some(value))
    }
}
