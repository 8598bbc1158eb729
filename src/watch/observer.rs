// src/watch/observer.rs

//! The monitoring-strategy seam and the pieces both strategies share.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::build::{BuildRecord, Orchestrator};
use crate::types::{BuildMode, WatchStrategy};
use crate::watch::events::EventObserver;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{SourceFilter, collect_source_files};
use crate::watch::polling::PollingObserver;

/// A way of noticing source changes and turning them into builds.
///
/// `observe` fires one initial build, then loops until `shutdown` fires (or
/// its sender is dropped).
pub trait ChangeObserver: Send {
    fn strategy(&self) -> WatchStrategy;

    fn observe(
        &mut self,
        mode: BuildMode,
        shutdown: broadcast::Receiver<()>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Pick the observer for `[watch].strategy`.
///
/// `auto` tries OS notifications first and falls back to polling with a
/// warning if the watcher cannot be created.
pub fn select_observer(orchestrator: Arc<Orchestrator>) -> Result<Box<dyn ChangeObserver>> {
    let strategy = orchestrator.config().watch.strategy;
    match strategy {
        WatchStrategy::Polling => Ok(Box::new(PollingObserver::new(orchestrator)?)),
        WatchStrategy::Events => Ok(Box::new(
            EventObserver::new(orchestrator).context("starting file notifications")?,
        )),
        WatchStrategy::Auto => match EventObserver::new(orchestrator.clone()) {
            Ok(observer) => Ok(Box::new(observer)),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "file notifications unavailable; falling back to polling");
                Ok(Box::new(PollingObserver::new(orchestrator)?))
            }
        },
    }
}

/// Hash every monitored file and return the ones whose content changed.
///
/// Runs on the blocking pool. Each path goes through the change cache, so a
/// second scan without modifications returns nothing.
pub async fn scan_changed(
    orchestrator: &Orchestrator,
    filter: &Arc<SourceFilter>,
) -> Result<Vec<PathBuf>> {
    let fs = orchestrator.fs();
    let cache = orchestrator.cache().clone();
    let root = orchestrator.paths().source_dir.clone();
    let filter = filter.clone();

    tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
        let files = collect_source_files(fs.as_ref(), &root, &filter)?;
        Ok(files.into_iter().filter(|p| cache.changed(p)).collect())
    })
    .await
    .context("source scan task failed")?
}

/// Pass `paths` through the change cache on the blocking pool, keeping only
/// those whose content changed.
pub async fn filter_changed(orchestrator: &Orchestrator, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let cache = orchestrator.cache().clone();
    let fallback = paths.clone();
    match tokio::task::spawn_blocking(move || {
        paths
            .into_iter()
            .filter(|p| cache.changed(p))
            .collect::<Vec<_>>()
    })
    .await
    {
        Ok(changed) => changed,
        Err(err) => {
            warn!(error = %err, "hash check failed; treating batch as changed");
            fallback
        }
    }
}

/// Record the current digest of `paths` without filtering, so the persisted
/// cache tracks what was built even when hash filtering is off.
pub async fn refresh_digests(orchestrator: &Orchestrator, paths: Vec<PathBuf>) {
    let cache = orchestrator.cache().clone();
    let refreshed = tokio::task::spawn_blocking(move || {
        for path in &paths {
            cache.changed(path);
        }
    })
    .await;
    if let Err(err) = refreshed {
        warn!(error = %err, "refreshing digests failed");
    }
}

/// The startup build both strategies fire.
///
/// Runs regardless of cache state. Priming the cache here means the first
/// poll (or event batch) only sees edits made after startup.
pub async fn initial_build(
    orchestrator: &Orchestrator,
    filter: &Arc<SourceFilter>,
    mode: BuildMode,
) -> Option<BuildRecord> {
    let changed = match scan_changed(orchestrator, filter).await {
        Ok(changed) => changed,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "could not scan sources before initial build");
            Vec::new()
        }
    };
    info!(mode = %mode, files = changed.len(), "initial build");
    orchestrator
        .build(mode, display_paths(&orchestrator.paths().workspace, &changed))
        .await
}

/// Paths as recorded in build records: relative to the workspace when
/// possible.
pub fn display_paths<'a, I>(workspace: &Path, paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let unique: BTreeSet<String> = paths
        .into_iter()
        .map(|p| relative_str(workspace, p).unwrap_or_else(|| p.to_string_lossy().into_owned()))
        .collect();
    debug!(files = ?unique, "changed files");
    unique.into_iter().collect()
}
