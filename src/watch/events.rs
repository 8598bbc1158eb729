// src/watch/events.rs

use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::build::Orchestrator;
use crate::types::{BuildMode, WatchStrategy};
use crate::watch::debounce::Debouncer;
use crate::watch::observer::{
    ChangeObserver, display_paths, filter_changed, initial_build, refresh_digests,
};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::SourceFilter;

/// Event-driven strategy backed by `notify`.
///
/// Qualifying paths are coalesced by a [`Debouncer`]; each flushed burst
/// becomes at most one build.
pub struct EventObserver {
    orchestrator: Arc<Orchestrator>,
    filter: Arc<SourceFilter>,
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    events_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    debouncer: Debouncer,
    /// Paths already confirmed changed whose build was skipped.
    carried: BTreeSet<PathBuf>,
}

impl std::fmt::Debug for EventObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventObserver")
            .field("root", &self.root)
            .field("pending", &self.debouncer.pending_len())
            .finish_non_exhaustive()
    }
}

impl EventObserver {
    /// Create the OS watcher and start watching the source directory.
    ///
    /// Fails if notifications are unsupported or the directory cannot be
    /// watched; `auto` selection falls back to polling in that case.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Result<Self> {
        let watch_cfg = &orchestrator.config().watch;
        let filter = Arc::new(SourceFilter::from_config(watch_cfg)?);
        let debouncer = Debouncer::new(
            Duration::from_millis(watch_cfg.debounce_ms),
            Duration::from_millis(watch_cfg.max_coalesce_ms),
        );
        let root = orchestrator.paths().source_dir.clone();

        // Channel from the blocking notify callback into the async world.
        let (event_tx, events_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // Receiver gone means the observer is shutting down.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        info!(root = ?root, "file watcher started");

        Ok(Self {
            orchestrator,
            filter,
            root,
            watcher: Some(watcher),
            events_rx,
            debouncer,
            carried: BTreeSet::new(),
        })
    }

    fn on_event(&mut self, event: Event) {
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }

        let now = Instant::now().into_std();
        for path in event.paths {
            let Some(rel) = relative_str(&self.root, &path) else {
                debug!(path = ?path, "event outside source dir; ignoring");
                continue;
            };
            if !self.filter.matches(&rel) {
                continue;
            }
            debug!(path = %rel, kind = ?event.kind, "source change");
            // Re-anchor under the configured root so cache keys match scans.
            self.debouncer.record(self.root.join(&rel), now);
        }
    }

    async fn flush(&mut self, mode: BuildMode) {
        let Some(batch) = self.debouncer.take_due(Instant::now().into_std()) else {
            return;
        };

        let mut changed: BTreeSet<PathBuf> = std::mem::take(&mut self.carried);
        let fresh: Vec<PathBuf> = batch
            .iter()
            .filter(|p| !changed.contains(*p))
            .cloned()
            .collect();

        if self.orchestrator.config().watch.use_hash {
            changed.extend(filter_changed(&self.orchestrator, fresh).await);
        } else {
            refresh_digests(&self.orchestrator, fresh.clone()).await;
            changed.extend(fresh);
        }

        if changed.is_empty() {
            info!(files = batch.len(), "no content changes in batch; skipping build");
            return;
        }

        let files = display_paths(&self.orchestrator.paths().workspace, &changed);
        info!(mode = %mode, files = files.len(), "changes detected; rebuilding");

        if self.orchestrator.build(mode, files).await.is_none() {
            debug!(files = changed.len(), "build skipped; requeueing batch");
            self.debouncer
                .requeue(changed.iter().cloned(), Instant::now().into_std());
            self.carried = changed;
        }
    }

    fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(err) = watcher.unwatch(&self.root) {
                debug!(error = %err, "unwatch failed");
            }
            info!(root = ?self.root, "file watcher stopped");
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl ChangeObserver for EventObserver {
    fn strategy(&self) -> WatchStrategy {
        WatchStrategy::Events
    }

    fn observe(
        &mut self,
        mode: BuildMode,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            initial_build(&self.orchestrator, &self.filter, mode).await;

            loop {
                let deadline = self.debouncer.deadline().map(Instant::from_std);

                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!("shutdown requested");
                        break;
                    }
                    maybe_event = self.events_rx.recv() => match maybe_event {
                        Some(Ok(event)) => self.on_event(event),
                        Some(Err(err)) => warn!(error = %err, "file watch error"),
                        None => {
                            warn!("file watcher channel closed");
                            break;
                        }
                    },
                    _ = sleep_until_opt(deadline) => self.flush(mode).await,
                }
            }

            self.stop();
            Ok(())
        })
    }
}

impl Drop for EventObserver {
    fn drop(&mut self) {
        self.stop();
    }
}
