// src/watch/polling.rs

use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::build::Orchestrator;
use crate::types::{BuildMode, WatchStrategy};
use crate::watch::observer::{ChangeObserver, display_paths, initial_build, scan_changed};
use crate::watch::patterns::SourceFilter;

/// Polling strategy: rescan and rehash every monitored file on a fixed
/// interval.
///
/// Works everywhere, including filesystems that do not deliver change
/// notifications. Changes found while another build holds the single-flight
/// flag are carried into the next poll.
#[derive(Debug)]
pub struct PollingObserver {
    orchestrator: Arc<Orchestrator>,
    filter: Arc<SourceFilter>,
    interval: Duration,
    carried: BTreeSet<PathBuf>,
}

impl PollingObserver {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Result<Self> {
        let watch_cfg = &orchestrator.config().watch;
        let filter = Arc::new(SourceFilter::from_config(watch_cfg)?);
        let interval = Duration::from_millis(watch_cfg.poll_interval_ms);
        Ok(Self {
            orchestrator,
            filter,
            interval,
            carried: BTreeSet::new(),
        })
    }

    /// One poll: rescan, then build if anything changed (now or earlier).
    pub async fn poll_once(&mut self, mode: BuildMode) {
        match scan_changed(&self.orchestrator, &self.filter).await {
            Ok(changed) => self.carried.extend(changed),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "source scan failed");
                return;
            }
        }

        if self.carried.is_empty() {
            return;
        }

        let files = display_paths(&self.orchestrator.paths().workspace, &self.carried);
        info!(mode = %mode, files = files.len(), "changes detected; rebuilding");

        if self.orchestrator.build(mode, files).await.is_some() {
            self.carried.clear();
        } else {
            debug!(files = self.carried.len(), "build skipped; carrying changes forward");
        }
    }
}

impl ChangeObserver for PollingObserver {
    fn strategy(&self) -> WatchStrategy {
        WatchStrategy::Polling
    }

    fn observe(
        &mut self,
        mode: BuildMode,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            info!(
                root = ?self.orchestrator.paths().source_dir,
                interval_ms = self.interval.as_millis() as u64,
                "polling for changes"
            );

            initial_build(&self.orchestrator, &self.filter, mode).await;

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!("shutdown requested");
                        break;
                    }
                    _ = ticker.tick() => self.poll_once(mode).await,
                }
            }

            info!("polling stopped");
            Ok(())
        })
    }
}
