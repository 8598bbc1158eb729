// src/build/orchestrator.rs

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::build::command::{ArtifactPaths, assemble};
use crate::build::record::{BuildOutcome, BuildRecord, PendingBuild, collect_warnings};
use crate::build::runner::{ProcessRunner, ProcessSpec};
use crate::build::toolchain::ensure_toolchain;
use crate::config::{ConfigFile, ResolvedPaths};
use crate::errors::BuildError;
use crate::fs::FileSystem;
use crate::persist::{BuildHistory, Persister};
use crate::stats::{RunningStats, StatsAggregator};
use crate::types::BuildMode;
use crate::watch::cache::ChangeCache;

/// A request to build once in `mode` because `changed_files` changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildRequest {
    pub mode: BuildMode,
    pub changed_files: BTreeSet<String>,
}

impl BuildRequest {
    pub fn new<I, S>(mode: BuildMode, changed_files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode,
            changed_files: changed_files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Owns everything a build touches: the change cache, running stats, the
/// bounded history, the persister and the single-flight flag.
///
/// Independent instances share nothing, so tests can run several side by
/// side.
pub struct Orchestrator {
    cfg: Arc<ConfigFile>,
    paths: ResolvedPaths,
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn ProcessRunner>,
    cache: Arc<ChangeCache>,
    stats: Arc<StatsAggregator>,
    history: Arc<Mutex<BuildHistory>>,
    persister: Arc<Persister>,
    in_flight: Arc<Mutex<bool>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("paths", &self.paths)
            .field("cache", &self.cache)
            .field("building", &self.is_building())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag on drop. Owned by the build task, so the flag
/// outlives a caller that stops waiting.
struct InFlightGuard {
    flag: Arc<Mutex<bool>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        *lock_recovering(&self.flag, "in-flight") = false;
    }
}

impl Orchestrator {
    /// Create an orchestrator, restoring the change cache and history from
    /// disk (missing or malformed files start empty).
    pub fn new(
        cfg: Arc<ConfigFile>,
        paths: ResolvedPaths,
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let persister = Persister::from_paths(fs.clone(), &paths);
        let cache = Arc::new(ChangeCache::from_entries(
            fs.clone(),
            persister.restore_cache(),
        ));
        let history = persister.restore_history(cfg.history.limit);

        Self {
            cfg,
            paths,
            fs,
            runner,
            cache,
            stats: Arc::new(StatsAggregator::new()),
            history: Arc::new(Mutex::new(history)),
            persister: Arc::new(persister),
            in_flight: Arc::new(Mutex::new(false)),
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.cfg
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    pub fn fs(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }

    pub fn cache(&self) -> &Arc<ChangeCache> {
        &self.cache
    }

    pub fn stats(&self) -> RunningStats {
        self.stats.snapshot()
    }

    pub fn history(&self) -> BuildHistory {
        lock_recovering(&self.history, "history").clone()
    }

    pub fn is_building(&self) -> bool {
        *lock_recovering(&self.in_flight, "in-flight")
    }

    fn try_begin(&self) -> Option<InFlightGuard> {
        let mut flag = lock_recovering(&self.in_flight, "in-flight");
        if *flag {
            return None;
        }
        *flag = true;
        Some(InFlightGuard {
            flag: Arc::clone(&self.in_flight),
        })
    }

    pub async fn submit(&self, request: BuildRequest) -> Option<BuildRecord> {
        self.build(request.mode, request.changed_files.into_iter().collect())
            .await
    }

    /// Run one build. Returns `None` without doing anything if another build
    /// is already in flight.
    ///
    /// The build runs to completion on its own task: dropping the returned
    /// future stops the wait, not the build, and the record still reaches
    /// stats, history and disk.
    pub async fn build(&self, mode: BuildMode, files_changed: Vec<String>) -> Option<BuildRecord> {
        let Some(guard) = self.try_begin() else {
            info!(mode = %mode, "build already in progress; skipping");
            return None;
        };

        let pending = PendingBuild::start(mode, files_changed);
        info!(
            mode = %mode,
            files = pending.files_changed().len(),
            "build started"
        );

        let job = BuildJob {
            step: BuildStep {
                cfg: self.cfg.clone(),
                paths: self.paths.clone(),
                fs: self.fs.clone(),
                runner: self.runner.clone(),
            },
            cache: Arc::clone(&self.cache),
            stats: Arc::clone(&self.stats),
            history: Arc::clone(&self.history),
            persister: Arc::clone(&self.persister),
        };

        match tokio::spawn(job.run(pending, guard)).await {
            Ok(record) => Some(record),
            Err(err) => {
                error!(mode = %mode, error = %join_error_message(err), "build task aborted");
                None
            }
        }
    }
}

/// One build from compile to persisted record. Holds the in-flight guard
/// until the record is on disk.
struct BuildJob {
    step: BuildStep,
    cache: Arc<ChangeCache>,
    stats: Arc<StatsAggregator>,
    history: Arc<Mutex<BuildHistory>>,
    persister: Arc<Persister>,
}

impl BuildJob {
    async fn run(self, pending: PendingBuild, guard: InFlightGuard) -> BuildRecord {
        let mode = pending.mode();

        // Nested task so a panicking compile still yields a record.
        let outcome = match tokio::spawn(self.step.run(mode)).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let message = join_error_message(err);
                error!(mode = %mode, error = %message, "build step aborted");
                BuildOutcome::failed(message, Vec::new())
            }
        };

        let record = pending.finish(outcome);
        report(&record);

        let totals = self.stats.record(&record);
        info!(
            successful = totals.successful_builds,
            total = totals.total_builds,
            success_rate = format!("{:.1}%", totals.success_rate().unwrap_or(0.0)),
            avg_time = format!("{:.2}s", totals.average_build_time().unwrap_or(0.0)),
            "build statistics"
        );

        let history = {
            let mut history = lock_recovering(&self.history, "history");
            history.push(record.clone());
            history.clone()
        };

        let persister = self.persister;
        let cache = self.cache;
        let written = tokio::task::spawn_blocking(move || {
            persister.persist(&cache.snapshot(), &history);
        })
        .await;
        if let Err(err) = written {
            error!(error = %join_error_message(err), "persisting build state failed");
        }

        drop(guard);
        record
    }
}

/// The part of a build that runs on its own task.
struct BuildStep {
    cfg: Arc<ConfigFile>,
    paths: ResolvedPaths,
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn ProcessRunner>,
}

impl BuildStep {
    async fn run(self, mode: BuildMode) -> BuildOutcome {
        match self.execute(mode).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(mode = %mode, error = %err, "build could not run");
                BuildOutcome::failed(err.to_string(), Vec::new())
            }
        }
    }

    async fn execute(&self, mode: BuildMode) -> Result<BuildOutcome, BuildError> {
        let toolchain = ensure_toolchain(
            self.runner.as_ref(),
            self.fs.as_ref(),
            &self.cfg,
            &self.paths,
        )
        .await?;

        let command = assemble(self.fs.as_ref(), &self.cfg, &self.paths, mode);
        info!(mode = %mode, command = %command, "running compiler");

        let spec = ProcessSpec::new(command.program.clone())
            .args(command.args.iter().cloned())
            .cwd(command.cwd.clone())
            .path_prefix(toolchain.path_prefix.clone());

        let output = self
            .runner
            .run(spec)
            .await
            .map_err(|source| BuildError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let warnings = collect_warnings(&output.stdout);

        if !output.success() {
            let message = if output.stderr.trim().is_empty() {
                match output.status_code {
                    Some(code) => format!("compiler exited with status {code}"),
                    None => "compiler terminated by a signal".to_string(),
                }
            } else {
                output.stderr.clone()
            };
            return Ok(BuildOutcome::failed(message, warnings));
        }

        let artifacts = ArtifactPaths::new(&self.cfg, &self.paths);
        let script_size = self.fs.file_size(&artifacts.script).unwrap_or(0);
        let binary_size = self.fs.file_size(&artifacts.binary).unwrap_or(0);

        Ok(BuildOutcome::succeeded(script_size, binary_size, warnings))
    }
}

fn report(record: &BuildRecord) {
    if record.success() {
        info!(
            mode = %record.mode(),
            duration = format!("{:.2}s", record.duration_secs()),
            js_kb = format!("{:.1}", kb(record.output_size_primary())),
            wasm_kb = format!("{:.1}", kb(record.output_size_binary())),
            "build succeeded"
        );
    } else {
        error!(
            mode = %record.mode(),
            duration = format!("{:.2}s", record.duration_secs()),
            error = %record.error_message().trim_end(),
            "build failed"
        );
    }
    for warning in record.warnings() {
        warn!(mode = %record.mode(), "{warning}");
    }
}

fn kb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}

fn join_error_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return BuildError::Internal("build task was cancelled".to_string()).to_string();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    BuildError::Internal(format!("build step panicked: {detail}")).to_string()
}

fn lock_recovering<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!(lock = name, "mutex poisoned; recovering");
        poisoned.into_inner()
    })
}
