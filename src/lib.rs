// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod persist;
pub mod serve;
pub mod stats;
pub mod types;
pub mod watch;

use std::io::ErrorKind;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::build::{Orchestrator, RealProcessRunner};
use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, ResolvedPaths};
use crate::fs::{FileSystem, RealFileSystem};
use crate::persist::Persister;
use crate::stats::RunningStats;
use crate::types::BuildMode;
use crate::watch::{SourceFilter, initial_build, select_observer};

/// Resolve the configured directories against the current working
/// directory.
pub fn resolve_paths(cfg: &ConfigFile) -> Result<ResolvedPaths> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    Ok(ResolvedPaths::resolve(&cfg.paths, &cwd))
}

/// High-level entry point used by `main.rs`, after config and logging are
/// set up.
pub async fn run(args: CliArgs, cfg: ConfigFile, paths: ResolvedPaths) -> Result<()> {
    let cfg = Arc::new(cfg);

    match args.command {
        Command::Build => run_build(cfg, paths, args.mode).await,
        Command::Watch => run_watch(cfg, paths, args.mode).await,
        Command::Stats => {
            print_stats(&cfg, &paths);
            Ok(())
        }
        Command::Clean => clean(&paths),
        Command::Serve { port } => {
            let port = port.unwrap_or(cfg.server.port);
            let listener = serve::bind(port).await?;
            serve::serve(listener, paths.public_dir.clone(), shutdown_on_ctrl_c()).await
        }
    }
}

fn orchestrator(cfg: Arc<ConfigFile>, paths: ResolvedPaths) -> Orchestrator {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    Orchestrator::new(cfg, paths, fs, Arc::new(RealProcessRunner))
}

/// One build. A failed build is logged and recorded but still exits 0.
async fn run_build(cfg: Arc<ConfigFile>, paths: ResolvedPaths, mode: BuildMode) -> Result<()> {
    let filter = Arc::new(SourceFilter::from_config(&cfg.watch)?);
    let orchestrator = orchestrator(cfg, paths);

    match initial_build(&orchestrator, &filter, mode).await {
        Some(record) if record.success() => info!(mode = %mode, "done"),
        Some(_) => error!(mode = %mode, "build failed; see the error above"),
        None => warn!(mode = %mode, "build skipped"),
    }
    Ok(())
}

async fn run_watch(cfg: Arc<ConfigFile>, paths: ResolvedPaths, mode: BuildMode) -> Result<()> {
    if !cfg.watch.enabled {
        info!("watching disabled in config; building once");
        return run_build(cfg, paths, mode).await;
    }

    let orchestrator = Arc::new(orchestrator(cfg, paths));
    let mut observer = select_observer(orchestrator)?;
    info!(strategy = %observer.strategy(), mode = %mode, "watching for changes (Ctrl-C to stop)");

    observer.observe(mode, shutdown_on_ctrl_c()).await?;
    info!("stopped watching");
    Ok(())
}

/// Totals are derived from the persisted history: running stats only live
/// as long as a `watch` process.
fn print_stats(cfg: &ConfigFile, paths: &ResolvedPaths) {
    let persister = Persister::from_paths(Arc::new(RealFileSystem), paths);
    let history = persister.restore_history(cfg.history.limit);
    let stats = RunningStats::from_records(history.iter());
    print!(
        "{}",
        dashboard::render(&stats, &history, dashboard::RECENT_BUILDS)
    );
}

/// Remove the cache dir so the next build treats every file as changed.
pub fn clean(paths: &ResolvedPaths) -> Result<()> {
    match std::fs::remove_dir_all(&paths.cache_dir) {
        Ok(()) => {
            info!(path = ?paths.cache_dir, "removed change cache");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = ?paths.cache_dir, "no change cache to remove");
            Ok(())
        }
        Err(err) => {
            Err(err).with_context(|| format!("removing cache dir {:?}", paths.cache_dir))
        }
    }
}

/// Broadcast a shutdown signal on the first Ctrl-C.
fn shutdown_on_ctrl_c() -> broadcast::Receiver<()> {
    let (tx, rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl-C");
            // Keep the sender alive; dropping it would read as a shutdown.
            std::future::pending::<()>().await;
        }
        info!("interrupt received; shutting down");
        let _ = tx.send(());
    });
    rx
}
