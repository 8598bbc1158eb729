#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use buildmon::build::{Orchestrator, ProcessRunner};
use buildmon::config::{ConfigFile, RawConfigFile, ResolvedPaths};
use buildmon::fs::{FileSystem, RealFileSystem};
use buildmon::types::WatchStrategy;
use tempfile::TempDir;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn workspace(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.workspace = path.into();
        self
    }

    pub fn compiler(mut self, compiler: &str) -> Self {
        self.config.toolchain.compiler = compiler.to_string();
        self
    }

    pub fn sources(mut self, sources: &[&str]) -> Self {
        self.config.toolchain.sources = sources.iter().map(PathBuf::from).collect();
        self
    }

    pub fn output_name(mut self, name: &str) -> Self {
        self.config.toolchain.output_name = name.to_string();
        self
    }

    pub fn common_flag(mut self, flag: &str) -> Self {
        self.config.common_flags.push(flag.to_string());
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history.limit = limit;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn max_coalesce_ms(mut self, ms: u64) -> Self {
        self.config.watch.max_coalesce_ms = ms;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.watch.poll_interval_ms = ms;
        self
    }

    pub fn strategy(mut self, strategy: WatchStrategy) -> Self {
        self.config.watch.strategy = strategy;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway project on disk: `<tmp>/wasm/game_engine.cpp`,
/// `<tmp>/wasm/include/` and an empty `<tmp>/public/`.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp workspace");
        let ws = Self { dir };
        ws.write("wasm/game_engine.cpp", "int main() { return 0; }\n");
        std::fs::create_dir_all(ws.root().join("wasm/include")).expect("create include dir");
        std::fs::create_dir_all(ws.root().join("public")).expect("create public dir");
        ws
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel` under the workspace, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write workspace file");
        path
    }

    /// A config builder already pointing at this workspace.
    pub fn config(&self) -> ConfigFileBuilder {
        ConfigFileBuilder::new().workspace(self.root())
    }

    pub fn paths(&self, cfg: &ConfigFile) -> ResolvedPaths {
        ResolvedPaths::resolve(&cfg.paths, self.root())
    }

    /// An orchestrator over the real filesystem with `runner` standing in for
    /// the compiler.
    pub fn orchestrator(&self, cfg: ConfigFile, runner: Arc<dyn ProcessRunner>) -> Orchestrator {
        let paths = self.paths(&cfg);
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        Orchestrator::new(Arc::new(cfg), paths, fs, runner)
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
