// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{BuildMode, WatchStrategy};

/// Top-level configuration as read from a TOML (or JSON) file.
///
/// ```toml
/// common_flags = ["-s WASM=1"]
///
/// [paths]
/// workspace = "."
/// source_dir = "wasm"
///
/// [build_modes.release]
/// optimization = "-O3"
/// flags = ["-s MALLOC=emmalloc"]
///
/// [watch]
/// debounce_ms = 1000
/// ```
///
/// Every section is optional and falls back to the defaults documented on
/// each field.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    /// Per-mode optimisation level and extra flags, keyed by mode name.
    #[serde(default = "default_build_modes")]
    pub build_modes: BTreeMap<String, ModeConfig>,

    /// Flags shared by every mode, placed before the mode's optimisation flag.
    #[serde(default)]
    pub common_flags: Vec<String>,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub toolchain: ToolchainSection,

    #[serde(default)]
    pub history: HistorySection,

    #[serde(default)]
    pub server: ServerSection,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            paths: PathsSection::default(),
            build_modes: default_build_modes(),
            common_flags: Vec::new(),
            watch: WatchSection::default(),
            toolchain: ToolchainSection::default(),
            history: HistorySection::default(),
            server: ServerSection::default(),
        }
    }
}

/// Validated configuration.
///
/// Built from a [`RawConfigFile`] via `TryFrom` (see `validate.rs`), so the
/// rest of the crate can rely on the invariants checked there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub build_modes: BTreeMap<String, ModeConfig>,
    pub common_flags: Vec<String>,
    pub watch: WatchSection,
    pub toolchain: ToolchainSection,
    pub history: HistorySection,
    pub server: ServerSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            build_modes: raw.build_modes,
            common_flags: raw.common_flags,
            watch: raw.watch,
            toolchain: raw.toolchain,
            history: raw.history,
            server: raw.server,
        }
    }

    /// Optimisation flag and extra flags for `mode`.
    ///
    /// A mode without a `[build_modes.<mode>]` entry compiles with `-O3` and
    /// no extra flags.
    pub fn mode_config(&self, mode: BuildMode) -> ModeConfig {
        self.build_modes
            .get(mode.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile::new_unchecked(RawConfigFile::default())
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// Project root; the compiler runs with this as its working directory.
    /// A relative value resolves against the process working directory.
    pub workspace: PathBuf,
    /// Directory holding the watched C/C++ sources.
    pub source_dir: PathBuf,
    /// Directory the compiler writes artifacts into (and `serve` serves).
    pub public_dir: PathBuf,
    /// Directory for `file_hashes.json`.
    pub cache_dir: PathBuf,
    /// Directory for `build_history.json` and the log file.
    pub logs_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            source_dir: PathBuf::from("wasm"),
            public_dir: PathBuf::from("public"),
            cache_dir: PathBuf::from(".build-cache"),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

/// `[build_modes.<mode>]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModeConfig {
    #[serde(default = "default_optimization")]
    pub optimization: String,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            optimization: default_optimization(),
            flags: Vec::new(),
        }
    }
}

fn default_optimization() -> String {
    "-O3".to_string()
}

fn default_build_modes() -> BTreeMap<String, ModeConfig> {
    let mut modes = BTreeMap::new();
    modes.insert(
        BuildMode::Debug.as_str().to_string(),
        ModeConfig {
            optimization: "-O0".to_string(),
            flags: vec!["-g".to_string()],
        },
    );
    modes.insert(
        BuildMode::Profile.as_str().to_string(),
        ModeConfig {
            optimization: "-O2".to_string(),
            flags: vec!["--profiling".to_string()],
        },
    );
    modes.insert(
        BuildMode::Release.as_str().to_string(),
        ModeConfig {
            optimization: "-O3".to_string(),
            flags: vec!["-s MALLOC=emmalloc".to_string()],
        },
    );
    modes
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// When false, `watch` performs a single build and exits.
    pub enabled: bool,
    /// Quiet period after the last event of a burst before it is flushed.
    pub debounce_ms: u64,
    /// Upper bound on how long a burst may keep coalescing, measured from its
    /// first event. Raised to `debounce_ms` at load time if smaller.
    pub max_coalesce_ms: u64,
    /// Rescan interval for the polling strategy.
    pub poll_interval_ms: u64,
    pub strategy: WatchStrategy,
    /// Recognised source-file extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Glob patterns (relative to the source dir) that are never monitored.
    pub exclude: Vec<String>,
    /// Drop event-driven changes whose content digest did not change.
    pub use_hash: bool,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 1000,
            max_coalesce_ms: 5000,
            poll_interval_ms: 2000,
            strategy: WatchStrategy::Auto,
            extensions: vec!["cpp".to_string(), "h".to_string(), "hpp".to_string()],
            exclude: Vec::new(),
            use_hash: true,
        }
    }
}

/// `[toolchain]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolchainSection {
    /// Compiler binary looked up on `PATH`.
    pub compiler: String,
    /// Directory (relative to the workspace) prepended to `PATH` when the
    /// compiler is not found on the first probe.
    pub activation_dir: PathBuf,
    /// Translation units, relative to the source dir. Missing ones are skipped.
    pub sources: Vec<PathBuf>,
    /// Include directory, relative to the source dir.
    pub include_dir: PathBuf,
    /// Base name of the `.js` / `.wasm` artifacts.
    pub output_name: String,
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            compiler: "emcc".to_string(),
            activation_dir: PathBuf::from("emsdk/upstream/emscripten"),
            sources: vec![
                PathBuf::from("game_engine.cpp"),
                PathBuf::from("src/entity.cpp"),
            ],
            include_dir: PathBuf::from("include"),
            output_name: "game_engine".to_string(),
        }
    }
}

/// `[history]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Number of most recent build records kept on disk.
    pub limit: usize,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self { limit: 100 }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// Every on-disk location the daemon touches, resolved to absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub workspace: PathBuf,
    pub source_dir: PathBuf,
    pub public_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub logs_dir: PathBuf,
}

pub const CACHE_FILE_NAME: &str = "file_hashes.json";
pub const HISTORY_FILE_NAME: &str = "build_history.json";
pub const LOG_FILE_NAME: &str = "build-monitor.log";

impl ResolvedPaths {
    /// Resolve `paths` against `cwd`.
    ///
    /// The workspace resolves against `cwd`; every other directory resolves
    /// against the workspace. Absolute values are kept as-is.
    pub fn resolve(paths: &PathsSection, cwd: &Path) -> Self {
        let workspace = join_if_relative(cwd, &paths.workspace);
        Self {
            source_dir: join_if_relative(&workspace, &paths.source_dir),
            public_dir: join_if_relative(&workspace, &paths.public_dir),
            cache_dir: join_if_relative(&workspace, &paths.cache_dir),
            logs_dir: join_if_relative(&workspace, &paths.logs_dir),
            workspace,
        }
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE_NAME)
    }

    pub fn history_file(&self) -> PathBuf {
        self.logs_dir.join(HISTORY_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs_dir.join(LOG_FILE_NAME)
    }
}

fn join_if_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else if path == Path::new(".") {
        base.to_path_buf()
    } else {
        base.join(path)
    }
}
