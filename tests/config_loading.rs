// tests/config_loading.rs

mod common;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use buildmon::config::{
    ConfigFile, LoadOutcome, ResolvedPaths, load_and_validate, load_or_default, load_quiet,
};
use buildmon::types::{BuildMode, WatchStrategy};

use crate::common::builders::ConfigFileBuilder;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_match_documented_values() {
    let cfg = ConfigFile::default();

    assert_eq!(cfg.paths.source_dir, PathBuf::from("wasm"));
    assert_eq!(cfg.paths.public_dir, PathBuf::from("public"));
    assert_eq!(cfg.watch.debounce_ms, 1000);
    assert_eq!(cfg.watch.max_coalesce_ms, 5000);
    assert_eq!(cfg.watch.poll_interval_ms, 2000);
    assert_eq!(cfg.watch.strategy, WatchStrategy::Auto);
    assert_eq!(cfg.watch.extensions, vec!["cpp", "h", "hpp"]);
    assert!(cfg.watch.use_hash);
    assert_eq!(cfg.toolchain.compiler, "emcc");
    assert_eq!(cfg.toolchain.output_name, "game_engine");
    assert_eq!(cfg.history.limit, 100);
    assert_eq!(cfg.server.port, 8000);

    let debug = cfg.mode_config(BuildMode::Debug);
    assert_eq!(debug.optimization, "-O0");
    assert_eq!(debug.flags, vec!["-g"]);
    let profile = cfg.mode_config(BuildMode::Profile);
    assert_eq!(profile.optimization, "-O2");
    assert_eq!(profile.flags, vec!["--profiling"]);
    let release = cfg.mode_config(BuildMode::Release);
    assert_eq!(release.optimization, "-O3");
    assert_eq!(release.flags, vec!["-s MALLOC=emmalloc"]);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (cfg, outcome) = load_quiet(dir.path().join("absent.toml"));

    assert!(matches!(outcome, LoadOutcome::Missing));
    assert_eq!(cfg.history.limit, 100);
}

#[test]
fn malformed_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "buildmon.toml", "[watch\ndebounce_ms = ");

    let (cfg, outcome) = load_quiet(&path);
    assert!(matches!(outcome, LoadOutcome::Invalid(_)));
    assert_eq!(cfg.watch.debounce_ms, 1000);

    // The logging wrapper behaves the same.
    assert_eq!(load_or_default(&path).watch.debounce_ms, 1000);
}

#[test]
fn invalid_values_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "buildmon.toml", "[history]\nlimit = 0\n");

    let (cfg, outcome) = load_quiet(&path);
    match outcome {
        LoadOutcome::Invalid(msg) => assert!(msg.contains("[history].limit"), "{msg}"),
        other => panic!("expected invalid, got {other:?}"),
    }
    assert_eq!(cfg.history.limit, 100);
}

#[test]
fn partial_toml_keeps_other_defaults() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_config(
        dir.path(),
        "buildmon.toml",
        r#"
common_flags = ["-s WASM=1"]

[watch]
debounce_ms = 250
strategy = "polling"
extensions = [".CPP", "h"]

[build_modes.release]
optimization = "-O2"
"#,
    );

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.common_flags, vec!["-s WASM=1"]);
    assert_eq!(cfg.watch.debounce_ms, 250);
    assert_eq!(cfg.watch.max_coalesce_ms, 5000);
    assert_eq!(cfg.watch.strategy, WatchStrategy::Polling);
    assert_eq!(cfg.watch.extensions, vec!["cpp", "h"]);
    assert_eq!(cfg.mode_config(BuildMode::Release).optimization, "-O2");
    assert!(cfg.mode_config(BuildMode::Release).flags.is_empty());

    // Modes absent from a user file compile with -O3 and no flags.
    let debug = cfg.mode_config(BuildMode::Debug);
    assert_eq!(debug.optimization, "-O3");
    assert!(debug.flags.is_empty());
    Ok(())
}

#[test]
fn json_config_is_accepted() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = write_config(
        dir.path(),
        "buildmon.json",
        r#"{ "toolchain": { "compiler": "em++" }, "server": { "port": 9000 } }"#,
    );

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.toolchain.compiler, "em++");
    assert_eq!(cfg.server.port, 9000);
    Ok(())
}

#[test]
fn coalesce_window_is_raised_to_debounce() {
    let cfg = ConfigFileBuilder::new()
        .debounce_ms(3000)
        .max_coalesce_ms(100)
        .build();
    assert_eq!(cfg.watch.max_coalesce_ms, 3000);
}

#[test]
fn zero_intervals_are_rejected() {
    let raw = ConfigFileBuilder::new().debounce_ms(0).raw();
    assert!(ConfigFile::try_from(raw).is_err());

    let raw = ConfigFileBuilder::new().poll_interval_ms(0).raw();
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn empty_compiler_and_bad_globs_are_rejected() {
    let raw = ConfigFileBuilder::new().compiler("  ").raw();
    assert!(ConfigFile::try_from(raw).is_err());

    let raw = ConfigFileBuilder::new().exclude("vendor/[").raw();
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn unknown_build_mode_is_rejected() {
    let mut raw = ConfigFileBuilder::new().raw();
    raw.build_modes
        .insert("turbo".to_string(), Default::default());
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn paths_resolve_under_the_workspace() {
    let cfg = ConfigFileBuilder::new().workspace("project").build();
    let paths = ResolvedPaths::resolve(&cfg.paths, Path::new("/home/dev"));

    assert_eq!(paths.workspace, PathBuf::from("/home/dev/project"));
    assert_eq!(paths.source_dir, PathBuf::from("/home/dev/project/wasm"));
    assert_eq!(
        paths.cache_file(),
        PathBuf::from("/home/dev/project/.build-cache/file_hashes.json")
    );
    assert_eq!(
        paths.history_file(),
        PathBuf::from("/home/dev/project/logs/build_history.json")
    );
    assert_eq!(
        paths.log_file(),
        PathBuf::from("/home/dev/project/logs/build-monitor.log")
    );
}

#[test]
fn absolute_workspace_ignores_cwd() {
    let cfg = ConfigFileBuilder::new().workspace("/srv/game").build();
    let paths = ResolvedPaths::resolve(&cfg.paths, Path::new("/home/dev"));
    assert_eq!(paths.public_dir, PathBuf::from("/srv/game/public"));
}

#[test]
fn cli_defaults_to_config_in_working_dir() {
    use buildmon::cli::{CliArgs, Command};
    use buildmon::config::default_config_path;
    use clap::Parser;

    let args = CliArgs::try_parse_from(["buildmon", "build"]).unwrap();
    assert_eq!(args.config, default_config_path());
    assert_eq!(args.mode, BuildMode::Release);
    assert!(matches!(args.command, Command::Build));

    let args = CliArgs::try_parse_from(["buildmon", "watch", "--config", "alt.json"]).unwrap();
    assert_eq!(args.config, PathBuf::from("alt.json"));
}
