// tests/command_assembly.rs

mod common;

use std::path::{Path, PathBuf};

use buildmon::build::{ArtifactPaths, assemble};
use buildmon::config::ResolvedPaths;
use buildmon::fs::mock::MockFileSystem;
use buildmon::types::BuildMode;

use crate::common::builders::ConfigFileBuilder;

fn paths_for(cfg: &buildmon::config::ConfigFile) -> ResolvedPaths {
    ResolvedPaths::resolve(&cfg.paths, Path::new("/ws"))
}

#[test]
fn release_command_has_documented_order() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/wasm/game_engine.cpp", "int main() {}");
    fs.add_file("/ws/wasm/src/entity.cpp", "struct Entity {};");

    let cfg = ConfigFileBuilder::new().common_flag("-s WASM=1").build();
    let cmd = assemble(&fs, &cfg, &paths_for(&cfg), BuildMode::Release);

    assert_eq!(cmd.program, "emcc");
    assert_eq!(cmd.cwd, PathBuf::from("/ws"));
    assert_eq!(
        cmd.args,
        vec![
            "/ws/wasm/game_engine.cpp",
            "/ws/wasm/src/entity.cpp",
            "-I/ws/wasm/include",
            "-s",
            "WASM=1",
            "-O3",
            "-s",
            "MALLOC=emmalloc",
            "-o",
            "/ws/public/game_engine.js",
        ]
    );
}

#[test]
fn missing_sources_are_skipped() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/wasm/game_engine.cpp", "int main() {}");

    let cfg = ConfigFileBuilder::new().build();
    let cmd = assemble(&fs, &cfg, &paths_for(&cfg), BuildMode::Debug);

    assert_eq!(cmd.args[0], "/ws/wasm/game_engine.cpp");
    assert!(!cmd.args.iter().any(|a| a.contains("entity.cpp")));
    assert!(cmd.args.contains(&"-O0".to_string()));
    assert!(cmd.args.contains(&"-g".to_string()));
}

#[test]
fn profile_mode_uses_profile_flags() {
    let fs = MockFileSystem::new();
    let cfg = ConfigFileBuilder::new().build();
    let cmd = assemble(&fs, &cfg, &paths_for(&cfg), BuildMode::Profile);

    let opt = cmd.args.iter().position(|a| a == "-O2").expect("-O2 present");
    let prof = cmd
        .args
        .iter()
        .position(|a| a == "--profiling")
        .expect("--profiling present");
    assert!(opt < prof);
    assert_eq!(&cmd.args[cmd.args.len() - 2..], ["-o", "/ws/public/game_engine.js"]);
}

#[test]
fn artifacts_follow_output_name() {
    let cfg = ConfigFileBuilder::new().output_name("engine").build();
    let artifacts = ArtifactPaths::new(&cfg, &paths_for(&cfg));

    assert_eq!(artifacts.script, PathBuf::from("/ws/public/engine.js"));
    assert_eq!(artifacts.binary, PathBuf::from("/ws/public/engine.wasm"));
}

#[test]
fn display_joins_program_and_args() {
    let fs = MockFileSystem::new();
    let cfg = ConfigFileBuilder::new().compiler("em++").build();
    let cmd = assemble(&fs, &cfg, &paths_for(&cfg), BuildMode::Release);

    let shown = cmd.to_string();
    assert!(shown.starts_with("em++ -I/ws/wasm/include -O3"), "{shown}");
}
