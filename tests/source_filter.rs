// tests/source_filter.rs

use std::path::{Path, PathBuf};

use buildmon::fs::mock::MockFileSystem;
use buildmon::watch::{SourceFilter, collect_source_files};

fn default_filter() -> SourceFilter {
    let exts = ["cpp", "h", "hpp"].map(String::from);
    SourceFilter::new(&exts, &[]).unwrap()
}

#[test]
fn recognised_extensions_match_at_any_depth() {
    let filter = default_filter();
    assert!(filter.matches("game_engine.cpp"));
    assert!(filter.matches("src/entity.cpp"));
    assert!(filter.matches("include/deep/nested/vec3.hpp"));
    assert!(filter.matches("include/types.h"));
}

#[test]
fn other_files_are_ignored() {
    let filter = default_filter();
    assert!(!filter.matches("README.md"));
    assert!(!filter.matches("build/game_engine.o"));
    assert!(!filter.matches("src/entity.cpp.swp"));
    assert!(!filter.matches("src/entity.c"));
}

#[test]
fn extension_match_is_case_insensitive() {
    let filter = default_filter();
    assert!(filter.matches("Legacy/OLD.CPP"));
    assert!(filter.matches("include/Types.H"));
}

#[test]
fn exclude_globs_win() {
    let exts = ["cpp", "h"].map(String::from);
    let exclude = ["third_party/**".to_string()];
    let filter = SourceFilter::new(&exts, &exclude).unwrap();

    assert!(filter.matches("src/entity.cpp"));
    assert!(!filter.matches("third_party/imgui/imgui.cpp"));
}

#[test]
fn dotted_extensions_are_normalised() {
    let exts = [".CPP".to_string()];
    let filter = SourceFilter::new(&exts, &[]).unwrap();
    assert_eq!(filter.extensions(), ["cpp"]);
    assert!(filter.matches("a.cpp"));
}

#[test]
fn matches_path_relativises_against_root() {
    let filter = default_filter();
    assert!(filter.matches_path(Path::new("/ws/wasm"), Path::new("/ws/wasm/src/a.cpp")));
    assert!(!filter.matches_path(Path::new("/ws/wasm"), Path::new("/elsewhere/a.txt")));
}

#[test]
fn collect_walks_the_tree_sorted() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/wasm/src/entity.cpp", "");
    fs.add_file("/ws/wasm/game_engine.cpp", "");
    fs.add_file("/ws/wasm/include/entity.h", "");
    fs.add_file("/ws/wasm/notes.txt", "");

    let files = collect_source_files(&fs, Path::new("/ws/wasm"), &default_filter()).unwrap();
    assert_eq!(
        files,
        vec![
            PathBuf::from("/ws/wasm/game_engine.cpp"),
            PathBuf::from("/ws/wasm/include/entity.h"),
            PathBuf::from("/ws/wasm/src/entity.cpp"),
        ]
    );
}

#[test]
fn missing_root_yields_no_files() {
    let fs = MockFileSystem::new();
    let files = collect_source_files(&fs, Path::new("/ws/wasm"), &default_filter()).unwrap();
    assert!(files.is_empty());
}
