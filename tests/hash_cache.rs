// tests/hash_cache.rs

mod common;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proptest::prelude::*;

use buildmon::fs::FileSystem;
use buildmon::fs::mock::MockFileSystem;
use buildmon::watch::{ChangeCache, EMPTY_DIGEST, compute_file_digest};

fn cache_over(fs: &MockFileSystem) -> ChangeCache {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    ChangeCache::new(fs)
}

#[test]
fn digest_is_64_hex_chars() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/a.cpp", "int a;");

    let digest = compute_file_digest(&fs, Path::new("/ws/a.cpp"));
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn empty_file_has_a_real_digest() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/empty.h", "");

    let digest = compute_file_digest(&fs, Path::new("/ws/empty.h"));
    assert_ne!(digest, EMPTY_DIGEST);
    assert_eq!(digest.len(), 64);
}

#[test]
fn missing_file_yields_empty_digest() {
    let fs = MockFileSystem::new();
    assert_eq!(compute_file_digest(&fs, Path::new("/nope.cpp")), EMPTY_DIGEST);
}

#[test]
fn digest_spans_multiple_chunks() {
    let fs = MockFileSystem::new();
    let mut big = vec![b'x'; 20_000];
    fs.add_file("/ws/big.cpp", big.clone());
    let before = compute_file_digest(&fs, Path::new("/ws/big.cpp"));

    // Flip a byte past the first 8 KiB chunk.
    big[17_000] = b'y';
    fs.add_file("/ws/big.cpp", big);
    let after = compute_file_digest(&fs, Path::new("/ws/big.cpp"));

    assert_ne!(before, after);
}

#[test]
fn changed_twice_is_true_then_false() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/a.cpp", "v1");
    let cache = cache_over(&fs);

    assert!(cache.changed(Path::new("/ws/a.cpp")));
    assert!(!cache.changed(Path::new("/ws/a.cpp")));

    fs.add_file("/ws/a.cpp", "v2");
    assert!(cache.changed(Path::new("/ws/a.cpp")));
    assert!(!cache.changed(Path::new("/ws/a.cpp")));
}

#[test]
fn unseen_missing_path_counts_as_changed_once() {
    let fs = MockFileSystem::new();
    let cache = cache_over(&fs);

    assert!(cache.changed(Path::new("/ws/gone.cpp")));
    assert!(!cache.changed(Path::new("/ws/gone.cpp")));
    assert_eq!(cache.digest_of(Path::new("/ws/gone.cpp")).as_deref(), Some(EMPTY_DIGEST));
}

#[test]
fn deleting_a_file_is_a_change() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/a.cpp", "v1");
    let cache = cache_over(&fs);
    cache.changed(Path::new("/ws/a.cpp"));

    fs.remove_file("/ws/a.cpp");
    assert!(cache.changed(Path::new("/ws/a.cpp")));
}

#[test]
fn restored_entries_suppress_rebuilds() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/a.cpp", "stable");
    let digest = compute_file_digest(&fs, Path::new("/ws/a.cpp"));

    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let cache = ChangeCache::from_entries(shared, [("/ws/a.cpp".to_string(), digest)]);

    assert!(!cache.changed(Path::new("/ws/a.cpp")));
}

#[test]
fn snapshot_is_sorted_by_path() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/b.cpp", "b");
    fs.add_file("/ws/a.cpp", "a");
    let cache = cache_over(&fs);
    cache.changed(Path::new("/ws/b.cpp"));
    cache.changed(Path::new("/ws/a.cpp"));

    let keys: Vec<String> = cache.snapshot().into_keys().collect();
    assert_eq!(keys, vec!["/ws/a.cpp".to_string(), "/ws/b.cpp".to_string()]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn distinct_small_files_do_not_collide() {
    let fs = MockFileSystem::new();
    let paths: Vec<PathBuf> = (0..150)
        .map(|i| {
            let path = PathBuf::from(format!("/ws/src/file_{i}.cpp"));
            fs.add_file(&path, format!("int value_{i} = {i};\n"));
            path
        })
        .collect();

    let digests: HashSet<String> = paths
        .iter()
        .map(|p| compute_file_digest(&fs, p))
        .collect();
    assert_eq!(digests.len(), paths.len());
}

#[test]
fn concurrent_changed_calls_agree() {
    let fs = MockFileSystem::new();
    fs.add_file("/ws/a.cpp", "shared");
    let cache = Arc::new(cache_over(&fs));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.changed(Path::new("/ws/a.cpp")))
        })
        .collect();

    let trues = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|changed| *changed)
        .count();
    assert_eq!(trues, 1);
}

proptest! {
    #[test]
    fn identical_bytes_give_identical_digests(bytes in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let fs = MockFileSystem::new();
        fs.add_file("/ws/one.cpp", bytes.clone());
        fs.add_file("/ws/two.cpp", bytes);

        prop_assert_eq!(
            compute_file_digest(&fs, Path::new("/ws/one.cpp")),
            compute_file_digest(&fs, Path::new("/ws/two.cpp"))
        );
    }

    #[test]
    fn second_changed_call_is_always_false(bytes in proptest::collection::vec(any::<u8>(), 0..1024)) {
        let fs = MockFileSystem::new();
        fs.add_file("/ws/a.cpp", bytes);
        let cache = cache_over(&fs);

        prop_assert!(cache.changed(Path::new("/ws/a.cpp")));
        prop_assert!(!cache.changed(Path::new("/ws/a.cpp")));
    }
}
