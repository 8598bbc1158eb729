// tests/event_observer.rs

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use buildmon::build::Orchestrator;
use buildmon::types::{BuildMode, WatchStrategy};
use buildmon::fs::RealFileSystem;
use buildmon::watch::{ChangeObserver, EventObserver, compute_file_digest, select_observer};

use crate::common::builders::TestWorkspace;
use crate::common::fake_runner::ScriptedRunner;
use crate::common::{init_tracing, with_timeout};

async fn wait_for_history(orch: &Orchestrator, len: usize) {
    with_timeout(async {
        while orch.history().len() < len {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
}

#[tokio::test]
async fn burst_of_edits_becomes_one_build() {
    init_tracing();
    let ws = TestWorkspace::new();
    // Create the nested dir up front; a dir created mid-watch may race the
    // recursive watch registration.
    ws.write("wasm/src/entity.cpp", "// placeholder\n");
    let cfg = ws
        .config()
        .strategy(WatchStrategy::Events)
        .debounce_ms(300)
        .max_coalesce_ms(2000)
        .build();
    let orch = Arc::new(ws.orchestrator(cfg, Arc::new(ScriptedRunner::succeeding())));

    let mut observer = EventObserver::new(Arc::clone(&orch)).unwrap();
    assert_eq!(observer.strategy(), WatchStrategy::Events);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { observer.observe(BuildMode::Release, shutdown_rx).await });

    wait_for_history(&orch, 1).await;

    ws.write("wasm/src/entity.cpp", "struct Entity {};\n");
    tokio::time::sleep(Duration::from_millis(50)).await;
    ws.write("wasm/include/entity.h", "struct Entity;\n");
    tokio::time::sleep(Duration::from_millis(50)).await;
    ws.write("wasm/notes.txt", "ignored");

    wait_for_history(&orch, 2).await;
    // Give a stray second flush a chance to show up.
    tokio::time::sleep(Duration::from_millis(600)).await;

    let history = orch.history();
    assert_eq!(history.len(), 2);
    let batch = history.latest().unwrap();
    assert_eq!(batch.files_changed(), ["wasm/include/entity.h", "wasm/src/entity.cpp"]);

    shutdown_tx.send(()).unwrap();
    with_timeout(task).await.unwrap().unwrap();
}

#[tokio::test]
async fn rewrite_with_same_content_is_filtered_by_hash() {
    init_tracing();
    let ws = TestWorkspace::new();
    let cfg = ws
        .config()
        .strategy(WatchStrategy::Events)
        .debounce_ms(100)
        .build();
    let orch = Arc::new(ws.orchestrator(cfg, Arc::new(ScriptedRunner::succeeding())));

    let mut observer = select_observer(Arc::clone(&orch)).unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { observer.observe(BuildMode::Release, shutdown_rx).await });

    wait_for_history(&orch, 1).await;

    // Same bytes as the workspace fixture.
    ws.write("wasm/game_engine.cpp", "int main() { return 0; }\n");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(orch.history().len(), 1);

    shutdown_tx.send(()).unwrap();
    with_timeout(task).await.unwrap().unwrap();
}

#[tokio::test]
async fn cache_tracks_built_files_without_hash_filtering() {
    init_tracing();
    let ws = TestWorkspace::new();
    let cfg = ws
        .config()
        .strategy(WatchStrategy::Events)
        .use_hash(false)
        .debounce_ms(100)
        .build();
    let source = ws.paths(&cfg).source_dir.join("game_engine.cpp");
    let orch = Arc::new(ws.orchestrator(cfg, Arc::new(ScriptedRunner::succeeding())));

    let mut observer = select_observer(Arc::clone(&orch)).unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(async move { observer.observe(BuildMode::Release, shutdown_rx).await });

    wait_for_history(&orch, 1).await;
    let before = orch.cache().digest_of(&source).unwrap();

    ws.write("wasm/game_engine.cpp", "int main() { return 3; }\n");
    wait_for_history(&orch, 2).await;

    let after = orch.cache().digest_of(&source).unwrap();
    assert_ne!(before, after);
    assert_eq!(after, compute_file_digest(&RealFileSystem, &source));
    assert!(orch.history().len() >= 2);

    shutdown_tx.send(()).unwrap();
    with_timeout(task).await.unwrap().unwrap();
}

#[tokio::test]
async fn missing_source_dir_falls_back_to_polling_under_auto() {
    let ws = TestWorkspace::new();
    std::fs::remove_dir_all(ws.root().join("wasm")).unwrap();
    let cfg = ws.config().strategy(WatchStrategy::Auto).build();
    let orch = Arc::new(ws.orchestrator(cfg.clone(), Arc::new(ScriptedRunner::succeeding())));

    let observer = select_observer(Arc::clone(&orch)).unwrap();
    assert_eq!(observer.strategy(), WatchStrategy::Polling);

    // Forcing events has nothing to fall back to.
    let cfg = ws.config().strategy(WatchStrategy::Events).build();
    let orch = Arc::new(ws.orchestrator(cfg, Arc::new(ScriptedRunner::succeeding())));
    assert!(select_observer(orch).is_err());
}
