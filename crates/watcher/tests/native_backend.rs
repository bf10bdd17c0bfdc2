//! Smoke test against the real platform watcher

mod common;

use anyhow::Result;
use common::TestTree;
use std::fs;
use std::time::Duration;
use treewatch::{WatchEvent, Watcher, WatcherConfig};

async fn wait_for(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<WatchEvent>,
    wanted: &WatchEvent,
) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        if &event == wanted {
            return true;
        }
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_native_backend_reports_changes_in_new_subdirectory() -> Result<()> {
    let tree = TestTree::new();
    tree.mkdir("src");

    let watcher = Watcher::new(WatcherConfig::default())?;
    let mut rx = watcher.subscribe();
    watcher.watch(&tree.root)?;
    watcher.settle().await?;
    assert_eq!(watcher.watched().await?.len(), 2);

    let file = tree.write("src/lib.rs", "fn main() {}");
    assert!(wait_for(&mut rx, &WatchEvent::Change(file.clone())).await);

    let nested = tree.mkdir("src/nested");
    assert!(wait_for(&mut rx, &WatchEvent::Change(nested.clone())).await);
    watcher.settle().await?;
    assert!(watcher.watched().await?.contains(&nested));

    fs::remove_file(&file)?;
    assert!(wait_for(&mut rx, &WatchEvent::Unlink(file)).await);

    fs::remove_dir(&nested)?;
    assert!(wait_for(&mut rx, &WatchEvent::UnlinkDir(nested.clone())).await);
    watcher.settle().await?;
    assert!(!watcher.watched().await?.contains(&nested));

    watcher.shutdown().await?;
    Ok(())
}
