//! Shared fixtures for integration tests
//!
//! `ScriptedBackend` stands in for the platform watcher: tests mutate the
//! real filesystem, then inject the raw notification the platform would
//! have produced.

#![allow(dead_code)]

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use treewatch::{
    EventName, NotificationSink, RawKind, RawNotification, WatchBackend, WatchError, WatchEvent,
    WatchHandle,
};

/// In-memory backend driven by the test
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    /// Live sinks, by directory
    live: Arc<DashMap<PathBuf, NotificationSink>>,
    /// Every sink ever handed out, including closed ones
    history: Arc<DashMap<PathBuf, NotificationSink>>,
    closed: Arc<Mutex<Vec<PathBuf>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a notification for `name` inside `dir`
    pub fn touch(&self, dir: &Path, kind: RawKind, name: &str) {
        self.sink(dir).deliver(RawNotification::new(kind, name));
    }

    /// Deliver a notification about `dir` itself
    pub fn touch_self(&self, dir: &Path, kind: RawKind) {
        self.sink(dir).deliver(RawNotification::for_self(kind));
    }

    /// Make the handle for `dir` report an internal fault
    pub fn fail(&self, dir: &Path) {
        self.sink(dir).fail("simulated fault");
    }

    pub fn is_live(&self, dir: &Path) -> bool {
        self.live.contains_key(dir)
    }

    pub fn closed(&self) -> Vec<PathBuf> {
        self.closed.lock().clone()
    }

    fn sink(&self, dir: &Path) -> NotificationSink {
        self.history
            .get(dir)
            .map(|s| s.value().clone())
            .unwrap_or_else(|| panic!("{} was never watched", dir.display()))
    }
}

impl WatchBackend for ScriptedBackend {
    fn watch(
        &mut self,
        dir: &Path,
        sink: NotificationSink,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        self.live.insert(dir.to_path_buf(), sink.clone());
        self.history.insert(dir.to_path_buf(), sink);
        Ok(Box::new(ScriptedHandle {
            dir: dir.to_path_buf(),
            backend: self.clone(),
        }))
    }
}

struct ScriptedHandle {
    dir: PathBuf,
    backend: ScriptedBackend,
}

impl WatchHandle for ScriptedHandle {
    fn close(self: Box<Self>) {
        self.backend.live.remove(&self.dir);
        self.backend.closed.lock().push(self.dir.clone());
    }
}

/// Temporary tree with canonical (symlink-free) paths
pub struct TestTree {
    _temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestTree {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

/// Collect events up to and including the next `after`
pub async fn next_cycle(rx: &mut mpsc::UnboundedReceiver<WatchEvent>) -> Vec<WatchEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for flush")
            .expect("event stream closed");
        let done = event.name() == EventName::After;
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Assert nothing arrives for `wait`
pub async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<WatchEvent>, wait: Duration) {
    if let Ok(Some(event)) = tokio::time::timeout(wait, rx.recv()).await {
        panic!("unexpected event {:?}", event);
    }
}

pub fn count(events: &[WatchEvent], name: EventName) -> usize {
    events.iter().filter(|e| e.name() == name).count()
}
