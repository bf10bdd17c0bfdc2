//! Watch actor and its public handle
//!
//! A single tokio task owns the registry, the pending-event queue and the
//! debounce deadline. Listings and stats run as detached tasks and report
//! back as commands, so nothing here ever blocks on the filesystem and
//! no state is shared between tasks.

use crate::bus::EventBus;
use crate::config::WatcherConfig;
use crate::debounce::DebounceQueue;
use crate::error::WatchError;
use crate::event::{EventKind, EventName, WatchEvent};
use crate::ignore::IgnoreRules;
use crate::normalize::{classify, resolve, StatOutcome};
use crate::platform::{NativeBackend, NotificationSink, RawNotification, WatchBackend};
use crate::registry::WatchRegistry;
use crate::Result;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// Messages handled by the watch actor
#[derive(Debug)]
pub(crate) enum Command {
    Watch(PathBuf),
    Stop(Option<PathBuf>),
    Raw {
        dir: PathBuf,
        raw: RawNotification,
    },
    HandleFailed {
        dir: PathBuf,
        reason: String,
    },
    Listed {
        dir: PathBuf,
        epoch: u64,
        result: io::Result<Vec<PathBuf>>,
    },
    Stat {
        origin: PathBuf,
        path: PathBuf,
        epoch: u64,
        /// Registry membership when the notification arrived
        was_watched: bool,
        outcome: StatOutcome,
    },
    Status(oneshot::Sender<WatcherStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Snapshot of the actor's state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherStatus {
    /// Watched directories, sorted
    pub watched: Vec<PathBuf>,
    /// Directory listings not yet completed
    pub scans_in_flight: usize,
    /// Existence checks not yet completed
    pub stats_in_flight: usize,
    /// Paths waiting in the debounce queue
    pub pending: usize,
}

impl WatcherStatus {
    /// No listing or stat outstanding
    pub fn is_settled(&self) -> bool {
        self.scans_in_flight == 0 && self.stats_in_flight == 0
    }
}

/// Recursive directory-tree watcher
///
/// Cheap to clone; every clone talks to the same watch actor. The actor
/// exits once every clone is dropped or [`Watcher::shutdown`] is called.
#[derive(Clone)]
pub struct Watcher {
    tx: mpsc::UnboundedSender<Command>,
    bus: Arc<EventBus>,
    /// True while no listing or stat is in flight
    settled: watch::Receiver<bool>,
}

impl Watcher {
    /// Create a watcher on the native backend
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: WatcherConfig) -> Result<Self> {
        Self::with_backend(config, NativeBackend::new()?)
    }

    /// Create a watcher on a caller-supplied backend
    pub fn with_backend<B: WatchBackend>(config: WatcherConfig, backend: B) -> Result<Self> {
        let rules = IgnoreRules::new(&config.ignore)?;
        let bus = Arc::new(EventBus::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let (settled_tx, settled) = watch::channel(true);

        let actor = WatchActor {
            backend,
            rules,
            registry: WatchRegistry::new(),
            queue: DebounceQueue::new(config.timeout()),
            bus: Arc::clone(&bus),
            tx: tx.downgrade(),
            stopped: HashSet::new(),
            epoch: 0,
            scans_in_flight: 0,
            stats_in_flight: 0,
            settled: settled_tx,
        };
        debug!(
            "Starting watch actor (debounce {:?}, {} ignore sources)",
            actor.queue.interval(),
            actor.rules.active_sources()
        );
        tokio::spawn(actor.run(rx));

        Ok(Self { tx, bus, settled })
    }

    /// Begin, or extend, watching the tree rooted at `path`
    ///
    /// Returns immediately; installation completes in the background.
    pub fn watch(&self, path: impl AsRef<Path>) -> Result<&Self> {
        let path = absolute(path.as_ref())?;
        self.send(Command::Watch(path))?;
        Ok(self)
    }

    /// Watch the tree rooted at the current working directory
    pub fn watch_current_dir(&self) -> Result<&Self> {
        let cwd = std::env::current_dir().map_err(|e| WatchError::InvalidPath {
            path: PathBuf::from("."),
            reason: e.to_string(),
        })?;
        self.watch(cwd)
    }

    /// Stop watching one directory
    ///
    /// Its subdirectories stay watched. Pending events for the directory
    /// and its immediate entries are dropped.
    pub fn unwatch(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = absolute(path.as_ref())?;
        self.send(Command::Stop(Some(path)))
    }

    /// Stop watching everything
    ///
    /// Pending events are discarded and no flush fires afterwards.
    /// Subscribers stay registered, so `watch` can re-arm the watcher.
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop(None))
    }

    /// Register a handler for `name`
    pub fn on<F>(&self, name: EventName, handler: F) -> &Self
    where
        F: Fn(&WatchEvent) + Send + Sync + 'static,
    {
        self.bus.on(name, handler);
        self
    }

    /// Receive every event on a channel
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        self.bus.subscribe()
    }

    pub async fn status(&self) -> Result<WatcherStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status(reply))?;
        rx.await.map_err(|_| WatchError::Closed)
    }

    /// Currently watched directories, sorted
    pub async fn watched(&self) -> Result<Vec<PathBuf>> {
        Ok(self.status().await?.watched)
    }

    /// Wait until no listing or stat is in flight
    pub async fn settle(&self) -> Result<()> {
        // Round-trip first so commands sent before this call are applied
        if self.status().await?.is_settled() {
            return Ok(());
        }
        let mut settled = self.settled.clone();
        settled
            .wait_for(|settled| *settled)
            .await
            .map_err(|_| WatchError::Closed)?;
        Ok(())
    }

    /// Stop everything and end the watch actor
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown(reply))?;
        rx.await.map_err(|_| WatchError::Closed)
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.tx.send(cmd).map_err(|_| WatchError::Closed)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| WatchError::InvalidPath {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

struct WatchActor<B> {
    backend: B,
    rules: IgnoreRules,
    registry: WatchRegistry,
    queue: DebounceQueue,
    bus: Arc<EventBus>,

    /// Weak so that sinks and detached tasks never keep the actor alive
    tx: mpsc::WeakUnboundedSender<Command>,

    /// Directories explicitly unwatched; their late completions are dropped
    stopped: HashSet<PathBuf>,

    /// Bumped by a full stop; completions from older epochs are dropped
    epoch: u64,

    scans_in_flight: usize,
    stats_in_flight: usize,
    settled: watch::Sender<bool>,
}

impl<B: WatchBackend> WatchActor<B> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            let deadline = self.queue.deadline();

            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(cmd) => {
                        if !self.handle(cmd) {
                            break;
                        }
                        self.publish_settled();
                    }
                    None => break,
                },
                _ = wait_deadline(deadline) => self.flush(),
            }
        }

        self.registry.clear();
        debug!("Watch actor stopped");
    }

    fn publish_settled(&self) {
        let now = self.scans_in_flight == 0 && self.stats_in_flight == 0;
        self.settled.send_if_modified(|settled| {
            let changed = *settled != now;
            *settled = now;
            changed
        });
    }

    /// Apply one command; returns false once the actor should exit
    fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Watch(path) => {
                self.stopped.remove(&path);
                self.install(path);
            }
            Command::Stop(Some(path)) => self.stop_one(path),
            Command::Stop(None) => self.stop_all(),
            Command::Raw { dir, raw } => self.on_raw(dir, raw),
            Command::HandleFailed { dir, reason } => {
                // Absorbed: subscribers never see handle faults
                warn!("Watch on {} failed: {}", dir.display(), reason);
                self.registry.remove(&dir);
            }
            Command::Listed { dir, epoch, result } => {
                self.scans_in_flight -= 1;
                self.on_listed(dir, epoch, result);
            }
            Command::Stat {
                origin,
                path,
                epoch,
                was_watched,
                outcome,
            } => {
                self.stats_in_flight -= 1;
                self.on_stat(origin, path, epoch, was_watched, outcome);
            }
            Command::Status(reply) => {
                let _ = reply.send(WatcherStatus {
                    watched: self.registry.paths(),
                    scans_in_flight: self.scans_in_flight,
                    stats_in_flight: self.stats_in_flight,
                    pending: self.queue.len(),
                });
            }
            Command::Shutdown(reply) => {
                self.stop_all();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    /// Recursive installer: list `dir`, recurse into subdirectories, then
    /// watch `dir` itself. Children are never awaited.
    fn install(&mut self, dir: PathBuf) {
        if self.rules.is_ignored_dir(&dir) {
            trace!("Ignoring directory {}", dir.display());
            return;
        }
        if self.stopped.contains(&dir) {
            return;
        }

        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let epoch = self.epoch;
        self.scans_in_flight += 1;

        tokio::spawn(async move {
            let result = list_subdirs(&dir).await;
            let _ = tx.send(Command::Listed { dir, epoch, result });
        });
    }

    fn on_listed(&mut self, dir: PathBuf, epoch: u64, result: io::Result<Vec<PathBuf>>) {
        if epoch != self.epoch || self.stopped.contains(&dir) {
            return;
        }

        match result {
            Ok(subdirs) => {
                for sub in subdirs {
                    self.install(sub);
                }
                self.attach(dir);
            }
            Err(e) => {
                // Directory vanished mid-scan: abandon this branch
                debug!("Listing {} failed: {}", dir.display(), e);
            }
        }
    }

    fn attach(&mut self, dir: PathBuf) {
        if self.registry.contains(&dir) {
            return;
        }

        let sink = NotificationSink::new(dir.clone(), self.tx.clone());
        match self.backend.watch(&dir, sink) {
            Ok(handle) => {
                debug!("Watching {}", dir.display());
                self.registry.insert(dir, handle);
            }
            Err(e) => warn!("{}", e),
        }
    }

    fn on_raw(&mut self, dir: PathBuf, raw: RawNotification) {
        // Handle already closed; the notification was in flight
        if !self.registry.contains(&dir) {
            trace!("Dropping notification for unwatched {}", dir.display());
            return;
        }

        let path = resolve(&dir, raw.name.as_deref());
        if self.rules.is_ignored(&path) {
            return;
        }
        trace!("{:?} {}", raw.kind, path.display());

        self.bus.emit(WatchEvent::Any(path.clone()));
        self.queue.post(EventKind::Any, path.clone());

        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let epoch = self.epoch;
        // Taken now: a sibling notification's stat may tear the watch down first
        let was_watched = self.registry.contains(&path);
        self.stats_in_flight += 1;

        tokio::spawn(async move {
            let outcome = StatOutcome::from_metadata(tokio::fs::metadata(&path).await);
            let _ = tx.send(Command::Stat {
                origin: dir,
                path,
                epoch,
                was_watched,
                outcome,
            });
        });
    }

    fn on_stat(
        &mut self,
        origin: PathBuf,
        path: PathBuf,
        epoch: u64,
        was_watched: bool,
        outcome: StatOutcome,
    ) {
        if epoch != self.epoch || self.stopped.contains(&origin) {
            self.queue.release(&path);
            return;
        }

        let class = classify(outcome, was_watched || self.registry.contains(&path));
        debug!("{} {}", class.kind, path.display());
        self.queue.post(class.kind, path.clone());

        if class.teardown && self.registry.remove(&path) {
            debug!("Unwatched vanished {}", path.display());
        }
        if class.install {
            self.install(path);
        }
    }

    fn stop_one(&mut self, dir: PathBuf) {
        if self.registry.remove(&dir) {
            debug!("Unwatched {}", dir.display());
        }
        self.queue
            .discard_where(|p| p == dir.as_path() || p.parent() == Some(dir.as_path()));
        self.stopped.insert(dir);
    }

    fn stop_all(&mut self) {
        let closed = self.registry.clear();
        self.queue.clear();
        self.stopped.clear();
        self.epoch += 1;
        info!("Stopped watching {} directories", closed);
    }

    fn flush(&mut self) {
        let Some(batch) = self.queue.flush() else {
            return;
        };
        debug!("Flushing {} events", batch.len());

        self.bus.emit(WatchEvent::Before(Arc::clone(&batch)));
        for (path, kind) in batch.iter() {
            self.bus.emit(WatchEvent::for_path(*kind, path.clone()));
        }
        self.bus.emit(WatchEvent::After(batch));
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Immediate subdirectories of `dir`
async fn list_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut subdirs = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            subdirs.push(entry.path());
        }
    }

    Ok(subdirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_subdirs_skips_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::create_dir(temp_dir.path().join("b")).unwrap();
        fs::write(temp_dir.path().join("file.txt"), b"x").unwrap();

        let mut subdirs = list_subdirs(temp_dir.path()).await.unwrap();
        subdirs.sort();

        assert_eq!(
            subdirs,
            vec![temp_dir.path().join("a"), temp_dir.path().join("b")]
        );
    }

    #[tokio::test]
    async fn test_list_missing_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_subdirs(&temp_dir.path().join("gone")).await.is_err());
    }

    #[tokio::test]
    async fn test_settle_waits_for_deep_tree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("a/b/c/d/e")).unwrap();

        let watcher = Watcher::new(WatcherConfig::default()).unwrap();
        watcher.settle().await.unwrap();

        watcher.watch(&root).unwrap();
        watcher.settle().await.unwrap();

        let status = watcher.status().await.unwrap();
        assert!(status.is_settled());
        assert_eq!(status.watched.len(), 6);
        watcher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_commands_fail_after_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let watcher = Watcher::new(WatcherConfig::default()).unwrap();
        watcher.watch(temp_dir.path()).unwrap();
        watcher.settle().await.unwrap();

        watcher.shutdown().await.unwrap();

        assert!(matches!(watcher.status().await, Err(WatchError::Closed)));
    }
}
