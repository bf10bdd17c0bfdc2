//! `notify`-based backend
//!
//! One shared `RecommendedWatcher` holds a non-recursive watch per
//! directory. Events are routed back to per-directory sinks by path.

use super::{NotificationSink, RawKind, RawNotification, WatchBackend, WatchHandle};
use crate::error::WatchError;
use dashmap::DashMap;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{trace, warn};

type Routes = Arc<DashMap<PathBuf, NotificationSink>>;

/// Default backend on top of the platform watcher picked by `notify`
pub struct NativeBackend {
    watcher: Arc<Mutex<RecommendedWatcher>>,
    routes: Routes,
}

impl NativeBackend {
    pub fn new() -> Result<Self, WatchError> {
        let routes: Routes = Arc::new(DashMap::new());
        let callback_routes = Arc::clone(&routes);

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            route(&callback_routes, res);
        })?;

        Ok(Self {
            watcher: Arc::new(Mutex::new(watcher)),
            routes,
        })
    }
}

impl WatchBackend for NativeBackend {
    fn watch(
        &mut self,
        dir: &Path,
        sink: NotificationSink,
    ) -> Result<Box<dyn WatchHandle>, WatchError> {
        // Route first so nothing delivered right after registration is lost
        self.routes.insert(dir.to_path_buf(), sink);

        if let Err(e) = self.watcher.lock().watch(dir, RecursiveMode::NonRecursive) {
            self.routes.remove(dir);
            return Err(WatchError::Backend {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            });
        }

        Ok(Box::new(NativeHandle {
            dir: dir.to_path_buf(),
            watcher: Arc::clone(&self.watcher),
            routes: Arc::clone(&self.routes),
        }))
    }
}

struct NativeHandle {
    dir: PathBuf,
    watcher: Arc<Mutex<RecommendedWatcher>>,
    routes: Routes,
}

impl WatchHandle for NativeHandle {
    fn close(self: Box<Self>) {
        self.routes.remove(&self.dir);

        // Fails when the directory is already gone; the OS dropped the watch
        if let Err(e) = self.watcher.lock().unwatch(&self.dir) {
            trace!("unwatch {}: {}", self.dir.display(), e);
        }
    }
}

/// Map a `notify` event kind onto the platform tag, dropping pure reads
fn raw_kind(kind: &EventKind) -> Option<RawKind> {
    match kind {
        EventKind::Access(_) => None,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            Some(RawKind::Rename)
        }
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => Some(RawKind::Change),
    }
}

fn route(routes: &Routes, res: notify::Result<Event>) {
    match res {
        Ok(event) => {
            let Some(kind) = raw_kind(&event.kind) else {
                return;
            };

            for path in &event.paths {
                // Child of a watched directory
                if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
                    if let Some(sink) = routes.get(parent) {
                        sink.deliver(RawNotification::new(kind, name));
                        continue;
                    }
                }

                // The watched directory itself
                if let Some(sink) = routes.get(path.as_path()) {
                    sink.deliver(RawNotification::for_self(kind));
                } else {
                    trace!("unrouted {:?} {}", event.kind, path.display());
                }
            }
        }
        Err(e) => {
            let mut routed = false;
            for path in &e.paths {
                if let Some(sink) = routes.get(path.as_path()) {
                    sink.fail(e.to_string());
                    routed = true;
                }
            }
            if !routed {
                warn!("Native watcher error: {}", e);
            }
        }
    }
}
