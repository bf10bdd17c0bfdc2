//! Native directory-watch primitive
//!
//! The watch actor only sees this seam: a backend that binds one
//! directory to a handle and reports raw notifications for it through a
//! [`NotificationSink`]. [`NativeBackend`] is the `notify`-based default.

mod native;

pub use native::NativeBackend;

use crate::error::WatchError;
use crate::watcher::Command;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Platform event tag
///
/// Platforms do not say whether an entry was created, deleted or
/// modified. The tag is kept for diagnostics only; classification is
/// done by stat'ing the affected path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// Entry appeared, disappeared or was renamed
    Rename,
    /// Entry content or metadata changed
    Change,
}

/// One raw notification for a watched directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    pub kind: RawKind,
    /// Affected entry inside the directory; `None` means the watched
    /// directory itself
    pub name: Option<OsString>,
}

impl RawNotification {
    pub fn new(kind: RawKind, name: impl Into<OsString>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
        }
    }

    /// Notification about the watched directory itself
    pub fn for_self(kind: RawKind) -> Self {
        Self { kind, name: None }
    }
}

/// Delivery endpoint bound to one watched directory
///
/// Holds only a weak reference to the watch actor, so a backend keeping
/// sinks alive never keeps the actor alive.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    dir: PathBuf,
    tx: mpsc::WeakUnboundedSender<Command>,
}

impl NotificationSink {
    pub(crate) fn new(dir: PathBuf, tx: mpsc::WeakUnboundedSender<Command>) -> Self {
        Self { dir, tx }
    }

    /// Directory this sink reports for
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Report a raw notification
    pub fn deliver(&self, raw: RawNotification) {
        self.send(Command::Raw {
            dir: self.dir.clone(),
            raw,
        });
    }

    /// Report that the handle failed
    pub fn fail(&self, reason: impl Into<String>) {
        self.send(Command::HandleFailed {
            dir: self.dir.clone(),
            reason: reason.into(),
        });
    }

    fn send(&self, cmd: Command) {
        // Actor gone: nothing left to notify
        if let Some(tx) = self.tx.upgrade() {
            let _ = tx.send(cmd);
        }
    }
}

/// Live native watch on one directory
pub trait WatchHandle: Send {
    /// Release the native resource
    fn close(self: Box<Self>);
}

/// Native directory-watch primitive
pub trait WatchBackend: Send + 'static {
    /// Start watching `dir` (non-recursively), reporting through `sink`
    fn watch(&mut self, dir: &Path, sink: NotificationSink)
        -> Result<Box<dyn WatchHandle>, WatchError>;
}
