//! Semantic events delivered to subscribers

use crate::error::WatchError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Classified kind of a pending path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Something happened at the path (`*`)
    Any,
    /// Content changed or new content appeared (`change`)
    Change,
    /// A file was removed (`unlink`)
    Unlink,
    /// A watched directory was removed (`unlinkDir`)
    UnlinkDir,
}

impl EventKind {
    /// Bus name this kind is emitted under
    pub fn name(self) -> EventName {
        match self {
            EventKind::Any => EventName::Any,
            EventKind::Change => EventName::Change,
            EventKind::Unlink => EventName::Unlink,
            EventKind::UnlinkDir => EventName::UnlinkDir,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.name(), f)
    }
}

/// Names subscribers can listen on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Before,
    After,
    Any,
    Change,
    Unlink,
    UnlinkDir,
}

impl EventName {
    pub const ALL: [EventName; 6] = [
        EventName::Before,
        EventName::After,
        EventName::Any,
        EventName::Change,
        EventName::Unlink,
        EventName::UnlinkDir,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventName::Before => "before",
            EventName::After => "after",
            EventName::Any => "*",
            EventName::Change => "change",
            EventName::Unlink => "unlink",
            EventName::UnlinkDir => "unlinkDir",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| WatchError::UnknownEvent(s.to_string()))
    }
}

/// Ordered snapshot of one flush cycle
pub type Batch = Arc<[(PathBuf, EventKind)]>;

/// Event delivered through the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Start of a flush cycle, with its full snapshot
    Before(Batch),
    /// End of a flush cycle, with the same snapshot
    After(Batch),
    /// Unclassified activity at a path
    Any(PathBuf),
    Change(PathBuf),
    Unlink(PathBuf),
    UnlinkDir(PathBuf),
}

impl WatchEvent {
    /// Build the per-path event for a classified kind
    pub fn for_path(kind: EventKind, path: PathBuf) -> Self {
        match kind {
            EventKind::Any => WatchEvent::Any(path),
            EventKind::Change => WatchEvent::Change(path),
            EventKind::Unlink => WatchEvent::Unlink(path),
            EventKind::UnlinkDir => WatchEvent::UnlinkDir(path),
        }
    }

    pub fn name(&self) -> EventName {
        match self {
            WatchEvent::Before(_) => EventName::Before,
            WatchEvent::After(_) => EventName::After,
            WatchEvent::Any(_) => EventName::Any,
            WatchEvent::Change(_) => EventName::Change,
            WatchEvent::Unlink(_) => EventName::Unlink,
            WatchEvent::UnlinkDir(_) => EventName::UnlinkDir,
        }
    }

    /// Path payload, if this is a per-path event
    pub fn path(&self) -> Option<&Path> {
        match self {
            WatchEvent::Before(_) | WatchEvent::After(_) => None,
            WatchEvent::Any(p)
            | WatchEvent::Change(p)
            | WatchEvent::Unlink(p)
            | WatchEvent::UnlinkDir(p) => Some(p.as_path()),
        }
    }

    /// Snapshot payload, if this is a bracket event
    pub fn batch(&self) -> Option<&Batch> {
        match self {
            WatchEvent::Before(b) | WatchEvent::After(b) => Some(b),
            _ => None,
        }
    }
}
