//! Global debounce queue
//!
//! One timer for the whole tree: every post re-arms it, and the pending
//! map is flushed as a single batch only after a full quiet interval.
//! Each path keeps the position of its first post within the window;
//! later posts overwrite its kind in place, except that a plain unlink
//! never downgrades a pending directory removal.

use crate::event::{Batch, EventKind};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

/// Fixed part of the debounce interval
pub const BASE_INTERVAL: Duration = Duration::from_millis(100);

/// Ordered pending-event map plus its timer deadline
#[derive(Debug)]
pub struct DebounceQueue {
    /// Path -> classified kind. `None` marks a path touched by a wildcard
    /// post whose classification has not landed yet.
    pending: IndexMap<PathBuf, Option<EventKind>>,

    /// Armed timer, if any
    deadline: Option<Instant>,

    interval: Duration,
}

impl DebounceQueue {
    /// Create a queue with `BASE_INTERVAL + extra`
    pub fn new(extra: Duration) -> Self {
        Self {
            pending: IndexMap::new(),
            deadline: None,
            interval: BASE_INTERVAL + extra,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record `kind` for `path` and re-arm the timer
    ///
    /// A wildcard post only reserves the path's position; it never
    /// overwrites a classification already recorded in this window.
    /// An `Unlink` landing on a pending `UnlinkDir` is dropped: the second
    /// notification for a removed directory arrives after its teardown.
    pub fn post(&mut self, kind: EventKind, path: PathBuf) {
        match kind {
            EventKind::Any => {
                self.pending.entry(path).or_insert(None);
            }
            kind => {
                let slot = self.pending.entry(path).or_insert(None);
                if !(kind == EventKind::Unlink && *slot == Some(EventKind::UnlinkDir)) {
                    *slot = Some(kind);
                }
            }
        }
        self.deadline = Some(Instant::now() + self.interval);
    }

    /// Drop an unclassified reservation whose classification will never come
    pub fn release(&mut self, path: &Path) {
        if let Some(None) = self.pending.get(path) {
            self.pending.shift_remove(path);
        }
    }

    /// When the armed timer fires, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm the timer and take every classified entry, in first-touch order
    ///
    /// Unclassified reservations stay queued, keeping their relative order.
    /// Returns `None` when nothing classified was pending.
    pub fn flush(&mut self) -> Option<Batch> {
        self.deadline = None;

        let mut ready = Vec::new();
        self.pending.retain(|path, kind| match kind {
            Some(kind) => {
                ready.push((path.clone(), *kind));
                false
            }
            None => true,
        });

        if ready.is_empty() {
            None
        } else {
            Some(ready.into())
        }
    }

    /// Remove pending entries matching `pred`
    pub fn discard_where(&mut self, mut pred: impl FnMut(&Path) -> bool) {
        self.pending.retain(|path, _| !pred(path.as_path()));
    }

    /// Clear everything and disarm the timer
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deadline = None;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
