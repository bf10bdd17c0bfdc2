//! Raw notification -> semantic event
//!
//! Platforms only say "something was renamed" or "something changed".
//! The affected path is resolved against its watched directory and then
//! stat'ed: a missing path is a deletion, anything present is a change,
//! and a present directory additionally needs watches of its own.

use crate::event::EventKind;
use std::ffi::OsStr;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

/// Result of the follow-up existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOutcome {
    /// Stat failed, for any reason
    Missing,
    Directory,
    /// File, or anything else that is not a directory
    Other,
}

impl StatOutcome {
    pub fn from_metadata(result: io::Result<Metadata>) -> Self {
        match result {
            Ok(meta) if meta.is_dir() => StatOutcome::Directory,
            Ok(_) => StatOutcome::Other,
            Err(_) => StatOutcome::Missing,
        }
    }
}

/// What the actor must do for a stat'ed path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: EventKind,
    /// Run the recursive installer on the path
    pub install: bool,
    /// Tear down any watch registered at the path
    pub teardown: bool,
}

/// Resolve the absolute path a notification refers to
///
/// A missing name, or one that recomposes to the directory itself, means
/// the watched directory is the affected entry.
pub fn resolve(dir: &Path, name: Option<&OsStr>) -> PathBuf {
    match name {
        Some(name) => {
            let joined = dir.join(name);
            if joined.components().eq(dir.components()) {
                dir.to_path_buf()
            } else {
                joined
            }
        }
        None => dir.to_path_buf(),
    }
}

/// Classify a path from its stat outcome
///
/// `was_watched` tells whether the path currently has a registry entry,
/// which is the only way to know a vanished path was a directory.
pub fn classify(outcome: StatOutcome, was_watched: bool) -> Classification {
    match outcome {
        StatOutcome::Missing => Classification {
            kind: if was_watched {
                EventKind::UnlinkDir
            } else {
                EventKind::Unlink
            },
            install: false,
            teardown: true,
        },
        StatOutcome::Directory => Classification {
            kind: EventKind::Change,
            install: true,
            teardown: false,
        },
        StatOutcome::Other => Classification {
            kind: EventKind::Change,
            install: false,
            teardown: false,
        },
    }
}
