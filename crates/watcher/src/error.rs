//! Error types for the tree watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by watcher operations.
///
/// Faults that happen while the tree is being watched (a listing that
/// fails mid-scan, a handle that dies, a stat that cannot find its target)
/// are absorbed by the watch actor and never show up here.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch actor has shut down")]
    Closed,

    #[error("Invalid watch path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Native watch failed for {path}: {reason}")]
    Backend { path: PathBuf, reason: String },

    #[error("Failed to initialize native watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Invalid ignore pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Unknown event name '{0}'")]
    UnknownEvent(String),
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

impl From<toml::de::Error> for WatchError {
    fn from(e: toml::de::Error) -> Self {
        WatchError::Config {
            reason: e.to_string(),
        }
    }
}
