//! Recursive file system watching for Treewatch
//!
//! This crate provides:
//! - Per-directory native watches installed recursively over a tree
//! - Normalization of raw notifications into `change`, `unlink`,
//!   `unlinkDir` and wildcard `*` events
//! - A single global debounce window that batches bursts of activity
//! - Named-event subscription with `before`/`after` batch brackets
//!
//! ```no_run
//! use treewatch::{EventName, Watcher, WatcherConfig};
//!
//! # async fn run() -> treewatch::Result<()> {
//! let watcher = Watcher::new(WatcherConfig::default())?;
//! watcher.on(EventName::Change, |event| println!("{:?}", event.path()));
//! watcher.watch("/srv/project")?;
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod ignore;
pub mod normalize;
pub mod platform;
pub mod registry;
mod watcher;

// Re-exports
pub use config::WatcherConfig;
pub use error::WatchError;
pub use event::{Batch, EventKind, EventName, WatchEvent};
pub use crate::ignore::{IgnoreConfig, IgnoreRules};
pub use platform::{
    NativeBackend, NotificationSink, RawKind, RawNotification, WatchBackend, WatchHandle,
};
pub use watcher::{Watcher, WatcherStatus};

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;
