//! Watcher configuration
//!
//! ```toml
//! timeout_ms = 250
//!
//! [ignore]
//! dirs = ["node_modules", ".git"]
//! files = ["Thumbs.db"]
//! exts = ["swp", ".tmp"]
//! patterns = ["*.bak"]
//! ```

use crate::error::WatchError;
use crate::ignore::IgnoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default)]
    pub ignore: IgnoreConfig,

    /// Debounce milliseconds added to the fixed base interval
    #[serde(default)]
    pub timeout_ms: u64,
}

impl WatcherConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, WatchError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, WatchError> {
        let text = std::fs::read_to_string(path).map_err(|e| WatchError::Config {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_ignore(mut self, ignore: IgnoreConfig) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Extra debounce on top of the base interval
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
