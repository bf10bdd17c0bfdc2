//! Ignore policy for the tree watcher
//!
//! A path is excluded from watching when any of these match:
//! 1. Its extension is in `exts` (written with or without the leading dot)
//! 2. Its file name or extension-stripped name is in `files`
//! 3. (directories) Its last segment or full path is in `dirs`
//! 4. Any gitignore-style line in `patterns`
//!
//! Rules are fixed once the watcher is built. Directory rules are only
//! consulted when a directory is first considered for watching.

use crate::error::WatchError;
use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, MAIN_SEPARATOR_STR};

/// Compiled ignore rules
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    dirs: HashSet<String>,
    files: HashSet<String>,
    exts: HashSet<String>,

    /// Extra gitignore-style patterns (optional)
    patterns: Option<Gitignore>,
}

impl IgnoreRules {
    /// Compile rules from configuration
    pub fn new(config: &IgnoreConfig) -> Result<Self, WatchError> {
        Ok(Self {
            dirs: config.dirs.iter().cloned().collect(),
            files: config.files.iter().cloned().collect(),
            exts: config.exts.iter().cloned().collect(),
            patterns: build_patterns(&config.patterns)?,
        })
    }

    /// Rules that ignore nothing
    pub fn empty() -> Self {
        Self {
            dirs: HashSet::new(),
            files: HashSet::new(),
            exts: HashSet::new(),
            patterns: None,
        }
    }

    /// Check a path against the extension and file-name rules
    pub fn is_ignored_file(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if self.exts.contains(ext) || self.exts.contains(&format!(".{ext}")) {
                return true;
            }
        }

        let base = path.file_name().and_then(|n| n.to_str());
        let stem = path.file_stem().and_then(|n| n.to_str());
        if base.is_some_and(|b| self.files.contains(b))
            || stem.is_some_and(|s| self.files.contains(s))
        {
            return true;
        }

        self.pattern_matches(path, false)
    }

    /// Check a directory against the directory rules
    pub fn is_ignored_dir(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str());
        if name.is_some_and(|n| self.dirs.contains(n)) {
            return true;
        }

        if self.dirs.contains(path.to_string_lossy().as_ref()) {
            return true;
        }

        self.pattern_matches(path, true)
    }

    /// Check a path whose type is not known yet
    ///
    /// Used for raw notifications, which arrive before the path is stat'ed.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.is_ignored_file(path) || self.is_ignored_dir(path)
    }

    fn pattern_matches(&self, path: &Path, is_dir: bool) -> bool {
        match self.patterns {
            Some(ref patterns) => patterns.matched(path, is_dir).is_ignore(),
            None => false,
        }
    }

    /// Number of active rule sources
    pub fn active_sources(&self) -> usize {
        [
            !self.dirs.is_empty(),
            !self.files.is_empty(),
            !self.exts.is_empty(),
            self.patterns.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::empty()
    }
}

fn build_patterns(lines: &[String]) -> Result<Option<Gitignore>, WatchError> {
    if lines.is_empty() {
        return Ok(None);
    }

    // Anchor at the filesystem root so absolute paths strip cleanly
    let mut builder = GitignoreBuilder::new(MAIN_SEPARATOR_STR);
    for line in lines {
        builder
            .add_line(None, line)
            .map_err(|e| WatchError::Pattern {
                pattern: line.clone(),
                reason: e.to_string(),
            })?;
    }

    let gitignore = builder.build().map_err(|e| WatchError::Pattern {
        pattern: lines.join(", "),
        reason: e.to_string(),
    })?;
    Ok(Some(gitignore))
}

/// Ignore configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Directory names or full directory paths
    #[serde(default)]
    pub dirs: Vec<String>,

    /// File names, with or without extension
    #[serde(default)]
    pub files: Vec<String>,

    /// Extensions, with or without the leading dot
    #[serde(default)]
    pub exts: Vec<String>,

    /// Additional gitignore-style patterns
    #[serde(default)]
    pub patterns: Vec<String>,
}
