//! Watch registry: directory path -> live native handle
//!
//! Presence of an entry means the directory is being watched. Insert and
//! remove are both idempotent, so a path never holds two handles.

use crate::platform::WatchHandle;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct WatchRegistry {
    handles: HashMap<PathBuf, Box<dyn WatchHandle>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.handles.contains_key(path)
    }

    /// Register a handle, returning false (and closing the newcomer) if
    /// the path was already watched
    pub fn insert(&mut self, path: PathBuf, handle: Box<dyn WatchHandle>) -> bool {
        if self.handles.contains_key(&path) {
            handle.close();
            return false;
        }
        self.handles.insert(path, handle);
        true
    }

    /// Close and forget the handle at `path`, if any
    pub fn remove(&mut self, path: &Path) -> bool {
        match self.handles.remove(path) {
            Some(handle) => {
                handle.close();
                true
            }
            None => false,
        }
    }

    /// Close every handle
    pub fn clear(&mut self) -> usize {
        let count = self.handles.len();
        for (_, handle) in self.handles.drain() {
            handle.close();
        }
        count
    }

    /// Watched paths, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.handles.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandle(Arc<AtomicUsize>);

    impl WatchHandle for CountingHandle {
        fn close(self: Box<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn handle(closed: &Arc<AtomicUsize>) -> Box<dyn WatchHandle> {
        Box::new(CountingHandle(Arc::clone(closed)))
    }

    #[test]
    fn test_insert_is_idempotent() {
        let closed = Arc::new(AtomicUsize::new(0));
        let mut registry = WatchRegistry::new();

        assert!(registry.insert(PathBuf::from("/a"), handle(&closed)));
        assert!(!registry.insert(PathBuf::from("/a"), handle(&closed)));

        assert_eq!(registry.len(), 1);
        // The duplicate was released immediately
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_closes_once() {
        let closed = Arc::new(AtomicUsize::new(0));
        let mut registry = WatchRegistry::new();
        registry.insert(PathBuf::from("/a"), handle(&closed));

        assert!(registry.remove(Path::new("/a")));
        assert!(!registry.remove(Path::new("/a")));
        assert!(!registry.contains(Path::new("/a")));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_closes_all() {
        let closed = Arc::new(AtomicUsize::new(0));
        let mut registry = WatchRegistry::new();
        registry.insert(PathBuf::from("/b"), handle(&closed));
        registry.insert(PathBuf::from("/a"), handle(&closed));

        assert_eq!(registry.paths(), vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
        assert_eq!(closed.load(Ordering::SeqCst), 2);
    }
}
