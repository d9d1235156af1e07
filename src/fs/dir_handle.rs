use std::{
    fmt,
    sync::{Mutex, MutexGuard},
};

use super::registry::FileRegistry;

/// Longest entry name, longer names are truncated
pub const NAME_MAX: usize = 255;

/// A directory entry: a fixed, NUL terminated name buffer
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    d_name: [u8; NAME_MAX + 1],
}

impl DirEntry {
    pub fn new() -> Self {
        Self {
            d_name: [0; NAME_MAX + 1],
        }
    }

    fn set_name(&mut self, name: &str) {
        let mut end = name.len().min(NAME_MAX);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        self.d_name = [0; NAME_MAX + 1];
        self.d_name[..end].copy_from_slice(&name.as_bytes()[..end]);
    }

    pub fn name(&self) -> &str {
        let len = self
            .d_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_MAX);
        std::str::from_utf8(&self.d_name[..len]).unwrap_or_default()
    }

    /// Raw buffer including the terminator
    pub fn as_bytes(&self) -> &[u8; NAME_MAX + 1] {
        &self.d_name
    }
}

impl Default for DirEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirEntry").field("d_name", &self.name()).finish()
    }
}

/// POSIX style directory stream
pub trait DirHandle {
    /// Next entry, or `None` once the end is reached
    fn readdir(&self) -> Option<DirEntry>;

    /// Current position, suitable for a later `seekdir`
    fn telldir(&self) -> usize;

    fn seekdir(&self, offset: usize);

    fn rewinddir(&self);

    /// Release the handle. Returns 0.
    fn closedir(self) -> i32
    where
        Self: Sized;
}

struct DirState {
    /// Index of the next object to return
    n: usize,
    cur_entry: DirEntry,
}

/// Directory handle over a [`FileRegistry`].
///
/// The position is kept as the n'th object of the registry rather than a
/// reference to an object, so destroying the object between two reads cannot
/// leave the handle dangling. The flip side is that registering or removing
/// objects while a handle is open can make `readdir` skip or repeat names.
pub struct BaseDirHandle<R: FileRegistry> {
    registry: R,
    state: Mutex<DirState>,
}

impl<R: FileRegistry> BaseDirHandle<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            state: Mutex::new(DirState {
                n: 0,
                cur_entry: DirEntry::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DirState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Iterate the remaining entries
    pub fn entries(&self) -> Entries<'_, R> {
        Entries { handle: self }
    }
}

impl<R: FileRegistry> DirHandle for BaseDirHandle<R> {
    fn readdir(&self) -> Option<DirEntry> {
        let mut state = self.lock();
        let name = self.registry.name_at(state.n)?;

        // Increment n, so the next readdir gets the next object
        state.n += 1;

        state.cur_entry.set_name(&name);
        Some(state.cur_entry)
    }

    fn telldir(&self) -> usize {
        self.lock().n
    }

    fn seekdir(&self, offset: usize) {
        self.lock().n = offset;
    }

    fn rewinddir(&self) {
        self.lock().n = 0;
    }

    fn closedir(self) -> i32 {
        // No lock can be taken here, the handle is consumed
        drop(self);
        0
    }
}

pub struct Entries<'a, R: FileRegistry> {
    handle: &'a BaseDirHandle<R>,
}

impl<R: FileRegistry> Iterator for Entries<'_, R> {
    type Item = DirEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.handle.readdir()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fs::{ObjectRegistry, PathType};

    fn registry(names: &[&str]) -> Arc<ObjectRegistry> {
        let registry = Arc::new(ObjectRegistry::new());
        for name in names {
            registry.register(name, PathType::File);
        }
        registry
    }

    fn read_name<R: FileRegistry>(dir: &BaseDirHandle<R>) -> Option<String> {
        dir.readdir().map(|entry| entry.name().to_string())
    }

    #[test]
    fn test_readdir_walks_registry() {
        let dir = BaseDirHandle::new(registry(&["A", "B", "C"]));

        assert_eq!(read_name(&dir).as_deref(), Some("A"));
        assert_eq!(read_name(&dir).as_deref(), Some("B"));
        assert_eq!(read_name(&dir).as_deref(), Some("C"));
        assert_eq!(read_name(&dir), None);

        // The end does not advance the position
        assert_eq!(dir.telldir(), 3);
        assert_eq!(read_name(&dir), None);
        assert_eq!(dir.telldir(), 3);
    }

    #[test]
    fn test_seekdir_and_rewinddir() {
        let dir = BaseDirHandle::new(registry(&["A", "B", "C"]));

        dir.seekdir(1);
        assert_eq!(read_name(&dir).as_deref(), Some("B"));

        read_name(&dir);
        read_name(&dir);
        dir.rewinddir();
        assert_eq!(read_name(&dir).as_deref(), Some("A"));

        // Save and restore progress
        let saved = dir.telldir();
        read_name(&dir);
        dir.seekdir(saved);
        assert_eq!(read_name(&dir).as_deref(), Some("B"));

        dir.seekdir(42);
        assert_eq!(read_name(&dir), None);
    }

    #[test]
    fn test_long_names_are_truncated() {
        let long = "x".repeat(NAME_MAX + 10);
        // Multi-byte character straddling the limit is dropped whole
        let straddling = format!("{}é", "y".repeat(NAME_MAX - 1));
        let dir = BaseDirHandle::new(registry(&[&long, &straddling]));

        let entry = dir.readdir().unwrap();
        assert_eq!(entry.name().len(), NAME_MAX);
        assert_eq!(entry.as_bytes()[NAME_MAX], 0);

        let entry = dir.readdir().unwrap();
        assert_eq!(entry.name(), "y".repeat(NAME_MAX - 1));
    }

    #[test]
    fn test_registry_changes_are_visible() {
        let registry = registry(&["A", "B", "C"]);
        let dir = BaseDirHandle::new(registry.clone());

        assert_eq!(read_name(&dir).as_deref(), Some("A"));
        let (a, _) = registry.lookup("A").unwrap();
        registry.unregister(a);

        // B moved into the slot already read, so it is skipped
        assert_eq!(read_name(&dir).as_deref(), Some("C"));
        assert_eq!(read_name(&dir), None);
    }

    #[test]
    fn test_entries_iterator_and_close() {
        let dir = BaseDirHandle::new(registry(&["sd", "flash"]));
        let names: Vec<String> = dir.entries().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["sd", "flash"]);
        assert_eq!(dir.closedir(), 0);
    }

    #[test]
    fn test_concurrent_readers_split_entries() {
        let names: Vec<String> = (0..100).map(|i| format!("obj{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = Arc::new(BaseDirHandle::new(registry(&refs)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let dir = dir.clone();
                std::thread::spawn(move || dir.entries().count())
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 100);
        assert_eq!(dir.telldir(), 100);
    }
}
