use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

/// What kind of object a registered name refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathType {
    File,
    FileSystem,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(u64);

/// Anything that can hand out object names by position.
///
/// Positions are not stable: removing an object shifts every later object
/// down by one.
pub trait FileRegistry: Send + Sync {
    /// Name of the object at `index`, `None` past the end
    fn name_at(&self, index: usize) -> Option<String>;
}

impl<T: FileRegistry + ?Sized> FileRegistry for Arc<T> {
    fn name_at(&self, index: usize) -> Option<String> {
        (**self).name_at(index)
    }
}

#[derive(Clone, Debug)]
struct RegisteredObject {
    id: ObjectId,
    name: String,
    kind: PathType,
}

/// Ordered list of named file-like objects, in registration order
#[derive(Default)]
pub struct ObjectRegistry {
    objects: Mutex<Vec<RegisteredObject>>,
    next_id: AtomicU64,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RegisteredObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, name: &str, kind: PathType) -> ObjectId {
        let id = ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(RegisteredObject {
            id,
            name: name.to_string(),
            kind,
        });
        id
    }

    /// Returns false if `id` was not registered
    pub fn unregister(&self, id: ObjectId) -> bool {
        let mut objects = self.lock();
        match objects.iter().position(|object| object.id == id) {
            Some(index) => {
                objects.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<(String, PathType)> {
        self.lock()
            .get(index)
            .map(|object| (object.name.clone(), object.kind))
    }

    /// First object registered under `name`
    pub fn lookup(&self, name: &str) -> Option<(ObjectId, PathType)> {
        self.lock()
            .iter()
            .find(|object| object.name == name)
            .map(|object| (object.id, object.kind))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl FileRegistry for ObjectRegistry {
    fn name_at(&self, index: usize) -> Option<String> {
        self.get(index).map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = ObjectRegistry::new();
        assert!(registry.is_empty());

        let sd = registry.register("sd", PathType::FileSystem);
        let log = registry.register("log", PathType::File);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0), Some(("sd".to_string(), PathType::FileSystem)));
        assert_eq!(registry.name_at(1), Some("log".to_string()));
        assert_eq!(registry.name_at(2), None);
        assert_eq!(registry.lookup("log"), Some((log, PathType::File)));
        assert_eq!(registry.lookup("missing"), None);
        assert_ne!(sd, log);
    }

    #[test]
    fn test_unregister_shifts_positions() {
        let registry = ObjectRegistry::new();
        let a = registry.register("a", PathType::File);
        registry.register("b", PathType::File);

        assert!(registry.unregister(a));
        assert!(!registry.unregister(a));
        assert_eq!(registry.name_at(0), Some("b".to_string()));
    }
}
