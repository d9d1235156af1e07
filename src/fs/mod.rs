//! Directory view over registered file-like objects

use std::sync::Arc;

pub mod dir_handle;
pub mod registry;

pub use dir_handle::{BaseDirHandle, DirEntry, DirHandle, Entries, NAME_MAX};
pub use registry::{FileRegistry, ObjectId, ObjectRegistry, PathType};

/// A named filesystem object. It is listed in the registry for as long as it
/// lives, and opening it as a directory enumerates every registered object.
pub struct FileSystemLike {
    name: String,
    id: ObjectId,
    registry: Arc<ObjectRegistry>,
}

impl FileSystemLike {
    pub fn new(registry: Arc<ObjectRegistry>, name: &str) -> Self {
        let id = registry.register(name, PathType::FileSystem);
        Self {
            name: name.to_string(),
            id,
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opendir(&self) -> BaseDirHandle<Arc<ObjectRegistry>> {
        BaseDirHandle::new(self.registry.clone())
    }
}

impl Drop for FileSystemLike {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}
