use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::trace;
use vdiff_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Object store held entirely in process memory.
///
/// Every read is counted, hit or miss, so callers can observe how much of a
/// snapshot an operation actually touched.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    reads: AtomicU64,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `read` calls served so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.objects.read().expect("lock poisoned").get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut objects = self.objects.write().expect("lock poisoned");
        if !objects.contains_key(&id) {
            trace!(id = %id.short_hex(), kind = %object.kind, size = object.size(), "object written");
            objects.insert(id, object.clone());
        }
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects.read().expect("lock poisoned").contains_key(id))
    }

    fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects.write().expect("lock poisoned").remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &self.len())
            .field("reads", &self.reads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Blob, EntryMode, ObjectKind, Tree, TreeEntry};

    #[test]
    fn blob_round_trip() {
        let store = InMemoryObjectStore::new();
        let obj = Blob::new(b"hello world".to_vec()).to_stored_object();
        let id = store.write(&obj).unwrap();

        assert_eq!(store.read(&id).unwrap(), Some(obj));
        assert_eq!(store.read_blob(&id).unwrap().data, b"hello world");
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn rewriting_is_a_no_op() {
        let store = InMemoryObjectStore::new();
        let obj = Blob::new(b"dup".to_vec()).to_stored_object();
        assert_eq!(store.write(&obj).unwrap(), store.write(&obj).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn read_tree_decodes_entries() {
        let store = InMemoryObjectStore::new();
        let tree = Tree::new(vec![TreeEntry::new(EntryMode::Regular, "a.txt", Blob::id_of(b"a"))]);
        let id = store.write(&tree.to_stored_object().unwrap()).unwrap();
        assert_eq!(store.read_tree(&id).unwrap(), tree);
    }

    #[test]
    fn missing_tree_is_not_found() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from_hash([9; 32]);
        assert!(matches!(store.read_tree(&id), Err(StoreError::NotFound(missing)) if missing == id));
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn blob_read_as_tree_is_corrupt() {
        let store = InMemoryObjectStore::new();
        let id = store
            .write(&StoredObject::new(ObjectKind::Blob, b"data".to_vec()))
            .unwrap();
        assert!(matches!(store.read_tree(&id), Err(StoreError::CorruptObject { .. })));
    }

    #[test]
    fn delete_leaves_nothing_behind() {
        let store = InMemoryObjectStore::new();
        let id = store.write(&Blob::new(b"x".to_vec()).to_stored_object()).unwrap();
        assert!(store.exists(&id).unwrap());
        assert!(store.delete(&id).unwrap());
        assert!(!store.exists(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert!(store.is_empty());
    }
}
