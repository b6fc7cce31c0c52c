use vdiff_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, StoredObject, Tree};

/// Content-addressed object store.
///
/// Implementations must satisfy these invariants:
/// - Objects are immutable once written; the same data always produces the
///   same ID.
/// - Concurrent reads are always safe.
/// - The store never interprets object contents.
pub trait ObjectStore: Send + Sync {
    /// Read an object by ID. Returns `Ok(None)` if it does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its ID. Writing an existing object is a
    /// no-op.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Delete an object by ID. Returns `true` if the object existed.
    ///
    /// Deleting a referenced object leaves dangling snapshots behind.
    fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read and decode a tree, failing if it is missing.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let stored = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        Tree::from_stored_object(&stored)
    }

    /// Read and decode a blob, failing if it is missing.
    fn read_blob(&self, id: &ObjectId) -> StoreResult<Blob> {
        let stored = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        Blob::from_stored_object(&stored)
    }
}
