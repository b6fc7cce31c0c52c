//! Snapshot object model.
//!
//! A snapshot is a root [`Tree`] whose entries point at blobs (file and
//! symlink contents) and at further trees. Every object is addressed by the
//! domain-separated hash of its encoded bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use vdiff_crypto::ContentHasher;
use vdiff_types::ObjectId;

use crate::error::{StoreError, StoreResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Blob,
    Tree,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
        }
    }

    fn hasher(&self) -> ContentHasher {
        match self {
            Self::Blob => ContentHasher::BLOB,
            Self::Tree => ContentHasher::TREE,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded object bytes tagged with their kind. This is what a store holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Content address of this object.
    pub fn id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Borrow the payload, failing if the object is not of `kind`.
    fn payload(&self, kind: ObjectKind) -> StoreResult<&[u8]> {
        if self.kind == kind {
            return Ok(&self.data);
        }
        Err(StoreError::CorruptObject {
            id: self.id(),
            reason: format!("expected {kind}, found {}", self.kind),
        })
    }
}

/// Contents of a file, or the target path of a symlink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Identity `data` has once stored as a blob. Working trees use this to
    /// compare file contents against a snapshot without writing anything.
    pub fn id_of(data: &[u8]) -> ObjectId {
        ContentHasher::BLOB.hash(data)
    }

    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.payload(ObjectKind::Blob).map(|data| Self::new(data.to_vec()))
    }
}

/// Kind and permission of a tree entry.
///
/// Mode differences between two files with the same contents count as a
/// modification. Directory entries carry no permission bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    Regular,
    Executable,
    Symlink,
    Directory,
}

impl EntryMode {
    /// Git-compatible octal mode.
    pub fn octal(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
        }
    }

    /// Mode of a regular file with POSIX permission bits `perm`. Any
    /// execute bit makes it executable.
    pub fn from_permissions(perm: u32) -> Self {
        match perm & 0o111 {
            0 => Self::Regular,
            _ => Self::Executable,
        }
    }

    pub fn is_dir(&self) -> bool {
        *self == Self::Directory
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.octal())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub name: String,
    /// Blob for files and symlinks, tree for directories.
    pub object_id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: EntryMode, name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            object_id,
        }
    }
}

/// One directory of a snapshot.
///
/// Entries are kept in byte order of their names with no duplicates; a
/// stored tree that violates this is reported as corrupt when read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Sorts `entries` by name. If a name repeats, the last entry wins.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.reverse();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.dedup_by(|later, earlier| later.name == earlier.name);
        Self { entries }
    }

    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data = serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Tree, data))
    }

    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        let data = obj.payload(ObjectKind::Tree)?;
        let tree: Self = serde_json::from_slice(data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(pair) = tree.entries.windows(2).find(|pair| pair[0].name >= pair[1].name) {
            return Err(StoreError::CorruptObject {
                id: obj.id(),
                reason: format!("entry {:?} out of order", pair[1].name),
            });
        }
        Ok(tree)
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        let idx = self
            .entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()?;
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
