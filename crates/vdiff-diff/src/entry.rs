//! Entry model shared by both sides of a diff.

use serde::{Deserialize, Serialize};
use vdiff_store::{EntryMode, TreeEntry};
use vdiff_types::ObjectId;

/// Whether an entry is compared as a file or walked as a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

impl From<EntryMode> for EntryKind {
    fn from(mode: EntryMode) -> Self {
        if mode.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }
}

/// Content identity of a working-tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentIdentity {
    /// Identity is known without loading: the blob ID of an unmodified file,
    /// or the tree ID of a directory nobody has modified.
    Known(ObjectId),
    /// Must be loaded (files) or walked (directories).
    Unknown,
}

impl ContentIdentity {
    pub fn known(&self) -> Option<ObjectId> {
        match self {
            Self::Known(id) => Some(*id),
            Self::Unknown => None,
        }
    }
}

/// A child of a working-tree directory, as reported by a
/// [`WorkingTreeProvider`](crate::WorkingTreeProvider).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkingEntry {
    pub name: String,
    pub mode: EntryMode,
    pub content: ContentIdentity,
}

impl WorkingEntry {
    pub fn new(name: impl Into<String>, mode: EntryMode, content: ContentIdentity) -> Self {
        Self {
            name: name.into(),
            mode,
            content,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.mode.into()
    }
}

/// A child of a reference tree. Its identity is always known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub name: String,
    pub mode: EntryMode,
    pub object_id: ObjectId,
}

impl ReferenceEntry {
    pub fn new(name: impl Into<String>, mode: EntryMode, object_id: ObjectId) -> Self {
        Self {
            name: name.into(),
            mode,
            object_id,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.mode.into()
    }
}

impl From<&TreeEntry> for ReferenceEntry {
    fn from(entry: &TreeEntry) -> Self {
        Self::new(entry.name.clone(), entry.mode, entry.object_id)
    }
}

/// Access to the name both entry types are merge-joined on.
pub(crate) trait NamedEntry {
    fn name(&self) -> &str;
}

impl NamedEntry for WorkingEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

impl NamedEntry for ReferenceEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_mode() {
        let dir = WorkingEntry::new("d", EntryMode::Directory, ContentIdentity::Unknown);
        let link = WorkingEntry::new("l", EntryMode::Symlink, ContentIdentity::Unknown);
        assert_eq!(dir.kind(), EntryKind::Directory);
        assert_eq!(link.kind(), EntryKind::File);
        assert_eq!(EntryKind::from(EntryMode::Executable), EntryKind::File);
    }

    #[test]
    fn reference_entry_from_tree_entry() {
        let id = ObjectId::from_hash([7; 32]);
        let entry = ReferenceEntry::from(&TreeEntry::new(EntryMode::Executable, "run.sh", id));
        assert_eq!(entry.name, "run.sh");
        assert_eq!(entry.mode, EntryMode::Executable);
        assert_eq!(entry.object_id, id);
    }

    #[test]
    fn known_identity() {
        let id = ObjectId::from_hash([1; 32]);
        assert_eq!(ContentIdentity::Known(id).known(), Some(id));
        assert_eq!(ContentIdentity::Unknown.known(), None);
    }
}
