//! Capabilities the diff engine consumes.

use vdiff_types::{ObjectId, RelativePath};

use crate::deferred::Deferred;
use crate::entry::{EntryKind, ReferenceEntry, WorkingEntry};

/// Lazy access to the live working tree.
///
/// Implementations own their own caching and locking. Entry names must stay
/// stable for the duration of one diff.
pub trait WorkingTreeProvider: Send + Sync {
    /// Children of the directory at `dir`, sorted by name.
    fn list_children(&self, dir: &RelativePath) -> Deferred<Vec<WorkingEntry>>;

    /// Blob identity of the file at `file`, hashing or materializing it if
    /// needed.
    fn content_identity(&self, file: &RelativePath) -> Deferred<ObjectId>;
}

/// Lazy access to an immutable reference snapshot.
pub trait ReferenceTreeProvider: Send + Sync {
    /// Children of the tree object `tree`, sorted by name.
    fn list_children(&self, tree: &ObjectId) -> Deferred<Vec<ReferenceEntry>>;
}

/// Decides whether an entry present only in the working tree is ignored
/// rather than untracked. Must be free of side effects.
pub trait IgnoreOracle: Send + Sync {
    fn is_ignored(&self, path: &RelativePath, kind: EntryKind) -> bool;
}

/// Oracle that ignores nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoIgnore;

impl IgnoreOracle for NoIgnore {
    fn is_ignored(&self, _path: &RelativePath, _kind: EntryKind) -> bool {
        false
    }
}
