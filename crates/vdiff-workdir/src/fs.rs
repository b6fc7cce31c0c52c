//! Working tree backed by a directory on disk.
//!
//! Every listing and content load goes through the blocking pool, so both
//! are always `Pending`. Symlinks are not followed; their identity is the
//! hash of the link target.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use vdiff_crypto::ContentHasher;
use vdiff_diff::{ContentIdentity, Deferred, DiffError, DiffResult, WorkingEntry, WorkingTreeProvider};
use vdiff_store::EntryMode;
use vdiff_types::{ObjectId, RelativePath};
use walkdir::WalkDir;

/// [`WorkingTreeProvider`] over a real directory.
#[derive(Clone, Debug)]
pub struct FsWorkingTree {
    root: PathBuf,
}

impl FsWorkingTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl WorkingTreeProvider for FsWorkingTree {
    fn list_children(&self, dir: &RelativePath) -> Deferred<Vec<WorkingEntry>> {
        let path = dir.to_fs_path(&self.root);
        Deferred::pending(async move {
            tokio::task::spawn_blocking(move || read_dir(&path))
                .await
                .map_err(|e| DiffError::Load(e.to_string()))?
        })
    }

    fn content_identity(&self, file: &RelativePath) -> Deferred<ObjectId> {
        let path = file.to_fs_path(&self.root);
        Deferred::pending(async move {
            tokio::task::spawn_blocking(move || hash_file(&path))
                .await
                .map_err(|e| DiffError::Load(e.to_string()))?
                .map_err(DiffError::from)
        })
    }
}

/// Mode of a directory entry, from its symlink metadata.
pub(crate) fn entry_mode(metadata: &std::fs::Metadata) -> EntryMode {
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        EntryMode::Directory
    } else if file_type.is_symlink() {
        EntryMode::Symlink
    } else {
        file_mode(metadata)
    }
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> EntryMode {
    use std::os::unix::fs::PermissionsExt;
    EntryMode::from_permissions(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> EntryMode {
    EntryMode::Regular
}

/// Bytes a symlink is stored as: its target path.
#[cfg(unix)]
pub(crate) fn link_target_bytes(target: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    target.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
pub(crate) fn link_target_bytes(target: &Path) -> Vec<u8> {
    target.to_string_lossy().into_owned().into_bytes()
}

fn read_dir(dir: &Path) -> DiffResult<Vec<WorkingEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let Some(name) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "skipping non-UTF-8 file name");
            continue;
        };
        let metadata = entry.metadata().map_err(io::Error::from)?;
        entries.push(WorkingEntry::new(name, entry_mode(&metadata), ContentIdentity::Unknown));
    }
    Ok(entries)
}

/// Blob identity of a file or symlink on disk.
pub(crate) fn hash_file(path: &Path) -> io::Result<ObjectId> {
    let metadata = std::fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(path)?;
        return Ok(ContentHasher::BLOB.hash(&link_target_bytes(&target)));
    }
    ContentHasher::BLOB.hash_reader(std::fs::File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdiff_store::Blob;

    #[tokio::test]
    async fn lists_sorted_entries_with_modes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/inner.txt"), "inner").unwrap();

        let tree = FsWorkingTree::new(dir.path());
        let listing = tree.list_children(&RelativePath::root());
        assert!(!listing.is_ready());
        let entries = listing.resolve().await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "b.txt", "sub"]);
        assert_eq!(entries[2].mode, EntryMode::Directory);
        assert!(entries.iter().all(|e| e.content == ContentIdentity::Unknown));

        let nested = tree.list_children(&RelativePath::parse("sub").unwrap()).resolve().await.unwrap();
        assert_eq!(nested.len(), 1);
    }

    #[tokio::test]
    async fn content_identity_matches_blob_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "hello\n").unwrap();
        let tree = FsWorkingTree::new(dir.path());
        let id = tree.content_identity(&RelativePath::parse("f.txt").unwrap()).resolve().await.unwrap();
        assert_eq!(id, Blob::id_of(b"hello\n"));
    }

    #[tokio::test]
    async fn missing_paths_fail() {
        let dir = tempfile::tempdir().unwrap();
        let tree = FsWorkingTree::new(dir.path());
        let missing = RelativePath::parse("nope").unwrap();
        assert!(matches!(tree.list_children(&missing).resolve().await, Err(DiffError::Io(_))));
        assert!(matches!(tree.content_identity(&missing).resolve().await, Err(DiffError::Io(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn executable_bit_and_symlinks() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("run.sh", dir.path().join("link")).unwrap();

        let tree = FsWorkingTree::new(dir.path());
        let entries = tree.list_children(&RelativePath::root()).resolve().await.unwrap();
        assert_eq!(entries[0].name, "link");
        assert_eq!(entries[0].mode, EntryMode::Symlink);
        assert_eq!(entries[1].mode, EntryMode::Executable);

        let link_id = tree.content_identity(&RelativePath::parse("link").unwrap()).resolve().await.unwrap();
        assert_eq!(link_id, Blob::id_of(b"run.sh"));
    }
}
