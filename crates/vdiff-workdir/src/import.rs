//! Snapshot a directory on disk into an object store.

use std::io;
use std::path::Path;

use tracing::{debug, info, warn};
use vdiff_diff::{EntryKind, IgnoreOracle};
use vdiff_store::{ObjectStore, TreeBuilder};
use vdiff_types::{ObjectId, RelativePath};
use walkdir::WalkDir;

use crate::error::WorkdirResult;
use crate::fs::{entry_mode, link_target_bytes};

/// Write the files and symlinks under `dir` as a snapshot and return its
/// root tree ID.
///
/// Ignored paths are left out, and so are root-level entries named in
/// `metadata_dirs`. Empty directories cannot be represented and vanish.
pub fn import_directory(
    store: &dyn ObjectStore,
    dir: &Path,
    ignore: &dyn IgnoreOracle,
    metadata_dirs: &[String],
) -> WorkdirResult<ObjectId> {
    let mut builder = TreeBuilder::new();
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(io::Error::from)?;
        let file_type = entry.file_type();
        let Some(path) = relative_path(dir, entry.path()) else {
            warn!(path = %entry.path().display(), "skipping path that is not valid UTF-8");
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        };

        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let metadata_dir = entry.depth() == 1 && metadata_dirs.iter().any(|m| Some(m.as_str()) == path.file_name());
        if metadata_dir || ignore.is_ignored(&path, kind) {
            debug!(path = %path, "not imported");
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }
        if file_type.is_dir() {
            continue;
        }

        let metadata = entry.metadata().map_err(io::Error::from)?;
        let content = if file_type.is_symlink() {
            link_target_bytes(&std::fs::read_link(entry.path())?)
        } else {
            std::fs::read(entry.path())?
        };
        builder.set_file_with_mode(path.as_str(), content, entry_mode(&metadata));
    }

    let root = builder.write(store)?;
    info!(dir = %dir.display(), files = builder.len(), root = %root.short_hex(), "imported directory");
    Ok(root)
}

fn relative_path(base: &Path, path: &Path) -> Option<RelativePath> {
    let relative = path.strip_prefix(base).ok()?;
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?
        .join("/");
    RelativePath::parse(&joined).ok()
}
