//! Snapshot assembly.
//!
//! [`TreeBuilder`] collects file paths with their contents and modes, then
//! writes the blobs and the nested tree objects bottom-up into a store. Empty
//! directories cannot be expressed, matching the tree object model.

use std::collections::BTreeMap;

use tracing::debug;
use vdiff_types::{ObjectId, RelativePath};

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, EntryMode, Tree, TreeEntry};
use crate::traits::ObjectStore;

#[derive(Clone, Debug, PartialEq, Eq)]
struct FileSpec {
    content: Vec<u8>,
    mode: EntryMode,
}

/// Builder for snapshot trees, keyed by `/`-separated file path.
#[derive(Clone, Debug, Default)]
pub struct TreeBuilder {
    files: BTreeMap<String, FileSpec>,
}

enum Node {
    File(FileSpec),
    Dir(BTreeMap<String, Node>),
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(path, content)` pairs, all regular files.
    pub fn from_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<String>,
        C: AsRef<[u8]>,
    {
        let mut builder = Self::new();
        for (path, content) in files {
            builder.set_file(path, content);
        }
        builder
    }

    /// Add or overwrite a regular file.
    pub fn set_file(&mut self, path: impl Into<String>, content: impl AsRef<[u8]>) -> &mut Self {
        self.set_file_with_mode(path, content, EntryMode::Regular)
    }

    pub fn set_file_with_mode(
        &mut self,
        path: impl Into<String>,
        content: impl AsRef<[u8]>,
        mode: EntryMode,
    ) -> &mut Self {
        self.files.insert(
            path.into(),
            FileSpec {
                content: content.as_ref().to_vec(),
                mode,
            },
        );
        self
    }

    /// Replace a path with a file, dropping any files previously nested
    /// under it (a directory becoming a file).
    pub fn replace_file(
        &mut self,
        path: impl Into<String>,
        content: impl AsRef<[u8]>,
        mode: EntryMode,
    ) -> &mut Self {
        let path = path.into();
        let prefix = format!("{path}/");
        self.files.retain(|p, _| !p.starts_with(&prefix));
        self.set_file_with_mode(path, content, mode)
    }

    /// Returns `true` if the file existed.
    pub fn remove_file(&mut self, path: &str) -> bool {
        self.files.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write all blobs and trees and return the root tree ID.
    pub fn write(&self, store: &dyn ObjectStore) -> StoreResult<ObjectId> {
        let mut root = BTreeMap::new();
        for (raw, spec) in &self.files {
            let path = RelativePath::parse(raw)?;
            insert(&mut root, &path, spec.clone())?;
        }
        let root_id = write_dir(store, &root)?;
        debug!(files = self.files.len(), root = %root_id.short_hex(), "snapshot written");
        Ok(root_id)
    }
}

fn insert(root: &mut BTreeMap<String, Node>, path: &RelativePath, spec: FileSpec) -> StoreResult<()> {
    let components: Vec<&str> = path.components().collect();
    let Some((name, dirs)) = components.split_last() else {
        return Err(StoreError::PathConflict(path.clone()));
    };

    let mut current = root;
    for dir in dirs {
        let node = current
            .entry((*dir).to_string())
            .or_insert_with(|| Node::Dir(BTreeMap::new()));
        current = match node {
            Node::Dir(children) => children,
            Node::File(_) => return Err(StoreError::PathConflict(path.clone())),
        };
    }
    if let Some(Node::Dir(_)) = current.get(*name) {
        return Err(StoreError::PathConflict(path.clone()));
    }
    current.insert((*name).to_string(), Node::File(spec));
    Ok(())
}

fn write_dir(store: &dyn ObjectStore, children: &BTreeMap<String, Node>) -> StoreResult<ObjectId> {
    let mut entries = Vec::with_capacity(children.len());
    for (name, node) in children {
        let entry = match node {
            Node::File(spec) => {
                let id = store.write(&Blob::new(spec.content.clone()).to_stored_object())?;
                TreeEntry::new(spec.mode, name, id)
            }
            Node::Dir(grandchildren) => {
                TreeEntry::new(EntryMode::Directory, name, write_dir(store, grandchildren)?)
            }
        };
        entries.push(entry);
    }
    store.write(&Tree::new(entries).to_stored_object()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStore;

    fn sample() -> TreeBuilder {
        TreeBuilder::from_files([
            ("src/1.txt", "This is src/1.txt.\n"),
            ("src/a/b/3.txt", "This is 3.txt.\n"),
            ("toplevel.txt", "toplevel\n"),
        ])
    }

    #[test]
    fn writes_nested_trees() {
        let store = InMemoryObjectStore::new();
        let root = sample().write(&store).unwrap();

        let tree = store.read_tree(&root).unwrap();
        let names: Vec<_> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["src", "toplevel.txt"]);

        let src = store.read_tree(&tree.get("src").unwrap().object_id).unwrap();
        assert_eq!(src.get("a").unwrap().mode, EntryMode::Directory);
        assert_eq!(src.get("1.txt").unwrap().object_id, Blob::id_of(b"This is src/1.txt.\n"));
    }

    #[test]
    fn identical_content_gives_identical_root() {
        let store = InMemoryObjectStore::new();
        let a = sample().write(&store).unwrap();
        let b = sample().clone().write(&store).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mode_change_changes_root() {
        let store = InMemoryObjectStore::new();
        let base = sample().write(&store).unwrap();
        let mut changed = sample();
        changed.set_file_with_mode("src/1.txt", "This is src/1.txt.\n", EntryMode::Executable);
        assert_ne!(changed.write(&store).unwrap(), base);
    }

    #[test]
    fn replace_directory_with_file() {
        let store = InMemoryObjectStore::new();
        let mut builder = sample();
        builder.replace_file("src/a", "a is now a file", EntryMode::Regular);
        let root = builder.write(&store).unwrap();

        let src_id = store.read_tree(&root).unwrap().get("src").unwrap().object_id;
        let a = store.read_tree(&src_id).unwrap().get("a").unwrap().clone();
        assert_eq!(a.mode, EntryMode::Regular);
        assert_eq!(builder.len(), 3);
    }

    #[test]
    fn file_and_directory_conflict() {
        let store = InMemoryObjectStore::new();
        let mut builder = sample();
        builder.set_file("toplevel.txt/inner", "x");
        assert!(matches!(builder.write(&store), Err(StoreError::PathConflict(_))));
    }

    #[test]
    fn invalid_path_rejected() {
        let store = InMemoryObjectStore::new();
        let builder = TreeBuilder::from_files([("../escape", "x")]);
        assert!(matches!(builder.write(&store), Err(StoreError::InvalidPath(_))));
    }

    #[test]
    fn empty_builder_writes_empty_tree() {
        let store = InMemoryObjectStore::new();
        let root = TreeBuilder::new().write(&store).unwrap();
        assert!(store.read_tree(&root).unwrap().is_empty());
    }
}
