//! In-memory overlay over a checked-out snapshot.
//!
//! The [`WorkingTree`] mirrors how a virtual filesystem tracks its working
//! copy: directories start out unloaded (only their source tree ID is
//! known), get loaded from the store on first mutation or by
//! [`WorkingTree::load_all`], and become materialized once anything beneath
//! them changes. Files keep their source blob ID until written, after which
//! their bytes live in the overlay.
//!
//! As a [`WorkingTreeProvider`], unmodified entries report `Known`
//! identities, so the diff engine can skip subtrees that were never touched.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;
use vdiff_diff::{ContentIdentity, Deferred, DiffError, DiffResult, WorkingEntry, WorkingTreeProvider};
use vdiff_store::{Blob, EntryMode, ObjectStore, Tree};
use vdiff_types::{ObjectId, RelativePath};

use crate::error::{WorkdirError, WorkdirResult};

#[derive(Clone, Debug)]
enum FileContent {
    Source(ObjectId),
    Materialized(Vec<u8>),
}

#[derive(Clone, Debug)]
struct FileNode {
    mode: EntryMode,
    content: FileContent,
}

impl FileNode {
    fn identity(&self) -> ObjectId {
        match &self.content {
            FileContent::Source(id) => *id,
            FileContent::Materialized(data) => Blob::id_of(data),
        }
    }
}

#[derive(Clone, Debug)]
enum Node {
    File(FileNode),
    Dir(DirNode),
}

#[derive(Clone, Debug)]
struct LoadedDir {
    /// Tree this directory was loaded from; `None` for directories created
    /// in the overlay.
    source: Option<ObjectId>,
    children: BTreeMap<String, Node>,
    materialized: bool,
}

impl LoadedDir {
    fn from_tree(id: ObjectId, tree: &Tree) -> Self {
        let children = tree
            .entries
            .iter()
            .map(|entry| {
                let node = if entry.mode.is_dir() {
                    Node::Dir(DirNode::Unloaded(entry.object_id))
                } else {
                    Node::File(FileNode {
                        mode: entry.mode,
                        content: FileContent::Source(entry.object_id),
                    })
                };
                (entry.name.clone(), node)
            })
            .collect();
        Self {
            source: Some(id),
            children,
            materialized: false,
        }
    }

    fn created() -> Self {
        Self {
            source: None,
            children: BTreeMap::new(),
            materialized: true,
        }
    }
}

#[derive(Clone, Debug)]
enum DirNode {
    Unloaded(ObjectId),
    Loaded(LoadedDir),
}

impl DirNode {
    fn load(&mut self, store: &dyn ObjectStore) -> WorkdirResult<&mut LoadedDir> {
        match *self {
            DirNode::Loaded(ref mut dir) => Ok(dir),
            DirNode::Unloaded(id) => {
                let tree = store.read_tree(&id)?;
                *self = DirNode::Loaded(LoadedDir::from_tree(id, &tree));
                self.load(store)
            }
        }
    }

    /// Identity reported to the diff engine.
    fn identity(&self) -> ContentIdentity {
        match self {
            DirNode::Unloaded(id) => ContentIdentity::Known(*id),
            DirNode::Loaded(LoadedDir {
                source: Some(id),
                materialized: false,
                ..
            }) => ContentIdentity::Known(*id),
            DirNode::Loaded(_) => ContentIdentity::Unknown,
        }
    }
}

/// Read-only position in the tree: either an overlay directory, or a tree
/// object below an unloaded directory.
enum Cursor<'a> {
    Loaded(&'a LoadedDir),
    Stored(Tree),
}

impl<'a> Cursor<'a> {
    fn of(dir: &'a DirNode, store: &dyn ObjectStore) -> DiffResult<Self> {
        match dir {
            DirNode::Loaded(loaded) => Ok(Cursor::Loaded(loaded)),
            DirNode::Unloaded(id) => read_tree(store, id).map(Cursor::Stored),
        }
    }

    fn child_dir(self, name: &str, store: &dyn ObjectStore, path: &RelativePath) -> DiffResult<Self> {
        match self {
            Cursor::Loaded(dir) => match dir.children.get(name) {
                Some(Node::Dir(child)) => Cursor::of(child, store),
                _ => Err(DiffError::PathNotFound(path.clone())),
            },
            Cursor::Stored(tree) => match tree.get(name) {
                Some(entry) if entry.mode.is_dir() => read_tree(store, &entry.object_id).map(Cursor::Stored),
                _ => Err(DiffError::PathNotFound(path.clone())),
            },
        }
    }

    fn entries(&self) -> Vec<WorkingEntry> {
        match self {
            Cursor::Loaded(dir) => dir
                .children
                .iter()
                .map(|(name, node)| match node {
                    Node::File(file) => {
                        let content = match file.content {
                            FileContent::Source(id) => ContentIdentity::Known(id),
                            FileContent::Materialized(_) => ContentIdentity::Unknown,
                        };
                        WorkingEntry::new(name.clone(), file.mode, content)
                    }
                    Node::Dir(dir) => WorkingEntry::new(name.clone(), EntryMode::Directory, dir.identity()),
                })
                .collect(),
            Cursor::Stored(tree) => tree
                .entries
                .iter()
                .map(|e| WorkingEntry::new(e.name.clone(), e.mode, ContentIdentity::Known(e.object_id)))
                .collect(),
        }
    }

    fn file_identity(&self, name: &str, path: &RelativePath) -> DiffResult<ObjectId> {
        match self {
            Cursor::Loaded(dir) => match dir.children.get(name) {
                Some(Node::File(file)) => Ok(file.identity()),
                _ => Err(DiffError::PathNotFound(path.clone())),
            },
            Cursor::Stored(tree) => match tree.get(name) {
                Some(entry) if !entry.mode.is_dir() => Ok(entry.object_id),
                _ => Err(DiffError::PathNotFound(path.clone())),
            },
        }
    }
}

fn read_tree(store: &dyn ObjectStore, id: &ObjectId) -> DiffResult<Tree> {
    store.read_tree(id).map_err(DiffError::from_store)
}

/// Mutable in-memory working copy of a snapshot.
pub struct WorkingTree {
    store: Arc<dyn ObjectStore>,
    root: RwLock<DirNode>,
}

impl WorkingTree {
    /// Check out `tree`. Nothing is read from the store until needed.
    pub fn checkout(store: Arc<dyn ObjectStore>, tree: ObjectId) -> Self {
        Self {
            store,
            root: RwLock::new(DirNode::Unloaded(tree)),
        }
    }

    /// A working tree with no source snapshot.
    pub fn empty(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            root: RwLock::new(DirNode::Loaded(LoadedDir::created())),
        }
    }

    /// Load every directory from the store without materializing anything.
    /// Returns the number of directories visited.
    pub fn load_all(&self) -> WorkdirResult<usize> {
        fn load_dir(store: &dyn ObjectStore, dir: &mut DirNode) -> WorkdirResult<usize> {
            let loaded = dir.load(store)?;
            let mut count = 1;
            for node in loaded.children.values_mut() {
                if let Node::Dir(child) = node {
                    count += load_dir(store, child)?;
                }
            }
            Ok(count)
        }

        let mut root = self.root.write().expect("lock poisoned");
        let count = load_dir(self.store.as_ref(), &mut root)?;
        debug!(directories = count, "working tree fully loaded");
        Ok(count)
    }

    /// Replace the contents of an existing file, keeping its mode.
    pub fn write_file(&self, path: &str, content: impl AsRef<[u8]>) -> WorkdirResult<()> {
        let content = content.as_ref().to_vec();
        self.mutate(path, |children, name, path| match children.get_mut(name) {
            Some(Node::File(file)) => {
                file.content = FileContent::Materialized(content);
                Ok(())
            }
            Some(Node::Dir(_)) => Err(WorkdirError::IsADirectory(path.clone())),
            None => Err(WorkdirError::NotFound(path.clone())),
        })
    }

    /// Create a new regular file.
    pub fn add_file(&self, path: &str, content: impl AsRef<[u8]>) -> WorkdirResult<()> {
        self.add_file_with_mode(path, content, EntryMode::Regular)
    }

    pub fn add_file_with_mode(&self, path: &str, content: impl AsRef<[u8]>, mode: EntryMode) -> WorkdirResult<()> {
        if mode.is_dir() {
            return Err(WorkdirError::InvalidMode {
                path: RelativePath::parse(path)?,
                mode,
            });
        }
        let content = content.as_ref().to_vec();
        self.mutate(path, |children, name, path| {
            if children.contains_key(name) {
                return Err(WorkdirError::AlreadyExists(path.clone()));
            }
            children.insert(
                name.to_string(),
                Node::File(FileNode {
                    mode,
                    content: FileContent::Materialized(content),
                }),
            );
            Ok(())
        })
    }

    pub fn mkdir(&self, path: &str) -> WorkdirResult<()> {
        self.mutate(path, |children, name, path| {
            if children.contains_key(name) {
                return Err(WorkdirError::AlreadyExists(path.clone()));
            }
            children.insert(name.to_string(), Node::Dir(DirNode::Loaded(LoadedDir::created())));
            Ok(())
        })
    }

    pub fn remove_file(&self, path: &str) -> WorkdirResult<()> {
        self.mutate(path, |children, name, path| match children.get(name) {
            Some(Node::File(_)) => {
                children.remove(name);
                Ok(())
            }
            Some(Node::Dir(_)) => Err(WorkdirError::IsADirectory(path.clone())),
            None => Err(WorkdirError::NotFound(path.clone())),
        })
    }

    /// Remove an empty directory.
    pub fn rmdir(&self, path: &str) -> WorkdirResult<()> {
        let store = Arc::clone(&self.store);
        self.mutate(path, move |children, name, path| {
            let empty = match children.get_mut(name) {
                Some(Node::Dir(dir)) => dir.load(store.as_ref())?.children.is_empty(),
                Some(Node::File(_)) => return Err(WorkdirError::NotADirectory(path.clone())),
                None => return Err(WorkdirError::NotFound(path.clone())),
            };
            if !empty {
                return Err(WorkdirError::DirectoryNotEmpty(path.clone()));
            }
            children.remove(name);
            Ok(())
        })
    }

    /// Set a file's mode. Only `Regular` and `Executable` are accepted.
    pub fn chmod(&self, path: &str, mode: EntryMode) -> WorkdirResult<()> {
        self.mutate(path, |children, name, path| match children.get_mut(name) {
            Some(Node::File(file)) if matches!(mode, EntryMode::Regular | EntryMode::Executable) => {
                file.mode = mode;
                Ok(())
            }
            Some(Node::File(_)) => Err(WorkdirError::InvalidMode {
                path: path.clone(),
                mode,
            }),
            Some(Node::Dir(_)) => Err(WorkdirError::IsADirectory(path.clone())),
            None => Err(WorkdirError::NotFound(path.clone())),
        })
    }

    /// Load the parent of `path`, apply `op` to its children, and on success
    /// mark every directory from the root down to the parent materialized.
    fn mutate<F>(&self, path: &str, op: F) -> WorkdirResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, Node>, &str, &RelativePath) -> WorkdirResult<()>,
    {
        let path = RelativePath::parse(path)?;
        let components: Vec<&str> = path.components().collect();
        let Some((name, parents)) = components.split_last() else {
            return Err(WorkdirError::RootPath);
        };

        let mut root = self.root.write().expect("lock poisoned");
        let mut dir = root.load(self.store.as_ref())?;
        for parent in parents {
            dir = match dir.children.get_mut(*parent) {
                Some(Node::Dir(child)) => child.load(self.store.as_ref())?,
                Some(Node::File(_)) => return Err(WorkdirError::NotADirectory(path.clone())),
                None => return Err(WorkdirError::NotFound(path.clone())),
            };
        }
        op(&mut dir.children, name, &path)?;

        let mut dir = &mut *root;
        for parent in parents.iter().map(Some).chain([None]) {
            let DirNode::Loaded(loaded) = dir else { break };
            loaded.materialized = true;
            let next = match parent {
                Some(name) => loaded.children.get_mut(*name),
                None => None,
            };
            match next {
                Some(Node::Dir(child)) => dir = child,
                _ => break,
            }
        }
        debug!(path = %path, "working tree modified");
        Ok(())
    }

    fn parent_cursor<'a>(&self, root: &'a DirNode, parents: &[&str], path: &RelativePath) -> DiffResult<Cursor<'a>> {
        let store = self.store.as_ref();
        let mut cursor = Cursor::of(root, store)?;
        for name in parents {
            cursor = cursor.child_dir(name, store, path)?;
        }
        Ok(cursor)
    }
}

impl WorkingTreeProvider for WorkingTree {
    fn list_children(&self, dir: &RelativePath) -> Deferred<Vec<WorkingEntry>> {
        let root = self.root.read().expect("lock poisoned");
        let components: Vec<&str> = dir.components().collect();
        let listing = self
            .parent_cursor(&root, &components, dir)
            .map(|cursor| cursor.entries());
        Deferred::from_result(listing)
    }

    fn content_identity(&self, file: &RelativePath) -> Deferred<ObjectId> {
        let root = self.root.read().expect("lock poisoned");
        let components: Vec<&str> = file.components().collect();
        let Some((name, parents)) = components.split_last() else {
            return Deferred::failed(DiffError::PathNotFound(file.clone()));
        };
        let identity = self
            .parent_cursor(&root, parents, file)
            .and_then(|cursor| cursor.file_identity(name, file));
        Deferred::from_result(identity)
    }
}

impl std::fmt::Debug for WorkingTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let root = self.root.read().expect("lock poisoned");
        f.debug_struct("WorkingTree")
            .field("root", &root.identity())
            .finish()
    }
}
