//! Reference-tree provider backed by an object store.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use vdiff_store::ObjectStore;
use vdiff_types::ObjectId;

use crate::deferred::Deferred;
use crate::entry::ReferenceEntry;
use crate::error::{DiffError, DiffResult};
use crate::provider::ReferenceTreeProvider;

/// Serves reference listings by decoding `Tree` objects from a store.
///
/// A gated provider answers `Pending` until its [`LoadGate`] is released,
/// standing in for objects that must be fetched before they can be read.
pub struct StoreReferenceTree {
    store: Arc<dyn ObjectStore>,
    gate: Option<watch::Receiver<bool>>,
}

impl StoreReferenceTree {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store, gate: None }
    }

    /// Provider whose listings stay pending until the returned gate opens.
    pub fn gated(store: Arc<dyn ObjectStore>) -> (Self, LoadGate) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                store,
                gate: Some(rx),
            },
            LoadGate { tx },
        )
    }
}

fn read_listing(store: &dyn ObjectStore, tree: &ObjectId) -> DiffResult<Vec<ReferenceEntry>> {
    let tree = store.read_tree(tree).map_err(DiffError::from_store)?;
    Ok(tree.entries.iter().map(ReferenceEntry::from).collect())
}

impl ReferenceTreeProvider for StoreReferenceTree {
    fn list_children(&self, tree: &ObjectId) -> Deferred<Vec<ReferenceEntry>> {
        match &self.gate {
            Some(gate) if !*gate.borrow() => {
                let mut gate = gate.clone();
                let store = Arc::clone(&self.store);
                let tree = *tree;
                debug!(tree = %tree.short_hex(), "reference listing pending");
                Deferred::pending(async move {
                    gate.wait_for(|open| *open)
                        .await
                        .map(|_| ())
                        .map_err(|_| DiffError::Abandoned)?;
                    read_listing(store.as_ref(), &tree)
                })
            }
            _ => Deferred::from_result(read_listing(self.store.as_ref(), tree)),
        }
    }
}

impl std::fmt::Debug for StoreReferenceTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreReferenceTree")
            .field("gated", &self.gate.is_some())
            .finish()
    }
}

/// Releases the pending loads of a gated [`StoreReferenceTree`].
///
/// Dropping an unreleased gate abandons the pending loads.
#[derive(Debug)]
pub struct LoadGate {
    tx: watch::Sender<bool>,
}

impl LoadGate {
    pub fn release(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_released(&self) -> bool {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdiff_store::{InMemoryObjectStore, TreeBuilder};

    fn store_with_tree() -> (Arc<InMemoryObjectStore>, ObjectId) {
        let store = Arc::new(InMemoryObjectStore::new());
        let root = TreeBuilder::from_files([("b.txt", "b"), ("a/x.txt", "x")])
            .write(store.as_ref())
            .unwrap();
        (store, root)
    }

    #[tokio::test]
    async fn ungated_listing_is_ready() {
        let (store, root) = store_with_tree();
        let provider = StoreReferenceTree::new(store);
        let listing = provider.list_children(&root);
        assert!(listing.is_ready());
        let names: Vec<_> = listing.resolve().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["a", "b.txt"]);
    }

    #[tokio::test]
    async fn gated_listing_waits_for_release() {
        let (store, root) = store_with_tree();
        let (provider, gate) = StoreReferenceTree::gated(store);
        let listing = provider.list_children(&root);
        assert!(!listing.is_ready());

        let task = tokio::spawn(listing.resolve());
        assert!(!gate.is_released());
        gate.release();
        assert_eq!(task.await.unwrap().unwrap().len(), 2);

        assert!(provider.list_children(&root).is_ready());
    }

    #[tokio::test]
    async fn dropped_gate_abandons() {
        let (store, root) = store_with_tree();
        let (provider, gate) = StoreReferenceTree::gated(store);
        let listing = provider.list_children(&root);
        drop(gate);
        assert!(matches!(listing.resolve().await, Err(DiffError::Abandoned)));
    }

    #[tokio::test]
    async fn missing_tree_is_object_not_found() {
        let (store, _) = store_with_tree();
        let provider = StoreReferenceTree::new(store);
        let missing = ObjectId::from_hash([0xee; 32]);
        let result = provider.list_children(&missing).resolve().await;
        assert!(matches!(result, Err(DiffError::ObjectNotFound(id)) if id == missing));
    }
}
