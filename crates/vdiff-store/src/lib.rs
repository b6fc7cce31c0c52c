//! Content-addressed object storage for vdiff.
//!
//! Reference snapshots are immutable trees of content-addressed objects.
//! This crate holds the object model and the store the reference side of a
//! diff is read from.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file contents
//! - [`Tree`] -- directory listing mapping names to object references
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! Snapshots are assembled with [`TreeBuilder`].

pub mod builder;
pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use builder::TreeBuilder;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{Blob, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
