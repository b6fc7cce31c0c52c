//! Foundation types for vdiff.
//!
//! This crate provides the identity and path types shared by every other
//! vdiff crate: the content identity of stored objects and the
//! repository-relative path used to name entries during a diff.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`RelativePath`] -- `/`-separated path relative to the tree root

pub mod error;
pub mod object;
pub mod path;

pub use error::TypeError;
pub use object::ObjectId;
pub use path::RelativePath;
