//! Content hashing for vdiff.
//!
//! Blob and tree identities are domain-separated BLAKE3 digests, so a file
//! whose bytes happen to equal a serialized tree never collides with it.

pub mod hasher;

pub use hasher::ContentHasher;
