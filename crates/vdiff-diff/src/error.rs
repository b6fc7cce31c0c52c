//! Error types for the diff crate.
//!
//! [`DiffError`] is a per-path data problem: it is reported to the sink for
//! the path it concerns and never fails the diff. [`EngineError`] is a setup
//! or runtime violation that fails the whole operation.

use vdiff_store::StoreError;
use vdiff_types::{ObjectId, RelativePath, TypeError};

/// A load or comparison failure scoped to a single path.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// An object referenced by a snapshot was not found in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error reading the working tree.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path does not exist in the working tree.
    #[error("path not found: {0}")]
    PathNotFound(RelativePath),

    /// A listing named the same entry twice.
    #[error("inconsistent listing: duplicate entry {name:?}")]
    InconsistentListing { name: String },

    /// A listing contained a name that is not a single path component.
    #[error("inconsistent listing: {0}")]
    InvalidEntryName(#[from] TypeError),

    /// The source of a pending load went away before producing a value.
    #[error("load abandoned before completion")]
    Abandoned,

    /// Provider-specific failure.
    #[error("load failed: {0}")]
    Load(String),
}

impl DiffError {
    /// Map store errors, lifting `NotFound` to [`DiffError::ObjectNotFound`].
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::ObjectNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Convenience alias for per-path results.
pub type DiffResult<T> = Result<T, DiffError>;

/// Failure of the diff operation as a whole.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Data was still loading while the load policy demands ready data.
    #[error("data for {path} is not ready and the load policy requires ready data")]
    NotReady { path: RelativePath },

    #[error("invalid diff configuration: {0}")]
    InvalidConfig(String),

    /// A spawned comparison task panicked or was cancelled.
    #[error("diff task failed: {0}")]
    TaskFailed(String),
}

/// Convenience alias for engine-level results.
pub type EngineResult<T> = Result<T, EngineError>;
