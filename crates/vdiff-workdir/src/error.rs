//! Error types for the workdir crate.

use vdiff_store::{EntryMode, StoreError};
use vdiff_types::{RelativePath, TypeError};

/// Errors from working-tree mutation, import and ignore-rule loading.
#[derive(Debug, thiserror::Error)]
pub enum WorkdirError {
    /// Store operation failed, e.g. a directory's tree object is missing.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(#[from] TypeError),

    #[error("no such file or directory: {0}")]
    NotFound(RelativePath),

    #[error("already exists: {0}")]
    AlreadyExists(RelativePath),

    #[error("not a directory: {0}")]
    NotADirectory(RelativePath),

    #[error("is a directory: {0}")]
    IsADirectory(RelativePath),

    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(RelativePath),

    /// The operation needs a named entry but was given the root.
    #[error("operation not permitted on the root directory")]
    RootPath,

    #[error("mode {mode} cannot be applied to {path}")]
    InvalidMode { path: RelativePath, mode: EntryMode },

    /// Ignore rules could not be parsed.
    #[error("ignore rules: {0}")]
    Ignore(String),
}

/// Convenience alias for workdir results.
pub type WorkdirResult<T> = Result<T, WorkdirError>;
