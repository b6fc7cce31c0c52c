use vdiff_types::{ObjectId, RelativePath};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The object data is malformed or of the wrong kind.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// Attempted to write a null object ID.
    #[error("cannot store object with null ID")]
    NullObjectId,

    /// A snapshot path is not a valid relative path.
    #[error("invalid snapshot path: {0}")]
    InvalidPath(#[from] vdiff_types::TypeError),

    /// A snapshot path is used both as a file and as a directory.
    #[error("path conflict at {0}: used as both file and directory")]
    PathConflict(RelativePath),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
