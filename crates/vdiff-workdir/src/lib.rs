//! Working-tree providers for vdiff.
//!
//! The diff engine consumes working trees through
//! [`vdiff_diff::WorkingTreeProvider`]. This crate ships two of them and the
//! pieces needed to use them from a command line:
//!
//! - [`WorkingTree`] -- in-memory overlay over a checked-out snapshot, with
//!   lazily loaded and materialized directories
//! - [`FsWorkingTree`] -- a real directory on disk
//! - [`GitignoreOracle`] -- gitignore-syntax ignore rules
//! - [`import_directory`] -- snapshot a directory into an object store

pub mod error;
pub mod fs;
pub mod gitignore;
pub mod import;
pub mod overlay;


pub use error::{WorkdirError, WorkdirResult};
pub use fs::FsWorkingTree;
pub use gitignore::GitignoreOracle;
pub use import::import_directory;
pub use overlay::WorkingTree;
