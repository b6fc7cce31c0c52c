//! Diff engine for vdiff.
//!
//! Compares a live working tree against an immutable reference snapshot by
//! merge-joining the two sides one directory level at a time. Neither tree
//! needs to be resident in memory: directory listings and file content
//! identities are pulled from providers on demand, and may arrive later
//! (pending) without blocking sibling comparisons.
//!
//! # Key Types
//!
//! - [`DiffEngine`] -- orchestrates one diff and returns a [`DiffSummary`]
//! - [`WorkingTreeProvider`] / [`ReferenceTreeProvider`] -- lazy tree sources
//! - [`Deferred`] -- a value that is either ready or still loading
//! - [`IgnoreOracle`] -- decides untracked vs. ignored
//! - [`DiffSink`] -- receives classified paths; [`DiffResultsCollector`] and
//!   [`ChannelSink`] are the shipped implementations
//! - [`StoreReferenceTree`] -- reference provider backed by an object store
//!
//! All spawning happens on the ambient tokio runtime; [`DiffEngine::diff`]
//! must be awaited from within one.

pub mod config;
pub mod deferred;
pub mod engine;
pub mod entry;
pub mod error;
pub mod provider;
pub mod reference;
pub mod sink;
mod walker;

pub use config::{DiffConfig, LoadPolicy};
pub use deferred::Deferred;
pub use engine::{DiffEngine, DiffSummary};
pub use entry::{ContentIdentity, EntryKind, ReferenceEntry, WorkingEntry};
pub use error::{DiffError, DiffResult, EngineError, EngineResult};
pub use provider::{IgnoreOracle, NoIgnore, ReferenceTreeProvider, WorkingTreeProvider};
pub use reference::{LoadGate, StoreReferenceTree};
pub use sink::{ChannelSink, DiffEvent, DiffResults, DiffResultsCollector, DiffSink};
