//! Result sinks.
//!
//! The walker reports every classified path to a [`DiffSink`]. Calls arrive
//! concurrently from many tasks with no ordering across subtrees, so sinks
//! must do their own synchronization.

use std::collections::BTreeSet;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use vdiff_types::RelativePath;

use crate::entry::ReferenceEntry;
use crate::error::DiffError;

/// Receiver of diff classifications.
pub trait DiffSink: Send + Sync {
    fn ignored_file(&self, path: &RelativePath);

    fn untracked_file(&self, path: &RelativePath);

    fn removed_file(&self, path: &RelativePath, entry: &ReferenceEntry);

    fn modified_file(&self, path: &RelativePath, entry: &ReferenceEntry);

    /// A load failed for `path`. No other event is reported for it.
    fn diff_error(&self, path: &RelativePath, err: &DiffError);
}

/// One classification, as streamed by [`ChannelSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiffEvent {
    Untracked { path: RelativePath },
    Ignored { path: RelativePath },
    Removed { path: RelativePath, entry: ReferenceEntry },
    Modified { path: RelativePath, entry: ReferenceEntry },
    Error { path: RelativePath, message: String },
}

impl DiffEvent {
    pub fn path(&self) -> &RelativePath {
        match self {
            Self::Untracked { path }
            | Self::Ignored { path }
            | Self::Removed { path, .. }
            | Self::Modified { path, .. }
            | Self::Error { path, .. } => path,
        }
    }
}

/// Aggregated outcome of one diff.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResults {
    pub untracked: BTreeSet<RelativePath>,
    pub ignored: BTreeSet<RelativePath>,
    pub removed: BTreeSet<RelativePath>,
    pub modified: BTreeSet<RelativePath>,
    pub errors: Vec<(RelativePath, String)>,
}

impl DiffResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one streamed event.
    pub fn record(&mut self, event: DiffEvent) {
        match event {
            DiffEvent::Untracked { path } => {
                self.untracked.insert(path);
            }
            DiffEvent::Ignored { path } => {
                self.ignored.insert(path);
            }
            DiffEvent::Removed { path, .. } => {
                self.removed.insert(path);
            }
            DiffEvent::Modified { path, .. } => {
                self.modified.insert(path);
            }
            DiffEvent::Error { path, message } => self.errors.push((path, message)),
        }
    }

    /// Nothing to report: no changes, no ignored paths, no errors.
    pub fn is_clean(&self) -> bool {
        self.total_changes() == 0 && self.ignored.is_empty() && self.errors.is_empty()
    }

    /// Untracked, removed and modified paths. Ignored paths are not changes.
    pub fn total_changes(&self) -> usize {
        self.untracked.len() + self.removed.len() + self.modified.len()
    }

    /// Paths classified more than once, or classified despite an error.
    ///
    /// Always empty for results produced by the engine.
    pub fn overlapping_paths(&self) -> BTreeSet<RelativePath> {
        let sets = [&self.untracked, &self.ignored, &self.removed, &self.modified];
        let mut seen = BTreeSet::new();
        let mut overlap = BTreeSet::new();
        for path in sets.iter().flat_map(|s| s.iter()) {
            if !seen.insert(path) {
                overlap.insert(path.clone());
            }
        }
        for (path, _) in &self.errors {
            if seen.contains(path) {
                overlap.insert(path.clone());
            }
        }
        overlap
    }
}

/// Sink collecting into [`DiffResults`] behind a single mutex.
#[derive(Debug, Default)]
pub struct DiffResultsCollector {
    results: Mutex<DiffResults>,
}

impl DiffResultsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the accumulated results, leaving the collector empty.
    pub fn take_results(&self) -> DiffResults {
        std::mem::take(&mut *self.results.lock().expect("lock poisoned"))
    }

    fn record(&self, event: DiffEvent) {
        self.results.lock().expect("lock poisoned").record(event);
    }
}

impl DiffSink for DiffResultsCollector {
    fn ignored_file(&self, path: &RelativePath) {
        self.record(DiffEvent::Ignored { path: path.clone() });
    }

    fn untracked_file(&self, path: &RelativePath) {
        self.record(DiffEvent::Untracked { path: path.clone() });
    }

    fn removed_file(&self, path: &RelativePath, entry: &ReferenceEntry) {
        self.record(DiffEvent::Removed {
            path: path.clone(),
            entry: entry.clone(),
        });
    }

    fn modified_file(&self, path: &RelativePath, entry: &ReferenceEntry) {
        self.record(DiffEvent::Modified {
            path: path.clone(),
            entry: entry.clone(),
        });
    }

    fn diff_error(&self, path: &RelativePath, err: &DiffError) {
        self.record(DiffEvent::Error {
            path: path.clone(),
            message: err.to_string(),
        });
    }
}

/// Sink that streams events to a single consumer task.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DiffEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DiffEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: DiffEvent) {
        let _ = self.tx.send(event);
    }
}

impl DiffSink for ChannelSink {
    fn ignored_file(&self, path: &RelativePath) {
        self.send(DiffEvent::Ignored { path: path.clone() });
    }

    fn untracked_file(&self, path: &RelativePath) {
        self.send(DiffEvent::Untracked { path: path.clone() });
    }

    fn removed_file(&self, path: &RelativePath, entry: &ReferenceEntry) {
        self.send(DiffEvent::Removed {
            path: path.clone(),
            entry: entry.clone(),
        });
    }

    fn modified_file(&self, path: &RelativePath, entry: &ReferenceEntry) {
        self.send(DiffEvent::Modified {
            path: path.clone(),
            entry: entry.clone(),
        });
    }

    fn diff_error(&self, path: &RelativePath, err: &DiffError) {
        self.send(DiffEvent::Error {
            path: path.clone(),
            message: err.to_string(),
        });
    }
}
