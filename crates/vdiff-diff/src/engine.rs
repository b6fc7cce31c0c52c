//! Diff orchestration.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;
use vdiff_types::{ObjectId, RelativePath};

use crate::config::DiffConfig;
use crate::error::EngineResult;
use crate::provider::{IgnoreOracle, NoIgnore, ReferenceTreeProvider, WorkingTreeProvider};
use crate::sink::{DiffResults, DiffResultsCollector, DiffSink};
use crate::walker::{self, DiffContext};

/// Counters describing one completed diff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub directories_compared: u64,
    pub files_compared: u64,
    /// Loads that were still pending when the walker reached them.
    pub pending_loads: u64,
    /// Directories skipped because their identity matched the reference.
    pub unchanged_subtrees: u64,
    /// Per-path errors reported to the sink.
    pub errors: u64,
}

/// Compares a working tree against reference snapshots.
///
/// The engine holds no per-diff state; one engine can run many diffs,
/// including concurrently.
pub struct DiffEngine {
    working: Arc<dyn WorkingTreeProvider>,
    reference: Arc<dyn ReferenceTreeProvider>,
    ignore: Arc<dyn IgnoreOracle>,
    config: DiffConfig,
}

impl DiffEngine {
    pub fn new(working: Arc<dyn WorkingTreeProvider>, reference: Arc<dyn ReferenceTreeProvider>) -> Self {
        Self {
            working,
            reference,
            ignore: Arc::new(NoIgnore),
            config: DiffConfig::default(),
        }
    }

    pub fn with_ignore(mut self, ignore: Arc<dyn IgnoreOracle>) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_config(mut self, config: DiffConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Diff the working directory at `working_root` against the tree
    /// `reference_root`, or against an empty snapshot when it is `None`.
    ///
    /// Resolves once every classification has been delivered to `sink`.
    /// Per-path load failures go to the sink; only engine-level failures are
    /// returned.
    pub async fn diff(
        &self,
        working_root: &RelativePath,
        reference_root: Option<&ObjectId>,
        sink: Arc<dyn DiffSink>,
    ) -> EngineResult<DiffSummary> {
        self.config.validate()?;
        let started = Instant::now();
        info!(
            root = %working_root,
            reference = %reference_root.map_or_else(|| "none".to_string(), |id| id.short_hex()),
            policy = ?self.config.load_policy,
            "diff started"
        );

        let ctx = Arc::new(DiffContext::new(
            Arc::clone(&self.working),
            Arc::clone(&self.reference),
            Arc::clone(&self.ignore),
            sink,
            self.config.clone(),
        ));
        let working = self.working.list_children(working_root);
        let reference = reference_root.map(|id| self.reference.list_children(id));
        walker::compare_directory(Arc::clone(&ctx), working_root.clone(), Some(working), reference, false)
            .await?;

        let summary = ctx.summary();
        info!(
            directories = summary.directories_compared,
            files = summary.files_compared,
            pending = summary.pending_loads,
            unchanged = summary.unchanged_subtrees,
            errors = summary.errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "diff finished"
        );
        Ok(summary)
    }

    /// Run [`DiffEngine::diff`] into a fresh [`DiffResultsCollector`].
    pub async fn diff_to_results(
        &self,
        working_root: &RelativePath,
        reference_root: Option<&ObjectId>,
    ) -> EngineResult<(DiffResults, DiffSummary)> {
        let collector = Arc::new(DiffResultsCollector::new());
        let summary = self
            .diff(working_root, reference_root, Arc::clone(&collector) as Arc<dyn DiffSink>)
            .await?;
        Ok((collector.take_results(), summary))
    }
}

impl std::fmt::Debug for DiffEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffEngine").field("config", &self.config).finish()
    }
}
