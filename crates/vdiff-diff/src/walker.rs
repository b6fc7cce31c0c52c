//! Recursive merge-walk over a working directory and a reference tree.
//!
//! Each directory level resolves both child listings, merge-joins them by
//! name and classifies every entry. Child directories and pending content
//! loads run as tasks in the level's `JoinSet`; a level completes only after
//! all of them have, so awaiting the root awaits the whole walk.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use vdiff_types::{ObjectId, RelativePath};

use crate::config::{DiffConfig, LoadPolicy};
use crate::deferred::Deferred;
use crate::engine::DiffSummary;
use crate::entry::{ContentIdentity, EntryKind, NamedEntry, ReferenceEntry, WorkingEntry};
use crate::error::{DiffError, DiffResult, EngineError, EngineResult};
use crate::provider::{IgnoreOracle, ReferenceTreeProvider, WorkingTreeProvider};
use crate::sink::DiffSink;

/// State shared by every task of one diff.
pub(crate) struct DiffContext {
    working: Arc<dyn WorkingTreeProvider>,
    reference: Arc<dyn ReferenceTreeProvider>,
    ignore: Arc<dyn IgnoreOracle>,
    sink: Arc<dyn DiffSink>,
    config: DiffConfig,
    loads: Semaphore,
    stats: Stats,
}

#[derive(Default)]
struct Stats {
    directories: AtomicU64,
    files: AtomicU64,
    pending: AtomicU64,
    unchanged: AtomicU64,
    errors: AtomicU64,
}

impl DiffContext {
    pub(crate) fn new(
        working: Arc<dyn WorkingTreeProvider>,
        reference: Arc<dyn ReferenceTreeProvider>,
        ignore: Arc<dyn IgnoreOracle>,
        sink: Arc<dyn DiffSink>,
        config: DiffConfig,
    ) -> Self {
        let loads = Semaphore::new(config.max_concurrent_loads);
        Self {
            working,
            reference,
            ignore,
            sink,
            config,
            loads,
            stats: Stats::default(),
        }
    }

    pub(crate) fn summary(&self) -> DiffSummary {
        DiffSummary {
            directories_compared: self.stats.directories.load(Ordering::Relaxed),
            files_compared: self.stats.files.load(Ordering::Relaxed),
            pending_loads: self.stats.pending.load(Ordering::Relaxed),
            unchanged_subtrees: self.stats.unchanged.load(Ordering::Relaxed),
            errors: self.stats.errors.load(Ordering::Relaxed),
        }
    }

    /// Wait for a deferred value, holding a load permit while it is pending.
    ///
    /// The outer result is the engine-level outcome; the inner one is the
    /// load's own result for `path`.
    async fn resolve<T: Send + 'static>(
        &self,
        path: &RelativePath,
        value: Deferred<T>,
    ) -> EngineResult<DiffResult<T>> {
        match value {
            Deferred::Ready(result) => Ok(result),
            Deferred::Pending(load) => {
                if self.config.load_policy == LoadPolicy::RequireReady {
                    return Err(EngineError::NotReady { path: path.clone() });
                }
                let _permit = self
                    .loads
                    .acquire()
                    .await
                    .map_err(|e| EngineError::TaskFailed(e.to_string()))?;
                self.stats.pending.fetch_add(1, Ordering::Relaxed);
                Ok(load.await)
            }
        }
    }

    fn report_error(&self, path: &RelativePath, err: &DiffError) {
        self.stats.errors.fetch_add(1, Ordering::Relaxed);
        warn!(path = %path, error = %err, "load failed");
        self.sink.diff_error(path, err);
    }

    fn classify_content(&self, path: &RelativePath, loaded: DiffResult<ObjectId>, entry: &ReferenceEntry) {
        match loaded {
            Ok(id) if id != entry.object_id => self.sink.modified_file(path, entry),
            Ok(_) => {}
            Err(err) => self.report_error(path, &err),
        }
    }
}

/// Compare one directory level. `None` stands for a side on which the
/// directory does not exist.
pub(crate) fn compare_directory(
    ctx: Arc<DiffContext>,
    path: RelativePath,
    working: Option<Deferred<Vec<WorkingEntry>>>,
    reference: Option<Deferred<Vec<ReferenceEntry>>>,
    ignored: bool,
) -> BoxFuture<'static, EngineResult<()>> {
    async move {
        let (working, reference) = tokio::join!(
            ctx.resolve(&path, working.unwrap_or_else(|| Deferred::ready(Vec::new()))),
            ctx.resolve(&path, reference.unwrap_or_else(|| Deferred::ready(Vec::new()))),
        );
        let listings = match (working?, reference?) {
            (Ok(w), Ok(r)) => normalize(&path, w).and_then(|w| Ok((w, normalize(&path, r)?))),
            (Err(err), _) | (_, Err(err)) => Err(err),
        };
        let (mut working, reference) = match listings {
            Ok(listings) => listings,
            Err(err) => {
                ctx.report_error(&path, &err);
                return Ok(());
            }
        };
        if path.is_root() {
            working.retain(|entry| !ctx.config.is_metadata_dir(&entry.name));
        }

        ctx.stats.directories.fetch_add(1, Ordering::Relaxed);
        debug!(
            path = %path,
            working = working.len(),
            reference = reference.len(),
            ignored,
            "comparing directory"
        );

        let mut level = Level {
            ctx,
            path,
            ignored,
            tasks: JoinSet::new(),
        };
        let (mut wi, mut ri) = (0, 0);
        loop {
            match (working.get(wi), reference.get(ri)) {
                (None, None) => break,
                (Some(w), Some(r)) if w.name == r.name => {
                    level.both(w, r)?;
                    wi += 1;
                    ri += 1;
                }
                (Some(w), Some(r)) if r.name < w.name => {
                    level.reference_only(r);
                    ri += 1;
                }
                (Some(w), _) => {
                    level.working_only(w);
                    wi += 1;
                }
                (None, Some(r)) => {
                    level.reference_only(r);
                    ri += 1;
                }
            }
        }
        level.finish().await
    }
    .boxed()
}

/// Sort a listing by name and reject duplicate or malformed names.
fn normalize<E: NamedEntry>(dir: &RelativePath, mut entries: Vec<E>) -> DiffResult<Vec<E>> {
    entries.sort_by(|a, b| a.name().cmp(b.name()));
    if let Some(pair) = entries.windows(2).find(|pair| pair[0].name() == pair[1].name()) {
        return Err(DiffError::InconsistentListing {
            name: pair[0].name().to_string(),
        });
    }
    for entry in &entries {
        dir.try_join(entry.name())?;
    }
    Ok(entries)
}

/// One directory level of the walk and the tasks it spawned.
struct Level {
    ctx: Arc<DiffContext>,
    path: RelativePath,
    ignored: bool,
    tasks: JoinSet<EngineResult<()>>,
}

impl Level {
    fn spawn_directory(
        &mut self,
        path: RelativePath,
        working: Option<Deferred<Vec<WorkingEntry>>>,
        reference: Option<Deferred<Vec<ReferenceEntry>>>,
        ignored: bool,
    ) {
        let compare = compare_directory(Arc::clone(&self.ctx), path, working, reference, ignored);
        self.tasks.spawn(compare);
    }

    fn working_only(&mut self, entry: &WorkingEntry) {
        let path = self.path.join(&entry.name);
        let kind = entry.kind();
        let ignored = self.ignored || self.ctx.ignore.is_ignored(&path, kind);
        match kind {
            EntryKind::File if ignored => {
                if self.ctx.config.report_ignored {
                    self.ctx.sink.ignored_file(&path);
                }
            }
            EntryKind::File => self.ctx.sink.untracked_file(&path),
            EntryKind::Directory if ignored && !self.ctx.config.report_ignored => {
                debug!(path = %path, "skipping ignored directory");
            }
            EntryKind::Directory => {
                let listing = self.ctx.working.list_children(&path);
                self.spawn_directory(path, Some(listing), None, ignored);
            }
        }
    }

    fn reference_only(&mut self, entry: &ReferenceEntry) {
        let path = self.path.join(&entry.name);
        match entry.kind() {
            EntryKind::File => self.ctx.sink.removed_file(&path, entry),
            EntryKind::Directory => {
                let listing = self.ctx.reference.list_children(&entry.object_id);
                self.spawn_directory(path, None, Some(listing), false);
            }
        }
    }

    fn both(&mut self, working: &WorkingEntry, reference: &ReferenceEntry) -> EngineResult<()> {
        match (working.kind(), reference.kind()) {
            (EntryKind::File, EntryKind::File) => self.compare_files(working, reference)?,
            (EntryKind::Directory, EntryKind::Directory) => {
                let path = self.path.join(&working.name);
                if working.content.known() == Some(reference.object_id) {
                    self.ctx.stats.unchanged.fetch_add(1, Ordering::Relaxed);
                    debug!(path = %path, "unchanged subtree");
                    return Ok(());
                }
                let working_listing = self.ctx.working.list_children(&path);
                let reference_listing = self.ctx.reference.list_children(&reference.object_id);
                self.spawn_directory(
                    path,
                    Some(working_listing),
                    Some(reference_listing),
                    self.ignored,
                );
            }
            _ => {
                self.working_only(working);
                self.reference_only(reference);
            }
        }
        Ok(())
    }

    fn compare_files(&mut self, working: &WorkingEntry, reference: &ReferenceEntry) -> EngineResult<()> {
        let path = self.path.join(&working.name);
        self.ctx.stats.files.fetch_add(1, Ordering::Relaxed);

        if working.mode != reference.mode {
            self.ctx.sink.modified_file(&path, reference);
            return Ok(());
        }
        match working.content {
            ContentIdentity::Known(id) => {
                self.ctx.classify_content(&path, Ok(id), reference);
            }
            ContentIdentity::Unknown => match self.ctx.working.content_identity(&path) {
                Deferred::Ready(loaded) => self.ctx.classify_content(&path, loaded, reference),
                Deferred::Pending(_) if self.ctx.config.load_policy == LoadPolicy::RequireReady => {
                    return Err(EngineError::NotReady { path });
                }
                pending => {
                    let ctx = Arc::clone(&self.ctx);
                    let reference = reference.clone();
                    self.tasks.spawn(async move {
                        let loaded = ctx.resolve(&path, pending).await?;
                        ctx.classify_content(&path, loaded, &reference);
                        Ok(())
                    });
                }
            },
        }
        Ok(())
    }

    /// Wait for every spawned task. The first engine-level failure aborts
    /// the rest.
    async fn finish(mut self) -> EngineResult<()> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.tasks.abort_all();
                    return Err(err);
                }
                Err(err) => {
                    self.tasks.abort_all();
                    return Err(EngineError::TaskFailed(err.to_string()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdiff_store::EntryMode;

    fn file(name: &str) -> WorkingEntry {
        WorkingEntry::new(name, EntryMode::Regular, ContentIdentity::Unknown)
    }

    #[test]
    fn normalize_sorts_by_byte_order() {
        let sorted = normalize(&RelativePath::root(), vec![file("b"), file("B"), file("a")]).unwrap();
        let names: Vec<_> = sorted.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["B", "a", "b"]);
    }

    #[test]
    fn normalize_rejects_duplicates() {
        let err = normalize(&RelativePath::root(), vec![file("x"), file("y"), file("x")]).unwrap_err();
        assert!(matches!(err, DiffError::InconsistentListing { name } if name == "x"));
    }

    #[test]
    fn normalize_rejects_bad_names() {
        let err = normalize(&RelativePath::root(), vec![file("a/b")]).unwrap_err();
        assert!(matches!(err, DiffError::InvalidEntryName(_)));
        let err = normalize(&RelativePath::root(), vec![file("..")]).unwrap_err();
        assert!(matches!(err, DiffError::InvalidEntryName(_)));
    }
}
