use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use tracing::debug;
use vdiff_diff::{DiffConfig, DiffEngine, DiffResults, DiffSummary, IgnoreOracle, NoIgnore, StoreReferenceTree};
use vdiff_store::InMemoryObjectStore;
use vdiff_types::{ObjectId, RelativePath};
use vdiff_workdir::{import_directory, FsWorkingTree, GitignoreOracle};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Compare(args) => cmd_compare(args, cli.format).await,
        Command::Snapshot(args) => cmd_snapshot(args, cli.format).await,
    }
}

#[derive(Serialize)]
struct CompareReport<'a> {
    snapshot: String,
    results: &'a DiffResults,
    summary: &'a DiffSummary,
}

async fn cmd_compare(args: CompareArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.no_ignored {
        config.report_ignored = false;
    }
    let ignore = load_ignore(&args.workdir, args.ignore_file.as_deref())?;

    let store = Arc::new(InMemoryObjectStore::new());
    let root = snapshot_directory(Arc::clone(&store), args.snapshot.clone(), &config).await?;
    debug!(root = %root.short_hex(), objects = store.len(), "snapshot imported");

    let engine = DiffEngine::new(
        Arc::new(FsWorkingTree::new(&args.workdir)),
        Arc::new(StoreReferenceTree::new(store)),
    )
    .with_ignore(ignore)
    .with_config(config);
    let (results, summary) = engine
        .diff_to_results(&RelativePath::root(), Some(&root))
        .await
        .with_context(|| format!("comparing {}", args.workdir.display()))?;

    match format {
        OutputFormat::Text => print!("{}", render_text(&results, &summary)),
        OutputFormat::Json => {
            let report = CompareReport {
                snapshot: root.to_hex(),
                results: &results,
                summary: &summary,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

async fn cmd_snapshot(args: SnapshotArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = DiffConfig::default();
    let ignore: Arc<dyn IgnoreOracle> = match &args.ignore_file {
        Some(path) => Arc::new(GitignoreOracle::from_file(path)?),
        None => Arc::new(NoIgnore),
    };
    let store = Arc::new(InMemoryObjectStore::new());
    let dir = args.dir.clone();
    let import_store = Arc::clone(&store);
    let root = tokio::task::spawn_blocking(move || {
        import_directory(import_store.as_ref(), &dir, ignore.as_ref(), &config.metadata_dirs)
    })
    .await??;

    match format {
        OutputFormat::Text => {
            println!("{} {}", root.to_hex().yellow(), args.dir.display());
            println!("  Objects: {}", store.len().to_string().bold());
        }
        OutputFormat::Json => {
            let value = serde_json::json!({ "root": root.to_hex(), "objects": store.len() });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

/// Import `dir` into `store` on the blocking pool.
async fn snapshot_directory(
    store: Arc<InMemoryObjectStore>,
    dir: PathBuf,
    config: &DiffConfig,
) -> anyhow::Result<ObjectId> {
    let metadata_dirs = config.metadata_dirs.clone();
    let root = tokio::task::spawn_blocking(move || {
        import_directory(store.as_ref(), &dir, &NoIgnore, &metadata_dirs)
            .with_context(|| format!("importing snapshot {}", dir.display()))
    })
    .await??;
    Ok(root)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DiffConfig> {
    let Some(path) = path else {
        return Ok(DiffConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: DiffConfig = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

/// An explicit ignore file wins; otherwise `<workdir>/.gitignore` is used if
/// it exists.
fn load_ignore(workdir: &Path, explicit: Option<&Path>) -> anyhow::Result<Arc<dyn IgnoreOracle>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = workdir.join(".gitignore");
            if !default.is_file() {
                return Ok(Arc::new(NoIgnore));
            }
            default
        }
    };
    let oracle = GitignoreOracle::from_file(&path).with_context(|| format!("loading {}", path.display()))?;
    debug!(path = %path.display(), rules = oracle.len(), "ignore rules loaded");
    Ok(Arc::new(oracle))
}

fn render_text(results: &DiffResults, summary: &DiffSummary) -> String {
    let mut out = String::new();
    for path in &results.modified {
        let _ = writeln!(out, "  {} {}", "modified: ".yellow(), path);
    }
    for path in &results.removed {
        let _ = writeln!(out, "  {} {}", "removed:  ".red(), path);
    }
    for path in &results.untracked {
        let _ = writeln!(out, "  {} {}", "untracked:".green(), path);
    }
    for path in &results.ignored {
        let _ = writeln!(out, "  {} {}", "ignored:  ".dimmed(), path);
    }
    for (path, message) in &results.errors {
        let _ = writeln!(out, "  {} {}: {}", "error:    ".red().bold(), path, message);
    }

    if results.is_clean() {
        let _ = writeln!(out, "{} Working directory matches snapshot.", "✓".green().bold());
    } else {
        let _ = writeln!(out, "\n{} change(s)", results.total_changes().to_string().bold());
    }
    let _ = writeln!(
        out,
        "{}",
        format!(
            "{} directories, {} files compared; {} unchanged subtrees skipped",
            summary.directories_compared, summary.files_compared, summary.unchanged_subtrees
        )
        .dimmed()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn path(p: &str) -> RelativePath {
        RelativePath::parse(p).unwrap()
    }

    #[test]
    fn render_lists_every_category() {
        colored::control::set_override(false);
        let mut results = DiffResults::new();
        results.modified.insert(path("src/lib.rs"));
        results.removed.insert(path("old.txt"));
        results.untracked.insert(path("new.txt"));
        results.ignored.insert(path("target/out"));
        results.errors.push((path("broken"), "object not found".into()));

        let text = render_text(&results, &DiffSummary::default());
        assert!(text.contains("modified:  src/lib.rs"));
        assert!(text.contains("removed:   old.txt"));
        assert!(text.contains("untracked: new.txt"));
        assert!(text.contains("ignored:   target/out"));
        assert!(text.contains("broken: object not found"));
        assert!(text.contains("3 change(s)"));
    }

    #[test]
    fn render_clean() {
        colored::control::set_override(false);
        let text = render_text(&DiffResults::new(), &DiffSummary::default());
        assert!(text.contains("matches snapshot"));
    }

    #[test]
    fn config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vdiff.toml");
        std::fs::write(&file, "load_policy = \"lazy\"\nmax_concurrent_loads = 8\nreport_ignored = false\n").unwrap();
        let config = load_config(Some(&file)).unwrap();
        assert_eq!(config.max_concurrent_loads, 8);
        assert!(!config.report_ignored);
        assert_eq!(config.metadata_dirs, DiffConfig::default().metadata_dirs);

        assert_eq!(load_config(None).unwrap(), DiffConfig::default());
        std::fs::write(&file, "max_concurrent_loads = \"many\"\n").unwrap();
        assert!(load_config(Some(&file)).is_err());
    }

    #[test]
    fn gitignore_in_workdir_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let ignore = load_ignore(dir.path(), None).unwrap();
        assert!(!ignore.is_ignored(&path("a.log"), vdiff_diff::EntryKind::File));

        write(dir.path(), ".gitignore", "*.log\n");
        let ignore = load_ignore(dir.path(), None).unwrap();
        assert!(ignore.is_ignored(&path("a.log"), vdiff_diff::EntryKind::File));

        assert!(load_ignore(dir.path(), Some(&dir.path().join("missing"))).is_err());
    }

    #[tokio::test]
    async fn compare_directories() {
        let base = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        for root in [base.path(), work.path()] {
            write(root, "src/main.rs", "fn main() {}\n");
            write(root, "README", "readme\n");
        }
        write(work.path(), "src/main.rs", "fn main() { todo!() }\n");
        write(work.path(), "notes.txt", "notes\n");
        write(base.path(), "LICENSE", "Apache-2.0\n");

        let store = Arc::new(InMemoryObjectStore::new());
        let config = DiffConfig::default();
        let root = snapshot_directory(Arc::clone(&store), base.path().to_path_buf(), &config)
            .await
            .unwrap();
        let engine = DiffEngine::new(
            Arc::new(FsWorkingTree::new(work.path())),
            Arc::new(StoreReferenceTree::new(store)),
        );
        let (results, _) = engine.diff_to_results(&RelativePath::root(), Some(&root)).await.unwrap();
        assert_eq!(results.modified.iter().collect::<Vec<_>>(), [&path("src/main.rs")]);
        assert_eq!(results.untracked.iter().collect::<Vec<_>>(), [&path("notes.txt")]);
        assert_eq!(results.removed.iter().collect::<Vec<_>>(), [&path("LICENSE")]);
    }

    #[tokio::test]
    async fn compare_command_runs_end_to_end() {
        let base = tempfile::tempdir().unwrap();
        write(base.path(), "a.txt", "a\n");
        let args = CompareArgs {
            workdir: base.path().to_path_buf(),
            snapshot: base.path().to_path_buf(),
            ignore_file: None,
            no_ignored: false,
            config: None,
        };
        cmd_compare(args, OutputFormat::Json).await.unwrap();
    }

    #[tokio::test]
    async fn missing_snapshot_fails() {
        let work = tempfile::tempdir().unwrap();
        let args = CompareArgs {
            workdir: work.path().to_path_buf(),
            snapshot: work.path().join("does-not-exist"),
            ignore_file: None,
            no_ignored: false,
            config: None,
        };
        assert!(cmd_compare(args, OutputFormat::Text).await.is_err());
    }
}
