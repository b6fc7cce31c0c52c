//! Gitignore-syntax ignore rules.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use vdiff_diff::{EntryKind, IgnoreOracle};
use vdiff_types::RelativePath;

use crate::error::{WorkdirError, WorkdirResult};

/// [`IgnoreOracle`] backed by gitignore patterns.
///
/// A path is ignored when it or any of its ancestor directories matches, so
/// an untracked file below a tracked but ignored directory is still ignored.
#[derive(Clone, Debug)]
pub struct GitignoreOracle {
    matcher: Gitignore,
}

impl GitignoreOracle {
    /// Build from pattern lines, as they would appear in a `.gitignore` at
    /// the tree root.
    pub fn from_patterns<'a>(lines: impl IntoIterator<Item = &'a str>) -> WorkdirResult<Self> {
        let mut builder = GitignoreBuilder::new("");
        for line in lines {
            builder
                .add_line(None, line)
                .map_err(|e| WorkdirError::Ignore(e.to_string()))?;
        }
        Self::build(builder)
    }

    /// Load patterns from a file. Patterns are anchored at the tree root.
    pub fn from_file(path: &Path) -> WorkdirResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_patterns(contents.lines())
    }

    fn build(builder: GitignoreBuilder) -> WorkdirResult<Self> {
        let matcher = builder.build().map_err(|e| WorkdirError::Ignore(e.to_string()))?;
        Ok(Self { matcher })
    }

    /// Number of patterns, including whitelist (`!`) patterns.
    pub fn len(&self) -> usize {
        self.matcher.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }
}

impl IgnoreOracle for GitignoreOracle {
    fn is_ignored(&self, path: &RelativePath, kind: EntryKind) -> bool {
        self.matcher
            .matched_path_or_any_parents(Path::new(path.as_str()), kind == EntryKind::Directory)
            .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> RelativePath {
        RelativePath::parse(s).unwrap()
    }

    #[test]
    fn glob_and_directory_patterns() {
        let oracle = GitignoreOracle::from_patterns(["*.o", "build/", "# comment", ""]).unwrap();
        assert_eq!(oracle.len(), 2);
        assert!(oracle.is_ignored(&p("main.o"), EntryKind::File));
        assert!(oracle.is_ignored(&p("src/util.o"), EntryKind::File));
        assert!(oracle.is_ignored(&p("build"), EntryKind::Directory));
        assert!(!oracle.is_ignored(&p("build"), EntryKind::File));
        assert!(!oracle.is_ignored(&p("src/main.rs"), EntryKind::File));
    }

    #[test]
    fn ignored_directory_covers_descendants() {
        let oracle = GitignoreOracle::from_patterns(["build/"]).unwrap();
        assert!(oracle.is_ignored(&p("build/new.o"), EntryKind::File));
        assert!(oracle.is_ignored(&p("build/deep/out"), EntryKind::Directory));
        assert!(!oracle.is_ignored(&p("src/build.rs"), EntryKind::File));
    }

    #[test]
    fn whitelist_overrides() {
        let oracle = GitignoreOracle::from_patterns(["*.log", "!keep.log"]).unwrap();
        assert!(oracle.is_ignored(&p("debug.log"), EntryKind::File));
        assert!(!oracle.is_ignored(&p("keep.log"), EntryKind::File));
    }

    #[test]
    fn anchored_pattern() {
        let oracle = GitignoreOracle::from_patterns(["/target"]).unwrap();
        assert!(oracle.is_ignored(&p("target"), EntryKind::Directory));
        assert!(!oracle.is_ignored(&p("sub/target"), EntryKind::Directory));
    }

    #[test]
    fn from_file_reads_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(".gitignore");
        std::fs::write(&file, "*.tmp\nout/\n").unwrap();
        let oracle = GitignoreOracle::from_file(&file).unwrap();
        assert!(oracle.is_ignored(&p("a/b.tmp"), EntryKind::File));
        assert!(oracle.is_ignored(&p("out"), EntryKind::Directory));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitignoreOracle::from_file(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, WorkdirError::Io(_)));
    }
}
