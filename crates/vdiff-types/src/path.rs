//! Repository-relative paths.
//!
//! A [`RelativePath`] names an entry relative to the root of a tree. The root
//! itself is the empty path. Components are joined with `/` and must be
//! non-empty, must not be `.` or `..`, and must not contain `/` or NUL.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A `/`-separated path relative to a tree root.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativePath(String);

impl RelativePath {
    /// The root path (empty).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse and validate a `/`-separated path. Leading and trailing slashes
    /// are not accepted; the empty string is the root.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        for component in s.split('/') {
            validate_component(s, component)?;
        }
        Ok(Self(s.to_string()))
    }

    /// Append a single component. The caller guarantees `name` is a valid
    /// component; use [`RelativePath::try_join`] for untrusted input.
    pub fn join(&self, name: &str) -> Self {
        debug_assert!(
            validate_component(name, name).is_ok(),
            "invalid path component {name:?}"
        );
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    pub fn try_join(&self, name: &str) -> Result<Self, TypeError> {
        validate_component(name, name)?;
        Ok(self.join(name))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty())
    }

    /// The last component, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit('/').next()
        }
    }

    /// Resolve against a filesystem directory.
    pub fn to_fs_path(&self, base: &Path) -> PathBuf {
        self.components().fold(base.to_path_buf(), |acc, c| acc.join(c))
    }
}

fn validate_component(path: &str, component: &str) -> Result<(), TypeError> {
    let invalid = component.is_empty()
        || component == "."
        || component == ".."
        || component.contains('/')
        || component.contains('\0');
    if invalid {
        return Err(TypeError::InvalidPathComponent {
            path: path.to_string(),
            component: component.to_string(),
        });
    }
    Ok(())
}

impl fmt::Debug for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelativePath({:?})", self.0)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("/")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
