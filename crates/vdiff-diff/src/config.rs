use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// How the walker treats data that is still loading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPolicy {
    /// Suspend on pending loads.
    #[default]
    Lazy,
    /// Every listing and content identity must already be resident; a
    /// pending load fails the diff with [`EngineError::NotReady`].
    RequireReady,
}

/// Diff engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub load_policy: LoadPolicy,
    /// Report ignored files. When false, ignored directories are not walked.
    pub report_ignored: bool,
    /// Upper bound on pending loads awaited at the same time.
    pub max_concurrent_loads: usize,
    /// Root-level working entries that are never reported.
    pub metadata_dirs: Vec<String>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            load_policy: LoadPolicy::Lazy,
            report_ignored: true,
            max_concurrent_loads: 64,
            metadata_dirs: vec![".git".into(), ".hg".into(), ".vdiff".into()],
        }
    }
}

impl DiffConfig {
    /// Configuration for a fully synchronous diff.
    pub fn require_ready() -> Self {
        Self {
            load_policy: LoadPolicy::RequireReady,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_concurrent_loads == 0 {
            return Err(EngineError::InvalidConfig(
                "max_concurrent_loads must be greater than zero".into(),
            ));
        }
        if let Some(bad) = self
            .metadata_dirs
            .iter()
            .find(|name| name.is_empty() || name.contains('/'))
        {
            return Err(EngineError::InvalidConfig(format!(
                "metadata dir {bad:?} must be a single path component"
            )));
        }
        Ok(())
    }

    pub(crate) fn is_metadata_dir(&self, name: &str) -> bool {
        self.metadata_dirs.iter().any(|m| m == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DiffConfig::default();
        assert_eq!(config.load_policy, LoadPolicy::Lazy);
        assert!(config.report_ignored);
        assert_eq!(config.max_concurrent_loads, 64);
        assert!(config.is_metadata_dir(".git"));
        assert!(!config.is_metadata_dir("src"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_loads_is_invalid() {
        let config = DiffConfig {
            max_concurrent_loads: 0,
            ..DiffConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn nested_metadata_dir_is_invalid() {
        let config = DiffConfig {
            metadata_dirs: vec!["a/b".into()],
            ..DiffConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: DiffConfig =
            serde_json::from_str(r#"{"load_policy":"require-ready","report_ignored":false}"#).unwrap();
        assert_eq!(config.load_policy, LoadPolicy::RequireReady);
        assert!(!config.report_ignored);
        assert_eq!(config.max_concurrent_loads, 64);
        assert_eq!(config.metadata_dirs.len(), 3);
    }
}
