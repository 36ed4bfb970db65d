//! Mapping document: which local prefixes go to which remote folders, and
//! which files are in scope at all.
//!
//! ```yaml
//! mappings:
//!   docs: 1AbCdEf
//!   docs/api: 1GhIjKl
//! include_patterns:
//!   - "**/*.md"
//! exclude_patterns:
//!   - "**/draft/**"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::mapping::MappingTable;
use crate::pattern::PatternSet;

/// Include pattern used when the document names none.
pub const DEFAULT_INCLUDE_PATTERN: &str = "**/*.md";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default)]
    mappings: BTreeMap<String, String>,
    #[serde(default)]
    include_patterns: Option<Vec<String>>,
    #[serde(default)]
    exclude_patterns: Option<Vec<String>>,
}

/// Validated run configuration. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub mappings: MappingTable,
    pub include: PatternSet,
    pub exclude: PatternSet,
}

impl SyncConfig {
    /// Load and validate a YAML mapping document.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawDocument = serde_yaml::from_str(&text).map_err(|source| SyncError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded mapping document {}", path.display());
        Self::from_raw(raw)
    }

    /// Parse and validate a YAML mapping document held in memory.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_str(text)
            .map_err(|e| SyncError::Config(format!("Invalid mapping document: {}", e)))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDocument) -> Result<Self> {
        let mappings = MappingTable::new(raw.mappings)?;

        let include = match raw.include_patterns {
            Some(patterns) if !patterns.is_empty() => PatternSet::new(patterns),
            _ => PatternSet::new(vec![DEFAULT_INCLUDE_PATTERN.to_string()]),
        };
        let exclude = PatternSet::new(raw.exclude_patterns.unwrap_or_default());

        Ok(Self {
            mappings,
            include,
            exclude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_patterns_absent() {
        let config = SyncConfig::from_yaml("mappings:\n  docs: F1\n").unwrap();
        assert_eq!(config.include.patterns(), ["**/*.md"]);
        assert!(config.exclude.is_empty());
        assert_eq!(config.mappings.len(), 1);
    }

    #[test]
    fn test_empty_include_falls_back_to_default() {
        let config = SyncConfig::from_yaml("mappings:\n  docs: F1\ninclude_patterns: []\n").unwrap();
        assert_eq!(config.include.patterns(), ["**/*.md"]);
    }

    #[test]
    fn test_explicit_patterns_preserve_order() {
        let yaml = r#"
mappings:
  docs: F1
include_patterns:
  - "**/*.txt"
  - "**/*.md"
exclude_patterns:
  - "**/draft/**"
"#;
        let config = SyncConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.include.patterns(), ["**/*.txt", "**/*.md"]);
        assert_eq!(config.exclude.patterns(), ["**/draft/**"]);
    }

    #[test]
    fn test_missing_mappings_is_fatal() {
        let err = SyncConfig::from_yaml("include_patterns: ['**/*.md']\n").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));

        let err = SyncConfig::from_yaml("mappings: {}\n").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = SyncConfig::from_yaml("mappings:\n  docs: F1\nmapping:\n  x: y\n").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncConfig::load(&dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docsync.yml");
        std::fs::write(&path, "mappings:\n  ./docs/: F1\n").unwrap();

        let config = SyncConfig::load(&path).unwrap();
        assert_eq!(config.mappings.entries()[0].prefix(), "docs");
    }
}
