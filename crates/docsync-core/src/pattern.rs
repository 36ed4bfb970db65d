//! Glob pattern sets and their compiled matchers.

use globset::{GlobBuilder, GlobMatcher};
use tracing::warn;

use crate::error::PatternError;

/// Ordered list of glob patterns as written in the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<String>,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Compile every pattern. Malformed patterns are kept as errors so they
    /// behave as non-matching and can be reported, instead of failing the set.
    pub fn compile(&self) -> CompiledPatterns {
        let entries = self
            .patterns
            .iter()
            .map(|p| {
                let compiled = compile_pattern(p);
                if let Err(e) = &compiled {
                    warn!("{}; pattern ignored", e);
                }
                (p.clone(), compiled)
            })
            .collect();
        CompiledPatterns { entries }
    }
}

/// Build a matcher for a single glob. `*` does not cross `/`; `**` does.
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher, PatternError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| PatternError {
            pattern: pattern.to_string(),
            message: e.kind().to_string(),
        })
}

/// Compiled form of a `PatternSet`.
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    entries: Vec<(String, Result<GlobMatcher, PatternError>)>,
}

impl CompiledPatterns {
    /// True if any well-formed pattern matches `path`.
    pub fn is_match(&self, path: &str) -> bool {
        self.entries
            .iter()
            .any(|(_, m)| m.as_ref().is_ok_and(|m| m.is_match(path)))
    }

    /// The first well-formed pattern matching `path`, for diagnostics.
    pub fn first_match(&self, path: &str) -> Option<&str> {
        self.entries.iter().find_map(|(p, m)| match m {
            Ok(m) if m.is_match(path) => Some(p.as_str()),
            _ => None,
        })
    }

    /// Patterns that failed to compile.
    pub fn errors(&self) -> impl Iterator<Item = &PatternError> {
        self.entries.iter().filter_map(|(_, m)| m.as_ref().err())
    }
}
