//! Include/exclude scope filtering.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::PatternError;
use crate::path;
use crate::pattern::{CompiledPatterns, PatternSet};

/// Include/exclude filter compiled once per run.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    include: CompiledPatterns,
    exclude: CompiledPatterns,
}

impl ScopeFilter {
    pub fn new(include: &PatternSet, exclude: &PatternSet) -> Self {
        Self {
            include: include.compile(),
            exclude: exclude.compile(),
        }
    }

    /// True if `path` matches at least one include and no exclude pattern.
    pub fn is_in_scope(&self, path: &str) -> bool {
        if !self.include.is_match(path) {
            trace!("{} matches no include pattern", path);
            return false;
        }
        if let Some(pattern) = self.exclude.first_match(path) {
            debug!("{} excluded by '{}'", path, pattern);
            return false;
        }
        true
    }

    /// Keep in-scope candidates without duplicates, in first-seen order.
    /// Matching and duplicate detection use the normalized form, but each
    /// returned string is the candidate as given, so the output is always a
    /// subset of `candidates`.
    pub fn apply<I, S>(&self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for candidate in candidates {
            let candidate = candidate.as_ref();
            let normalized = path::normalize(candidate);
            if normalized.is_empty() || seen.contains(&normalized) {
                continue;
            }
            if self.is_in_scope(&normalized) {
                seen.insert(normalized);
                out.push(candidate.to_string());
            }
        }

        out
    }

    /// Patterns that failed to compile on either side.
    pub fn diagnostics(&self) -> Vec<PatternError> {
        self.include
            .errors()
            .chain(self.exclude.errors())
            .cloned()
            .collect()
    }
}

/// One-shot form of [`ScopeFilter::apply`].
pub fn apply<I, S>(candidates: I, include: &PatternSet, exclude: &PatternSet) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ScopeFilter::new(include, exclude).apply(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(p: &[&str]) -> PatternSet {
        PatternSet::new(p.iter().copied())
    }

    #[test]
    fn test_draft_directory_excluded() {
        let out = apply(
            ["notes/draft/x.md", "notes/final.md"],
            &patterns(&["**/*.md"]),
            &patterns(&["**/draft/**"]),
        );
        assert_eq!(out, vec!["notes/final.md"]);
    }

    #[test]
    fn test_duplicates_removed_first_seen_order() {
        let out = apply(
            ["b.md", "a.md", "b.md", "./a.md", "c.md"],
            &patterns(&["**/*.md", "*.md"]),
            &PatternSet::default(),
        );
        assert_eq!(out, vec!["b.md", "a.md", "c.md"]);
    }

    #[test]
    fn test_returns_candidates_as_given() {
        let out = apply(
            ["./a.md", "a.md", "docs//b.md"],
            &patterns(&["**/*.md"]),
            &PatternSet::default(),
        );
        assert_eq!(out, vec!["./a.md", "docs//b.md"]);
    }

    #[test]
    fn test_requires_an_include_match() {
        let out = apply(
            ["a.md", "b.txt"],
            &PatternSet::default(),
            &PatternSet::default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_malformed_patterns_do_not_abort() {
        let filter = ScopeFilter::new(&patterns(&["[", "**/*.md"]), &patterns(&["docs/{"]));
        let out = filter.apply(["docs/a.md", "b.txt"]);
        assert_eq!(out, vec!["docs/a.md"]);
        assert_eq!(filter.diagnostics().len(), 2);
    }

    #[test]
    fn test_output_is_subset_and_satisfies_patterns() {
        let include = patterns(&["docs/**/*.md", "*.txt"]);
        let exclude = patterns(&["**/internal/**", "**/*.tmp.md"]);
        let candidates = [
            "docs/a.md",
            "docs/internal/b.md",
            "docs/c.tmp.md",
            "notes.txt",
            "sub/notes.txt",
            "docs/a.md",
            "docs/deep/d.md",
        ];

        let filter = ScopeFilter::new(&include, &exclude);
        let out = filter.apply(candidates);

        assert_eq!(out, vec!["docs/a.md", "notes.txt", "docs/deep/d.md"]);
        let compiled_inc = include.compile();
        let compiled_exc = exclude.compile();
        for path in &out {
            assert!(candidates.contains(&path.as_str()));
            assert!(compiled_inc.is_match(path));
            assert!(!compiled_exc.is_match(path));
        }
    }
}
