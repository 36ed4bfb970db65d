//! Change-set resolution: which files does this run look at?
//!
//! A run is either a full scan of the working tree or an incremental run that
//! only considers files touched between two revisions. Incremental detection
//! is an optimization; whenever it fails the resolver falls back to a full
//! scan instead of failing the job.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::ChangeDetectionError;
use crate::filter::ScopeFilter;
use crate::path;

/// What triggered the run and what it should compare against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunContext {
    /// Manual run: consider every file in the tree.
    Full,
    /// Compare `base` against `head`. `base == None` means no usable
    /// reference point was supplied.
    Incremental {
        base: Option<String>,
        head: String,
    },
}

impl RunContext {
    pub fn incremental(base: impl Into<String>, head: impl Into<String>) -> Self {
        RunContext::Incremental {
            base: Some(base.into()),
            head: head.into(),
        }
    }
}

/// Kind of change reported for a path between two revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// A single path reported by a change detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    pub path: String,
    pub kind: ChangeKind,
}

/// Source of "what changed between two revisions".
#[async_trait]
pub trait ChangeDetector: Send + Sync {
    async fn changed_paths(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<ChangedPath>, ChangeDetectionError>;
}

/// Change detector backed by `git diff` in the working tree.
#[derive(Debug, Clone)]
pub struct GitChangeDetector {
    workdir: PathBuf,
    program: String,
}

impl GitChangeDetector {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            program: "git".to_string(),
        }
    }

    /// Use a specific git binary instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl ChangeDetector for GitChangeDetector {
    #[instrument(skip(self), level = "debug")]
    async fn changed_paths(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<ChangedPath>, ChangeDetectionError> {
        if is_null_revision(base) {
            return Err(ChangeDetectionError::NoReference);
        }

        // `--relative` reports paths against the working directory and limits
        // the diff to it, matching what a full scan of `workdir` yields.
        // `base...head` diffs from the merge base, so changes that only
        // landed on the base side are not candidates.
        let range = format!("{}...{}", base, head);
        let output = Command::new(&self.program)
            .current_dir(&self.workdir)
            .args([
                "diff",
                "--name-status",
                "-z",
                "--no-renames",
                "--relative",
                &range,
                "--",
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(ChangeDetectionError::Git {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_name_status(&output.stdout)
    }
}

/// A push that creates a branch reports an all-zero "before" SHA.
fn is_null_revision(rev: &str) -> bool {
    let rev = rev.trim();
    rev.is_empty() || rev.bytes().all(|b| b == b'0')
}

/// Parse `git diff --name-status -z --no-renames` output: NUL-separated
/// `status, path` pairs.
pub fn parse_name_status(raw: &[u8]) -> Result<Vec<ChangedPath>, ChangeDetectionError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ChangeDetectionError::Parse(format!("non UTF-8 output: {}", e)))?;
    let mut fields = text.split('\0').filter(|f| !f.is_empty());
    let mut changes = Vec::new();

    while let Some(status) = fields.next() {
        let path = fields
            .next()
            .ok_or_else(|| ChangeDetectionError::Parse(format!("status '{}' without a path", status)))?;
        let kind = match status.chars().next() {
            Some('A') | Some('C') => ChangeKind::Added,
            Some('M') | Some('T') => ChangeKind::Modified,
            Some('D') => ChangeKind::Deleted,
            _ => {
                return Err(ChangeDetectionError::Parse(format!(
                    "unexpected status '{}' for {}",
                    status, path
                )))
            }
        };
        changes.push(ChangedPath {
            path: path::normalize(path),
            kind,
        });
    }

    Ok(changes)
}

/// Every regular file under `root` as a normalized relative path, skipping
/// the `.git` directory.
pub fn scan_working_tree(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git")
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Skipping unreadable entry during scan: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| path::relative_to(root, e.path()))
        .collect()
}

/// Resolution strategy actually used for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    FullScan,
    Incremental,
}

/// Candidate set together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub mode: ScanMode,
    pub paths: BTreeSet<String>,
}

/// Produces the candidate files for a run.
pub struct ChangeSetResolver<D: ChangeDetector> {
    workdir: PathBuf,
    detector: D,
}

impl<D: ChangeDetector> ChangeSetResolver<D> {
    pub fn new(workdir: impl Into<PathBuf>, detector: D) -> Self {
        Self {
            workdir: workdir.into(),
            detector,
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Resolve the in-scope candidate set. Never fails: an incremental run
    /// that cannot be computed degrades to a full scan.
    pub async fn resolve(&self, context: &RunContext, scope: &ScopeFilter) -> ChangeSet {
        if let RunContext::Incremental { base, head } = context {
            match self.incremental(base.as_deref(), head, scope).await {
                Ok(paths) => {
                    info!(
                        "Incremental run: {} in-scope file(s) changed since {}",
                        paths.len(),
                        base.as_deref().unwrap_or_default()
                    );
                    return ChangeSet {
                        mode: ScanMode::Incremental,
                        paths,
                    };
                }
                Err(e) => warn!("Change detection failed ({}), falling back to full scan", e),
            }
        }

        let paths = self.full_scan(scope);
        info!("Full scan: {} in-scope file(s)", paths.len());
        ChangeSet {
            mode: ScanMode::FullScan,
            paths,
        }
    }

    fn full_scan(&self, scope: &ScopeFilter) -> BTreeSet<String> {
        scope
            .apply(scan_working_tree(&self.workdir))
            .into_iter()
            .collect()
    }

    async fn incremental(
        &self,
        base: Option<&str>,
        head: &str,
        scope: &ScopeFilter,
    ) -> Result<BTreeSet<String>, ChangeDetectionError> {
        let base = base.ok_or(ChangeDetectionError::NoReference)?;
        let changes = self.detector.changed_paths(base, head).await?;

        let readable = changes.into_iter().filter_map(|c| {
            if c.kind == ChangeKind::Deleted {
                debug!("{} was deleted, nothing to upload", c.path);
                return None;
            }
            if !self.workdir.join(&c.path).is_file() {
                debug!("{} is not a file in the working tree, ignoring", c.path);
                return None;
            }
            Some(c.path)
        });

        Ok(scope.apply(readable).into_iter().collect())
    }
}
