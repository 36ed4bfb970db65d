//! End-to-end run: change set, scope, routing, delivery, tally.

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::changes::{ChangeDetector, ChangeSetResolver, RunContext, ScanMode};
use crate::config::SyncConfig;
use crate::convert::Converter;
use crate::delivery::DeliverySession;
use crate::filter::ScopeFilter;
use crate::mapping::{self, ResolvedDestination};
use crate::path;
use crate::transport::PutOutcome;

/// Deliveries in flight when no concurrency is configured.
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: String,
    pub destination_id: String,
    pub outcome: PutOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub path: String,
    pub reason: String,
}

/// Aggregate result of a run. Every in-scope path lands in exactly one of
/// `uploads`, `skipped_paths` or `failures`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub mode: ScanMode,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub uploads: Vec<UploadedFile>,
    pub skipped_paths: Vec<String>,
    pub failures: Vec<FailedFile>,
}

impl RunOutcome {
    fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            uploaded: 0,
            skipped: 0,
            failed: 0,
            uploads: Vec::new(),
            skipped_paths: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn record(&mut self, report: FileReport) {
        match report.status {
            FileStatus::Uploaded {
                destination_id,
                outcome,
            } => {
                self.uploaded += 1;
                self.uploads.push(UploadedFile {
                    path: report.path,
                    destination_id,
                    outcome,
                });
            }
            FileStatus::Skipped => {
                self.skipped += 1;
                self.skipped_paths.push(report.path);
            }
            FileStatus::Failed(reason) => {
                self.failed += 1;
                self.failures.push(FailedFile {
                    path: report.path,
                    reason,
                });
            }
        }
    }

    fn finish(mut self) -> Self {
        self.uploads.sort_by(|a, b| a.path.cmp(&b.path));
        self.skipped_paths.sort();
        self.failures.sort_by(|a, b| a.path.cmp(&b.path));
        self
    }

    pub fn total(&self) -> usize {
        self.uploaded + self.skipped + self.failed
    }

    /// A run fails only when at least one file failed outright.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug)]
enum FileStatus {
    Uploaded {
        destination_id: String,
        outcome: PutOutcome,
    },
    Skipped,
    Failed(String),
}

#[derive(Debug)]
struct FileReport {
    path: String,
    status: FileStatus,
}

pub struct UploadOrchestrator<D: ChangeDetector> {
    config: SyncConfig,
    resolver: ChangeSetResolver<D>,
    session: DeliverySession,
    converter: Option<Arc<dyn Converter>>,
    concurrency: usize,
}

impl<D: ChangeDetector> UploadOrchestrator<D> {
    pub fn new(config: SyncConfig, resolver: ChangeSetResolver<D>, session: DeliverySession) -> Self {
        Self {
            config,
            resolver,
            session,
            converter: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Convert every in-scope file before delivering it.
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Maximum number of deliveries in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn run(&self, context: &RunContext) -> RunOutcome {
        let scope = ScopeFilter::new(&self.config.include, &self.config.exclude);
        for diagnostic in scope.diagnostics() {
            warn!("{}", diagnostic);
        }

        let change_set = self.resolver.resolve(context, &scope).await;
        let in_scope = scope.apply(&change_set.paths);
        info!(
            "{} file(s) in scope, delivering with concurrency {}",
            in_scope.len(),
            self.concurrency
        );

        let reports: Vec<FileReport> = stream::iter(in_scope)
            .map(|path| self.process(path))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut outcome = RunOutcome::new(change_set.mode);
        for report in reports {
            outcome.record(report);
        }
        let outcome = outcome.finish();

        info!(
            "Run complete: {} uploaded, {} skipped, {} failed",
            outcome.uploaded, outcome.skipped, outcome.failed
        );
        outcome
    }

    async fn process(&self, rel: String) -> FileReport {
        let status = self.deliver_one(&rel).await;
        FileReport { path: rel, status }
    }

    async fn deliver_one(&self, rel: &str) -> FileStatus {
        let routed = match &self.converter {
            Some(converter) => path::with_extension(rel, converter.target_extension()),
            None => rel.to_string(),
        };

        let destination_id = match mapping::resolve(&routed, &self.config.mappings) {
            ResolvedDestination::Mapped {
                destination_id,
                matched_prefix,
            } => {
                debug!("{} -> {} (prefix '{}')", rel, destination_id, matched_prefix);
                destination_id
            }
            ResolvedDestination::Unmapped => {
                info!("Skipping {}: no mapping matches", rel);
                return FileStatus::Skipped;
            }
        };

        let source = self.resolver.workdir().join(rel);
        let local: PathBuf = match &self.converter {
            Some(converter) => match converter.convert(&source, rel).await {
                Ok(out) => out,
                Err(e) => {
                    error!("Conversion failed for {}: {}", rel, e);
                    return FileStatus::Failed(e.to_string());
                }
            },
            None => source,
        };

        let file_name = path::file_name(&routed);
        match self.session.deliver(&local, &destination_id, file_name).await {
            Ok(outcome) => {
                info!("Uploaded {} to {} ({})", rel, destination_id, outcome.label());
                FileStatus::Uploaded {
                    destination_id,
                    outcome,
                }
            }
            Err(e) => {
                error!("Upload failed for {}: {}", rel, e);
                FileStatus::Failed(e.to_string())
            }
        }
    }
}
