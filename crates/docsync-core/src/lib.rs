//! Core pipeline for syncing a working tree to remote folders.
//!
//! This crate defines what a run does, independent of the remote provider:
//! - `ChangeSetResolver`: full scan or files changed between two revisions
//! - `ScopeFilter`: include/exclude glob filtering
//! - `mapping::resolve`: longest-prefix routing to a destination folder
//! - `DeliverySession`: credential handling around a `DeliveryTransport`
//! - `UploadOrchestrator`: drives a run and tallies a `RunOutcome`

mod auth;
mod changes;
mod config;
mod convert;
mod delivery;
mod error;
pub mod filter;
pub mod mapping;
mod orchestrator;
pub mod path;
mod pattern;
mod transport;

#[cfg(test)]
mod test_support;

pub use auth::{AuthProvider, DeliveryCredential};
pub use changes::{
    parse_name_status, scan_working_tree, ChangeDetector, ChangeKind, ChangeSet,
    ChangeSetResolver, ChangedPath, GitChangeDetector, RunContext, ScanMode,
};
pub use config::{SyncConfig, DEFAULT_INCLUDE_PATTERN};
pub use convert::{Converter, PandocConverter};
pub use delivery::DeliverySession;
pub use error::{
    AuthError, ChangeDetectionError, ConversionError, DeliveryError, PatternError, Result,
    SyncError, TransportError,
};
pub use filter::ScopeFilter;
pub use mapping::{MappingEntry, MappingTable, ResolvedDestination};
pub use orchestrator::{
    FailedFile, RunOutcome, UploadOrchestrator, UploadedFile, DEFAULT_CONCURRENCY,
};
pub use pattern::{compile_pattern, CompiledPatterns, PatternSet};
pub use transport::{DeliveryTransport, PutOutcome};
