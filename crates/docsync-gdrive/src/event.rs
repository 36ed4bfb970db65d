//! Run context from the GitHub Actions event that triggered the job.

use std::path::{Path, PathBuf};

use docsync_core::RunContext;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

const HEAD: &str = "HEAD";

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Cannot read event payload {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid event payload {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub pull_request: Option<PullRequest>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub base: CommitRef,
    pub head: CommitRef,
}

#[derive(Debug, Deserialize)]
pub struct CommitRef {
    #[serde(default)]
    pub sha: Option<String>,
}

/// Events that carry a revision range.
fn is_incremental_event(event_name: &str) -> bool {
    matches!(event_name, "push" | "pull_request" | "pull_request_target")
}

/// Map an event and its payload to a run context. Events without a
/// revision range run in full. A missing SHA leaves `base` unset, which the
/// change-set resolver turns into a full scan.
pub fn context_from_event(event_name: &str, payload: &EventPayload) -> RunContext {
    let (base, head) = match event_name {
        "push" => (payload.before.clone(), payload.after.clone()),
        "pull_request" | "pull_request_target" => match &payload.pull_request {
            Some(pr) => (pr.base.sha.clone(), pr.head.sha.clone()),
            None => (None, None),
        },
        _ => return RunContext::Full,
    };

    RunContext::Incremental {
        base: base.filter(|s| !s.is_empty()),
        head: head
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| HEAD.to_string()),
    }
}

pub async fn load_payload(path: &Path) -> Result<EventPayload, EventError> {
    let raw = tokio::fs::read(path).await.map_err(|source| EventError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| EventError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply `--base-ref` / `--head-ref` on top of the event-derived context.
fn apply_overrides(context: RunContext, base_ref: Option<&str>, head_ref: Option<&str>) -> RunContext {
    match (context, base_ref) {
        (RunContext::Full, None) => RunContext::Full,
        (RunContext::Full, Some(base)) => {
            RunContext::incremental(base, head_ref.unwrap_or(HEAD))
        }
        (RunContext::Incremental { base, head }, base_ref) => RunContext::Incremental {
            base: base_ref.map(str::to_string).or(base),
            head: head_ref.map(str::to_string).unwrap_or(head),
        },
    }
}

/// Decide how this run selects files.
pub async fn resolve_run_context(config: &Config) -> RunContext {
    if config.full_scan {
        info!("Full scan requested");
        return RunContext::Full;
    }

    let event_context = match config.event_name.as_deref() {
        Some(name) if is_incremental_event(name) => {
            let payload = match &config.event_path {
                Some(path) => match load_payload(path).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("{}, no base revision available", e);
                        EventPayload::default()
                    }
                },
                None => {
                    warn!("{} event without GITHUB_EVENT_PATH, no base revision available", name);
                    EventPayload::default()
                }
            };
            context_from_event(name, &payload)
        }
        Some(name) => {
            debug!("Event {} has no revision range", name);
            RunContext::Full
        }
        None => RunContext::Full,
    };

    let context = apply_overrides(
        event_context,
        config.base_ref.as_deref(),
        config.head_ref.as_deref(),
    );
    info!("Run context: {:?}", context);
    context
}
