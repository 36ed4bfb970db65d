mod config;
mod event;
mod gdrive;
mod summary;
mod token_manager;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use docsync_core::{
    ChangeSetResolver, DeliverySession, GitChangeDetector, PandocConverter, SyncConfig,
    UploadOrchestrator,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use gdrive::GDriveClient;
use token_manager::TokenManager;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting docsync-gdrive");
    info!("  Working tree: {}", config.workdir.display());
    info!("  Mapping document: {}", config.config_path.display());

    let config_path = if config.config_path.is_absolute() {
        config.config_path.clone()
    } else {
        config.workdir.join(&config.config_path)
    };
    let sync_config = SyncConfig::load(&config_path)
        .with_context(|| format!("Cannot load {}", config_path.display()))?;
    info!("  {} folder mapping(s) loaded", sync_config.mappings.len());

    let context = event::resolve_run_context(&config).await;

    let timeout = Duration::from_secs(config.http_timeout_secs);

    // Token manager (refresh-token grant against Google OAuth2)
    let token_manager = Arc::new(TokenManager::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_refresh_token.clone(),
        timeout,
    )?);

    // Google Drive API client (stateless, tokens provided per-call)
    let gdrive_client = Arc::new(GDriveClient::new(timeout)?);

    let session = DeliverySession::new(token_manager, gdrive_client);
    let resolver = ChangeSetResolver::new(
        config.workdir.clone(),
        GitChangeDetector::new(config.workdir.clone()),
    );

    let mut orchestrator = UploadOrchestrator::new(sync_config, resolver, session)
        .with_concurrency(config.concurrency);

    if let Some(extension) = &config.convert_to {
        let staging = config
            .staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("docsync-convert"));
        info!("  Converting to .{} via {} (staging in {})", extension, config.pandoc_path, staging.display());
        orchestrator = orchestrator.with_converter(Arc::new(
            PandocConverter::new(staging, extension.trim_start_matches('.'))
                .with_program(config.pandoc_path.clone()),
        ));
    }

    let outcome = orchestrator.run(&context).await;

    if let Some(path) = &config.step_summary {
        if let Err(e) = summary::append_summary(path, &outcome).await {
            warn!("Failed to write job summary to {}: {}", path.display(), e);
        }
    }

    for failure in &outcome.failures {
        error!("FAILED {}: {}", failure.path, failure.reason);
    }

    info!(
        "Done: {} uploaded, {} skipped, {} failed ({} total)",
        outcome.uploaded,
        outcome.skipped,
        outcome.failed,
        outcome.total()
    );

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
