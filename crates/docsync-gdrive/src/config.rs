use std::path::PathBuf;

use clap::Parser;
use docsync_core::DEFAULT_CONCURRENCY;

/// Configuration for the docsync-gdrive uploader.
#[derive(Parser, Debug, Clone)]
#[command(name = "docsync-gdrive")]
#[command(about = "Upload changed documents from a repository to Google Drive folders")]
pub struct Config {
    /// Google OAuth2 Client ID (for token refresh)
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: String,

    /// Google OAuth2 Client Secret (for token refresh)
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: String,

    /// Long-lived Google OAuth2 refresh token
    #[arg(long, env = "GOOGLE_REFRESH_TOKEN", hide_env_values = true)]
    pub google_refresh_token: String,

    /// Mapping document (folder routing and scope patterns)
    #[arg(long, default_value = ".github/docsync.yml", env = "DOCSYNC_CONFIG")]
    pub config_path: PathBuf,

    /// Repository working tree to sync
    #[arg(long, default_value = ".", env = "DOCSYNC_WORKDIR")]
    pub workdir: PathBuf,

    /// Maximum number of files delivered at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, env = "DOCSYNC_CONCURRENCY")]
    pub concurrency: usize,

    /// Name of the GitHub Actions event that triggered the run
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    pub event_name: Option<String>,

    /// Path to the GitHub Actions event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: Option<PathBuf>,

    /// Base revision, overrides the event payload
    #[arg(long)]
    pub base_ref: Option<String>,

    /// Head revision, overrides the event payload
    #[arg(long)]
    pub head_ref: Option<String>,

    /// Upload every in-scope file regardless of the event
    #[arg(long)]
    pub full_scan: bool,

    /// Convert files with pandoc to this extension before upload (e.g. docx)
    #[arg(long)]
    pub convert_to: Option<String>,

    /// pandoc executable used for conversion
    #[arg(long, default_value = "pandoc", env = "PANDOC_PATH")]
    pub pandoc_path: String,

    /// Directory for converted outputs (defaults to a temp directory)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Per-request timeout for Google Drive calls (seconds)
    #[arg(long, default_value = "120", env = "DOCSYNC_HTTP_TIMEOUT")]
    pub http_timeout_secs: u64,

    /// File receiving the Markdown job summary
    #[arg(long, env = "GITHUB_STEP_SUMMARY")]
    pub step_summary: Option<PathBuf>,
}
