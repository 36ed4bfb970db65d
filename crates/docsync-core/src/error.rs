//! Error types shared by the sync pipeline.

use std::path::PathBuf;

/// Fatal errors. Only configuration problems abort a run; everything that
/// happens to a single file is reported through `RunOutcome` instead.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid mapping document {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A glob pattern that could not be compiled.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid pattern '{pattern}': {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// Why incremental change detection could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ChangeDetectionError {
    #[error("No usable reference point for incremental run")]
    NoReference,

    #[error("Failed to spawn git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git diff exited with {status}: {stderr}")]
    Git { status: String, stderr: String },

    #[error("Unparsable git diff output: {0}")]
    Parse(String),
}

/// Failure of a credential acquisition or refresh.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Authentication failed: {0}")]
pub struct AuthError(pub String);

/// Failure reported by a delivery transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The credential was rejected (expired or revoked).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Remote rejected upload: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl TransportError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Unauthorized(_))
    }
}

/// Why a single file could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Credential rejected after re-authentication: {0}")]
    AuthExpired(String),

    #[error(transparent)]
    Transport(TransportError),
}

/// Failure of the external conversion tool.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Failed to spawn converter {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter exited with {status} for {}: {stderr}", .input.display())]
    Failed {
        input: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("Failed to prepare output for {}: {source}", .output.display())]
    Output {
        output: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;
