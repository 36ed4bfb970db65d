//! Optional document conversion before delivery.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::ConversionError;
use crate::path;

/// External conversion step: one input file in, one output file out.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Extension of the files this converter produces, without the dot.
    fn target_extension(&self) -> &str;

    /// Convert `input` (whose normalized relative path is `relative`) and
    /// return the path of the produced file.
    async fn convert(&self, input: &Path, relative: &str) -> Result<PathBuf, ConversionError>;
}

/// Runs `pandoc <input> -o <staging>/<relative>.<ext>`.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: String,
    staging_dir: PathBuf,
    extension: String,
}

impl PandocConverter {
    pub fn new(staging_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            program: "pandoc".to_string(),
            staging_dir: staging_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn output_path(&self, relative: &str) -> PathBuf {
        self.staging_dir
            .join(path::with_extension(relative, &self.extension))
    }
}

#[async_trait]
impl Converter for PandocConverter {
    fn target_extension(&self) -> &str {
        &self.extension
    }

    #[instrument(skip(self), level = "debug")]
    async fn convert(&self, input: &Path, relative: &str) -> Result<PathBuf, ConversionError> {
        let output = self.output_path(relative);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConversionError::Output {
                    output: output.clone(),
                    source,
                })?;
        }

        let result = Command::new(&self.program)
            .arg(input)
            .arg("-o")
            .arg(&output)
            .output()
            .await
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(ConversionError::Failed {
                input: input.to_path_buf(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        debug!("Converted {} -> {}", input.display(), output.display());
        Ok(output)
    }
}
