//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output: `name.eml` → `<output>/name_compressed.eml`.

use crate::error::CompressError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix appended to the input stem
pub const OUTPUT_SUFFIX: &str = "_compressed";

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Output file name for an input message
    pub fn output_file_name(input_path: &Path) -> Result<String, CompressError> {
        let file_stem = input_path
            .file_stem()
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| CompressError::Validation(format!("Invalid file name: {}", input_path.display())))?
            .to_string_lossy();
        Ok(format!("{}{}.eml", file_stem, OUTPUT_SUFFIX))
    }

    /// Full output path inside `output_dir`
    pub fn get_output_path(input_path: &Path, output_dir: &Path) -> Result<PathBuf, CompressError> {
        let result = output_dir.join(Self::output_file_name(input_path)?);
        debug!("Resolved output path: {} -> {}", input_path.display(), result.display());
        Ok(result)
    }

    /// Crea la directory di output se necessario
    pub async fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create output directory {}: {}", dir.display(), e))
    }
}
