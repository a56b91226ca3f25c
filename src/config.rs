//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di esecuzione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Espone le costanti di compressione fisse (non configurabili)
//!
//! ## Parametri di configurazione:
//! - `output_path`: Directory di output (default: None = `../output` accanto alla cartella input)
//! - `part_timeout_secs`: Tempo massimo per il task di una singola parte (default: 300)
//! - `scratch_dir`: Directory per i file temporanei di qpdf (default: `<tmp>/compress-eml-file`)
//! - `qpdf_path`: Percorso esplicito dell'eseguibile qpdf (default: None = risoluzione automatica)
//! - `json_output`: Output JSON per uso programmatico (default: false)
//!
//! ## Costanti fisse:
//! - `IMAGE_QUALITY`: Qualità JPEG di ricompressione (75)
//! - `COMPRESSION_LEVEL`: Livello di compressione zip/PDF (9, massimo)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     part_timeout_secs: 60,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// JPEG quality used for every image re-encode
pub const IMAGE_QUALITY: u8 = 75;

/// Deflate level for rebuilt archives and PDF streams
pub const COMPRESSION_LEVEL: i32 = 9;

/// Name of the shared scratch directory under the system temp dir
pub const SCRATCH_DIR_NAME: &str = "compress-eml-file";

/// Configuration for a compression run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output directory for compressed messages (None = sibling `output/` of the input dir)
    pub output_path: Option<PathBuf>,
    /// Upper bound for a single part task, in seconds
    pub part_timeout_secs: u64,
    /// Scratch directory for PDF optimization (None = system temp dir)
    pub scratch_dir: Option<PathBuf>,
    /// Explicit qpdf executable (None = resolve from environment and PATH)
    pub qpdf_path: Option<PathBuf>,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: None,
            part_timeout_secs: 300,
            scratch_dir: None,
            qpdf_path: None,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.part_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Part timeout must be greater than 0 seconds"));
        }

        if let Some(ref output_path) = self.output_path {
            if output_path.exists() && !output_path.is_dir() {
                return Err(anyhow::anyhow!("Output path is not a directory: {}", output_path.display()));
            }
        }

        if let Some(ref qpdf_path) = self.qpdf_path {
            if !qpdf_path.is_file() {
                return Err(anyhow::anyhow!("qpdf executable not found: {}", qpdf_path.display()));
            }
        }

        Ok(())
    }

    pub fn part_timeout(&self) -> Duration {
        Duration::from_secs(self.part_timeout_secs)
    }

    /// Scratch root shared by all PDF optimizations of this run
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(SCRATCH_DIR_NAME))
    }

    /// Output directory for an input folder: explicit path, or `output/` next to the folder
    pub fn output_dir_for(&self, input_dir: &Path) -> PathBuf {
        if let Some(ref output_path) = self.output_path {
            return output_path.clone();
        }
        input_dir
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .join("output")
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.part_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.part_timeout_secs = 10;
        config.qpdf_path = Some(PathBuf::from("/definitely/not/here/qpdf"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.part_timeout_secs, 300);
        assert!(config.output_path.is_none());
        assert!(config.qpdf_path.is_none());
        assert!(!config.json_output);
        assert_eq!(IMAGE_QUALITY, 75);
        assert_eq!(COMPRESSION_LEVEL, 9);
    }

    #[test]
    fn test_output_dir_is_sibling_of_input() {
        let config = Config::default();
        assert_eq!(
            config.output_dir_for(Path::new("/data/mails")),
            PathBuf::from("/data/output")
        );
        assert_eq!(config.output_dir_for(Path::new("mails")), PathBuf::from("./output"));

        let explicit = Config {
            output_path: Some(PathBuf::from("/tmp/elsewhere")),
            ..Default::default()
        };
        assert_eq!(explicit.output_dir_for(Path::new("/data/mails")), PathBuf::from("/tmp/elsewhere"));
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            output_path: Some(temp_dir.path().to_path_buf()),
            part_timeout_secs: 42,
            scratch_dir: Some(temp_dir.path().join("scratch")),
            qpdf_path: None,
            json_output: true,
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.output_path, original_config.output_path);
        assert_eq!(loaded_config.part_timeout_secs, 42);
        assert_eq!(loaded_config.scratch_dir, original_config.scratch_dir);
        assert!(loaded_config.json_output);
    }

    #[tokio::test]
    async fn test_missing_config_file_falls_back_to_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.part_timeout_secs, 300);
    }
}
