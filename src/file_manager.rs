//! # File Management Module
//!
//! Questo modulo gestisce la discovery dei messaggi e le utilità sulle dimensioni.
//!
//! ## Responsabilità:
//! - Discovery dei file `.eml` nella directory di input (solo primo livello)
//! - Formattazione human-readable delle dimensioni
//! - Calcolo percentuali di riduzione
//!
//! ## Esempio:
//! ```rust,ignore
//! let messages = FileManager::find_eml_files(Path::new("/path/to/mails"))?;
//! for message in messages {
//!     // process message
//! }
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Manages file discovery and size helpers
pub struct FileManager;

impl FileManager {
    /// Find all `.eml` files directly inside `input_dir`, sorted by path
    pub fn find_eml_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(input_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| anyhow::anyhow!("Failed to read {}: {}", input_dir.display(), e))?;
            if entry.file_type().is_file() && Self::is_eml(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }

        Ok(files)
    }

    /// Check if a file is a message (extension matched case-insensitively)
    pub fn is_eml(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("eml"))
            .unwrap_or(false)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
