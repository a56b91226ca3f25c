//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare tutti gli errori possibili
//! - Distingue errori a livello di messaggio (fatali solo per quel messaggio)
//!   da errori a livello di parte (mai fatali, la parte resta invariata)
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Load` / `Save`: Il messaggio non può essere letto o scritto (livello messaggio)
//! - `PartCompression`: Un compressore non riesce a elaborare una parte
//! - `OptimizationFailed`: qpdf ha fallito senza produrre output
//! - `UnsupportedFormat`: Non è un errore vero, la parte resta invariata
//! - `Timeout`: Il task della parte ha superato il tempo massimo
//! - `MissingDependency`: Tool esterno mancante (qpdf)
//! - `Validation`: Errori di validazione input
//!
//! ## Esempio:
//! ```rust,ignore
//! if engine.is_none() {
//!     return Err(CompressError::MissingDependency("qpdf".to_string()));
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for attachment compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to load email {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Failed to save processed email {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error processing {part}: {reason}")]
    PartCompression { part: String, reason: String },

    #[error("qpdf could not optimize the document: {0}")]
    OptimizationFailed(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The part's result was discarded; a codec already running on the blocking
    /// pool still runs to completion, only a qpdf child is killed
    #[error("Part processing timed out after {0}s")]
    Timeout(u64),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl CompressError {
    /// Message-level failures abort a single message, never the batch
    pub fn is_message_level(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Save { .. })
    }
}
