//! # Part Dispatcher Module
//!
//! Sceglie il compressore per ogni foglia e incapsula il task concorrente della parte.
//!
//! ## Regole (in ordine di priorità, case-insensitive):
//! 1. type `image` → `Compressor::Image`
//! 2. `application/pdf` → `Compressor::Pdf`
//! 3. `application/zip` o `application/x-zip-compressed` → `Compressor::Archive`
//! 4. altrimenti nessun compressore
//!
//! ## Task della parte:
//! - Lavora su una copia del contenuto (l'albero non viene toccato durante l'elaborazione)
//! - Codec CPU-bound in `spawn_blocking`, qpdf come processo figlio asincrono
//! - Limitato da `part_timeout`; allo scadere la parte resta invariata
//!   (i codec in `spawn_blocking` non vengono interrotti, il loro risultato viene scartato)
//! - Restituisce un `PartOutcome` che il `MessageProcessor` applica dopo il join

use crate::archive_processor::ArchiveRepacker;
use crate::config::{Config, IMAGE_QUALITY};
use crate::error::CompressError;
use crate::image_processor::ImageRecompressor;
use crate::message::{Leaf, LeafUpdate, NodePath};
use crate::pdf_processor::PdfOptimizer;
use crate::utils::replace_extension;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, info};

/// Compressor selected for a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compressor {
    Image,
    Pdf,
    Archive,
}

impl Compressor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Archive => "zip",
        }
    }
}

/// Pure classification of declared media types
pub struct PartDispatcher;

impl PartDispatcher {
    pub fn select(media_type: &str, media_subtype: &str) -> Option<Compressor> {
        if media_type.eq_ignore_ascii_case("image") {
            return Some(Compressor::Image);
        }
        if !media_type.eq_ignore_ascii_case("application") {
            return None;
        }

        let subtype = media_subtype.to_ascii_lowercase();
        match subtype.as_str() {
            "pdf" => Some(Compressor::Pdf),
            "zip" | "x-zip-compressed" => Some(Compressor::Archive),
            _ => None,
        }
    }

    pub fn select_leaf(leaf: &Leaf) -> Option<Compressor> {
        Self::select(leaf.media_type(), leaf.media_subtype())
    }
}

/// Shared, read-only state for every part task of a run
#[derive(Debug, Clone)]
pub struct PartContext {
    pub pdf_optimizer: PdfOptimizer,
    pub part_timeout: Duration,
}

impl PartContext {
    pub fn new(pdf_optimizer: PdfOptimizer, part_timeout: Duration) -> Self {
        Self {
            pdf_optimizer,
            part_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(PdfOptimizer::new(config), config.part_timeout())
    }
}

/// Result of one part task, addressed back to its leaf
#[derive(Debug)]
pub struct PartOutcome {
    pub path: NodePath,
    pub label: String,
    pub compressor: Compressor,
    /// `Ok(None)` leaves the part unchanged
    pub result: Result<Option<LeafUpdate>, CompressError>,
}

/// One leaf bound to one compressor
#[derive(Debug, Clone)]
pub struct CompressionTask {
    path: NodePath,
    compressor: Compressor,
    label: String,
    filename: Option<String>,
    content: Vec<u8>,
}

impl CompressionTask {
    pub fn new(path: NodePath, leaf: &Leaf, compressor: Compressor) -> Self {
        let label = leaf.label(&format!("part {}", path));
        Self {
            path,
            compressor,
            label,
            filename: leaf.filename().map(str::to_string),
            content: leaf.content().to_vec(),
        }
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn compressor(&self) -> Compressor {
        self.compressor
    }

    /// Runs the compressor under the part timeout.
    ///
    /// On expiry the qpdf child is dropped and killed. Image and archive codecs
    /// run on the blocking pool and cannot be interrupted: they finish in the
    /// background and their result is ignored.
    pub async fn run(self, context: Arc<PartContext>) -> PartOutcome {
        let Self {
            path,
            compressor,
            label,
            filename,
            content,
        } = self;

        let work = Self::compress(compressor, &label, filename, content, &context);
        let result = match tokio::time::timeout(context.part_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(CompressError::Timeout(context.part_timeout.as_secs())),
        };

        PartOutcome {
            path,
            label,
            compressor,
            result,
        }
    }

    async fn compress(
        compressor: Compressor,
        label: &str,
        filename: Option<String>,
        content: Vec<u8>,
        context: &PartContext,
    ) -> Result<Option<LeafUpdate>, CompressError> {
        match compressor {
            Compressor::Image => {
                let jpeg = tokio::task::spawn_blocking(move || {
                    ImageRecompressor::recompress(&content, IMAGE_QUALITY)
                })
                .await
                .map_err(|e| Self::worker_error(label, e))?;

                match jpeg {
                    Some(jpeg) => {
                        info!("Compressed image: {}", label);
                        Ok(Some(LeafUpdate {
                            content: jpeg,
                            subtype: Some("jpeg".to_string()),
                            filename: filename.map(|name| replace_extension(&name, "jpg")),
                        }))
                    }
                    None => Err(CompressError::UnsupportedFormat(format!(
                        "{} could not be decoded as an image",
                        label
                    ))),
                }
            }
            Compressor::Pdf => {
                let optimized = context.pdf_optimizer.optimize(&content, label).await?;
                info!("Compressed .pdf: {}", label);
                Ok(Some(LeafUpdate {
                    content: optimized,
                    subtype: None,
                    filename: None,
                }))
            }
            Compressor::Archive => {
                let archive_label = label.to_string();
                let repacked = tokio::task::spawn_blocking(move || {
                    ArchiveRepacker::repack(&content, &archive_label)
                })
                .await
                .map_err(|e| Self::worker_error(label, e))??;
                debug!("Repacked .zip: {}", label);
                Ok(Some(LeafUpdate {
                    content: repacked,
                    subtype: None,
                    filename: None,
                }))
            }
        }
    }

    fn worker_error(label: &str, e: JoinError) -> CompressError {
        CompressError::PartCompression {
            part: label.to_string(),
            reason: format!("codec worker aborted: {}", e),
        }
    }
}
