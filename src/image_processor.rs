//! # Image Recompression Module
//!
//! Questo modulo ricomprime le immagini allegate ai messaggi, interamente in memoria.
//!
//! ## Responsabilità:
//! - Decodifica di un buffer immagine in qualunque formato supportato dal crate `image`
//!   (JPEG, PNG, WebP, GIF, BMP, TIFF)
//! - Ricodifica come JPEG alla qualità fissa `IMAGE_QUALITY` (75)
//! - Segnala "non supportato" senza mai fallire: la parte resta invariata
//!
//! ## Pipeline:
//! 1. `image::load_from_memory` rileva il formato dal contenuto
//! 2. Conversione a RGB 8 bit (il canale alpha viene scartato, JPEG non lo supporta)
//! 3. `JpegEncoder` con qualità fissa
//!
//! ## Note:
//! - Il lavoro è CPU-bound: i chiamanti lo eseguono dentro `spawn_blocking`
//! - Il cambio di subtype (`jpeg`) e di estensione (`.jpg`) è compito del chiamante
//!
//! ## Esempio:
//! ```rust,ignore
//! match ImageRecompressor::recompress(&bytes, IMAGE_QUALITY) {
//!     Some(jpeg) => { /* sostituisci il contenuto */ }
//!     None => { /* lascia la parte invariata */ }
//! }
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageResult};
use tracing::debug;

/// Stateless JPEG re-encoder
pub struct ImageRecompressor;

impl ImageRecompressor {
    /// Re-encodes `bytes` as JPEG at `quality`.
    ///
    /// Returns `None` when the buffer cannot be decoded or encoded; the cause
    /// is logged at debug level.
    pub fn recompress(bytes: &[u8], quality: u8) -> Option<Vec<u8>> {
        match Self::encode_jpeg(bytes, quality) {
            Ok(jpeg) => Some(jpeg),
            Err(e) => {
                debug!("Image recompression not possible: {}", e);
                None
            }
        }
    }

    fn encode_jpeg(bytes: &[u8], quality: u8) -> ImageResult<Vec<u8>> {
        let decoded = image::load_from_memory(bytes)?;
        let rgb = decoded.to_rgb8();

        let mut out = Vec::with_capacity(bytes.len() / 2);
        JpegEncoder::new_with_quality(&mut out, quality).encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ColorType::Rgb8,
        )?;
        Ok(out)
    }
}
