//! # Archive Repacking Module
//!
//! Questo modulo ricostruisce gli allegati `.zip` ricomprimendo le immagini contenute.
//!
//! ## Responsabilità:
//! - Lettura sequenziale delle entry di un archivio in memoria
//! - Ricompressione JPEG delle entry immagine (tipo dedotto dal nome con `mime_guess`)
//! - Ricostruzione di un nuovo archivio a livello di compressione 9
//!
//! ## Regole per entry:
//! - Directory: saltate
//! - Immagini: ricompresse e rinominate in `.jpg` con lo stesso timestamp;
//!   se non decodificabili restano identiche; se il nome `.jpg` esiste già
//!   nell'archivio (prima o dopo) l'entry resta identica
//! - Altri file: copiati con byte, nome e timestamp originali
//! - Errore di lettura di una entry: copia dei dati grezzi (fail-open), l'entry non si perde mai
//!
//! ## Note:
//! - Nessuna ricorsione negli archivi annidati
//! - Tutto avviene in memoria; il lavoro è CPU-bound e va eseguito in `spawn_blocking`

use crate::config::{COMPRESSION_LEVEL, IMAGE_QUALITY};
use crate::error::CompressError;
use crate::image_processor::ImageRecompressor;
use crate::utils::replace_extension;
use std::borrow::Cow;
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, Write};
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// One archive member, read fully into memory
struct ArchiveEntry {
    name: String,
    modified: DateTime,
    unix_mode: Option<u32>,
    is_dir: bool,
    data: Vec<u8>,
}

/// Rebuilds zip archives with recompressed images
pub struct ArchiveRepacker;

impl ArchiveRepacker {
    /// Repacks `bytes`; `archive_label` names the attachment in diagnostics.
    pub fn repack(bytes: &[u8], archive_label: &str) -> Result<Vec<u8>, CompressError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(bytes.len())));
        // A renamed image must not take the name of any input entry, earlier or later
        let mut taken: HashSet<String> = archive.file_names().map(str::to_string).collect();

        for index in 0..archive.len() {
            let entry = match Self::read_entry(&mut archive, index) {
                Ok(entry) => entry,
                Err(e) => {
                    let raw = archive.by_index_raw(index)?;
                    if raw.is_dir() {
                        continue;
                    }
                    warn!(
                        "Could not read {} inside .zip ({}), copying it unchanged: {}",
                        raw.name(),
                        archive_label,
                        e
                    );
                    writer.raw_copy_file(raw)?;
                    continue;
                }
            };

            if entry.is_dir {
                debug!("Skipping directory entry {} in {}", entry.name, archive_label);
                continue;
            }

            let (name, data) = Self::transform_entry(&entry, &taken, archive_label);
            Self::write_entry(&mut writer, &name, &entry, &data)?;
            taken.insert(name);
        }

        Ok(writer.finish()?.into_inner())
    }

    fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, index: usize) -> Result<ArchiveEntry, CompressError> {
        let mut file = archive.by_index(index)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        if !file.is_dir() {
            file.read_to_end(&mut data)?;
        }
        Ok(ArchiveEntry {
            name: file.name().to_string(),
            modified: file.last_modified(),
            unix_mode: file.unix_mode(),
            is_dir: file.is_dir(),
            data,
        })
    }

    /// Output name and bytes for a regular entry
    fn transform_entry<'a>(
        entry: &'a ArchiveEntry,
        taken: &HashSet<String>,
        archive_label: &str,
    ) -> (String, Cow<'a, [u8]>) {
        let original = (entry.name.clone(), Cow::Borrowed(entry.data.as_slice()));
        if !Self::is_image_name(&entry.name) {
            return original;
        }

        let jpg_name = replace_extension(&entry.name, "jpg");
        if jpg_name != entry.name && taken.contains(&jpg_name) {
            debug!("{} would clash with {} in {}, keeping it", entry.name, jpg_name, archive_label);
            return original;
        }

        match ImageRecompressor::recompress(&entry.data, IMAGE_QUALITY) {
            Some(jpeg) => {
                info!("Compressed image inside .zip ({}) : {}", archive_label, entry.name);
                (jpg_name, Cow::Owned(jpeg))
            }
            None => {
                debug!("Unsupported image {} inside .zip ({}), keeping it", entry.name, archive_label);
                original
            }
        }
    }

    fn write_entry<W: Write + Seek>(
        writer: &mut ZipWriter<W>,
        name: &str,
        entry: &ArchiveEntry,
        data: &[u8],
    ) -> Result<(), CompressError> {
        let mut options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL))
            .last_modified_time(entry.modified);
        if let Some(mode) = entry.unix_mode {
            options = options.unix_permissions(mode);
        }
        writer.start_file(name, options)?;
        writer.write_all(data)?;
        Ok(())
    }

    fn is_image_name(name: &str) -> bool {
        mime_guess::from_path(name)
            .first_raw()
            .map(|mime| mime.starts_with("image"))
            .unwrap_or(false)
    }
}
