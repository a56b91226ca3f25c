//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per uso programmatico (`--json`).
//!
//! ## Responsabilità:
//! - Emette un oggetto JSON per riga su stdout
//! - Ogni riga viene scritta tenendo il lock di stdout: i task concorrenti non si mescolano
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch
//! - `message_start`: Inizio elaborazione di un messaggio
//! - `message_complete`: Messaggio scritto, con i conteggi delle parti
//! - `message_failed`: Messaggio scartato (caricamento o scrittura falliti)
//! - `complete`: Fine del batch con statistiche finali
//! - `error`: Errore fatale prima dell'avvio dei task

use crate::config::{Config, COMPRESSION_LEVEL, IMAGE_QUALITY};
use crate::file_manager::FileManager;
use crate::optimizer::message_processor::MessageReport;
use crate::progress::BatchStats;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        input_dir: PathBuf,
        output_dir: PathBuf,
        total_messages: usize,
        config: JsonConfig,
    },

    #[serde(rename = "message_start")]
    MessageStart {
        path: PathBuf,
        index: usize,
        total: usize,
    },

    #[serde(rename = "message_complete")]
    MessageComplete {
        path: PathBuf,
        output: PathBuf,
        original_size: u64,
        output_size: u64,
        reduction_percent: f64,
        parts_compressed: usize,
        parts_failed: usize,
        parts_unchanged: usize,
    },

    #[serde(rename = "message_failed")]
    MessageFailed { path: PathBuf, error: String },

    #[serde(rename = "complete")]
    Complete {
        messages_processed: usize,
        messages_written: usize,
        messages_failed: usize,
        parts_compressed: usize,
        parts_failed: usize,
        parts_unchanged: usize,
        total_bytes_saved: u64,
        average_reduction: f64,
        duration_seconds: f64,
    },

    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub image_quality: u8,
    pub compression_level: i32,
    pub part_timeout_secs: u64,
    pub qpdf_path: Option<PathBuf>,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            let _ = writeln!(lock, "{}", json);
        }
    }

    pub fn start(input_dir: PathBuf, output_dir: PathBuf, total_messages: usize, config: JsonConfig) -> Self {
        Self::Start {
            input_dir,
            output_dir,
            total_messages,
            config,
        }
    }

    pub fn message_start(path: PathBuf, index: usize, total: usize) -> Self {
        Self::MessageStart { path, index, total }
    }

    pub fn message_complete(report: &MessageReport) -> Self {
        Self::MessageComplete {
            path: report.input.clone(),
            output: report.output.clone(),
            original_size: report.original_size,
            output_size: report.output_size,
            reduction_percent: FileManager::calculate_reduction(report.original_size, report.output_size),
            parts_compressed: report.parts_compressed,
            parts_failed: report.parts_failed,
            parts_unchanged: report.parts_unchanged,
        }
    }

    pub fn message_failed(path: PathBuf, error: String) -> Self {
        Self::MessageFailed { path, error }
    }

    pub fn complete(stats: &BatchStats, duration_seconds: f64) -> Self {
        Self::Complete {
            messages_processed: stats.messages_processed,
            messages_written: stats.messages_written,
            messages_failed: stats.messages_failed,
            parts_compressed: stats.parts_compressed,
            parts_failed: stats.parts_failed,
            parts_unchanged: stats.parts_unchanged,
            total_bytes_saved: stats.bytes_saved(),
            average_reduction: stats.overall_reduction_percent(),
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl JsonConfig {
    /// `qpdf_path` is the engine actually resolved for this run
    pub fn new(config: &Config, qpdf_path: Option<PathBuf>) -> Self {
        Self {
            image_quality: IMAGE_QUALITY,
            compression_level: COMPRESSION_LEVEL,
            part_timeout_secs: config.part_timeout_secs,
            qpdf_path,
        }
    }
}
