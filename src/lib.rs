//! # EML Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test di integrazione
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom (livello messaggio vs livello parte)
//! - `message`: Decodifica/serializzazione dei messaggi `.eml` in un albero di parti
//! - `image_processor`: Ricompressione JPEG in memoria
//! - `pdf_processor`: Ottimizzazione PDF tramite qpdf
//! - `archive_processor`: Ricostruzione degli archivi zip
//! - `optimizer`: Pipeline concorrente (batch → messaggio → parti)
//! - `file_manager`: Discovery dei messaggi e utilità sulle dimensioni
//! - `progress` / `json_output`: Progress bar, statistiche e output JSON
//! - `platform` / `tool_resolver`: Risoluzione del path di qpdf
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use eml_compressor::{BatchCoordinator, Config};
//!
//! let coordinator = BatchCoordinator::new(Config::default())?;
//! let stats = coordinator.run(&input_dir).await?;
//! ```

pub mod archive_processor;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod message;
pub mod optimizer;
pub mod pdf_processor;
pub mod platform;
pub mod progress;
pub mod tool_resolver;
pub mod utils;

pub use config::Config;
pub use error::CompressError;
pub use message::Message;
pub use optimizer::BatchCoordinator;
pub use progress::BatchStats;
