//! # Optimizer Module
//!
//! Pipeline di compressione separata in sottomoduli:
//! - `batch_coordinator`: Orchestratore principale (un task per messaggio)
//! - `message_processor`: Worker per singolo messaggio (macchina a stati)
//! - `tree_walker`: Visita dell'albero delle parti
//! - `part_dispatcher`: Scelta del compressore e task per singola parte
//! - `progress_tracker`: Gestione progress unificata
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod batch_coordinator;
pub mod message_processor;
pub mod part_dispatcher;
pub mod path_resolver;
pub mod progress_tracker;
pub mod tree_walker;

pub use batch_coordinator::BatchCoordinator;
pub use message_processor::{MessageProcessor, MessageReport, MessageState};
pub use part_dispatcher::{Compressor, CompressionTask, PartContext, PartDispatcher, PartOutcome};
pub use path_resolver::PathResolver;
pub use progress_tracker::ProgressTracker;
pub use tree_walker::TreeWalker;
