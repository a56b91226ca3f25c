//! # Message Processor Module
//!
//! Worker per l'elaborazione di un singolo messaggio `.eml`.
//!
//! ## Stati:
//! `Loading → Walking → AwaitingParts → Serializing → Done`, con uscita `Failed(Load | Save)`.
//!
//! ## Isolamento degli errori:
//! - Errore di caricamento: nessun output, gli altri messaggi proseguono
//! - Errore di una parte: loggato, la foglia resta quella originale
//! - Errore di scrittura: il messaggio viene scartato, gli altri proseguono
//!
//! L'output viene scritto in un file `.partial` accanto a quello finale e poi rinominato.

use crate::error::CompressError;
use crate::message::Message;
use crate::optimizer::part_dispatcher::{PartContext, PartOutcome};
use crate::optimizer::path_resolver::PathResolver;
use crate::optimizer::tree_walker::TreeWalker;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Why a message produced no output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Load,
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Loading,
    Walking,
    AwaitingParts,
    Serializing,
    Done,
    Failed(FailureKind),
}

/// Summary of one written message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub original_size: u64,
    pub output_size: u64,
    pub parts_compressed: usize,
    pub parts_failed: usize,
    pub parts_unchanged: usize,
}

/// Per-part tallies gathered while awaiting the task group
#[derive(Debug, Default)]
struct PartTally {
    compressed: usize,
    failed: usize,
    unchanged: usize,
}

/// Worker per un singolo messaggio
pub struct MessageProcessor {
    context: Arc<PartContext>,
    output_dir: PathBuf,
    state: MessageState,
}

impl MessageProcessor {
    pub fn new(context: Arc<PartContext>, output_dir: PathBuf) -> Self {
        Self {
            context,
            output_dir,
            state: MessageState::Loading,
        }
    }

    pub fn state(&self) -> MessageState {
        self.state
    }

    /// Loads, compresses and writes one message.
    pub async fn process(&mut self, input_path: &Path) -> Result<MessageReport, CompressError> {
        let file_name = input_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();

        self.enter(MessageState::Loading);
        let bytes = match tokio::fs::read(input_path).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.load_failed(input_path, e.to_string())),
        };
        let mut message = match Message::parse(&bytes) {
            Ok(message) => message,
            Err(e) => return Err(self.load_failed(input_path, e.to_string())),
        };

        self.enter(MessageState::Walking);
        let mut tasks = TreeWalker::new(Arc::clone(&self.context)).walk(message.root());
        debug!("{}: {} part task(s) started", file_name, tasks.len());

        self.enter(MessageState::AwaitingParts);
        let mut tally = PartTally::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => Self::absorb(&file_name, &mut message, outcome, &mut tally),
                Err(e) => {
                    error!("{}: part task aborted: {}", file_name, e);
                    tally.failed += 1;
                }
            }
        }

        self.enter(MessageState::Serializing);
        let output_path = PathResolver::get_output_path(input_path, &self.output_dir).map_err(|e| {
            self.state = MessageState::Failed(FailureKind::Save);
            e
        })?;
        let serialized = message.to_bytes();
        if let Err(source) = write_output(&output_path, &serialized).await {
            self.state = MessageState::Failed(FailureKind::Save);
            return Err(CompressError::Save {
                path: output_path,
                source,
            });
        }

        self.enter(MessageState::Done);
        Ok(MessageReport {
            input: input_path.to_path_buf(),
            output: output_path,
            original_size: bytes.len() as u64,
            output_size: serialized.len() as u64,
            parts_compressed: tally.compressed,
            parts_failed: tally.failed,
            parts_unchanged: tally.unchanged,
        })
    }

    fn enter(&mut self, state: MessageState) {
        debug!("Message state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn load_failed(&mut self, input_path: &Path, reason: String) -> CompressError {
        self.state = MessageState::Failed(FailureKind::Load);
        CompressError::Load {
            path: input_path.to_path_buf(),
            reason,
        }
    }

    fn absorb(file_name: &str, message: &mut Message, outcome: PartOutcome, tally: &mut PartTally) {
        match outcome.result {
            Ok(Some(update)) => match message.leaf_mut(&outcome.path) {
                Some(leaf) => {
                    leaf.apply(update);
                    tally.compressed += 1;
                }
                None => {
                    error!("{}: part {} vanished before its update", file_name, outcome.path);
                    tally.failed += 1;
                }
            },
            Ok(None) => tally.unchanged += 1,
            Err(CompressError::UnsupportedFormat(reason)) => {
                warn!("{}: unsupported {} left unchanged: {}", file_name, outcome.compressor.name(), reason);
                tally.unchanged += 1;
            }
            Err(e) => {
                error!("{}: error processing {}: {}", file_name, outcome.label, e);
                tally.failed += 1;
            }
        }
    }
}

/// Writes to a sibling `.partial` file, then renames it over `path`
async fn write_output(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let partial = path.with_file_name(format!(".{}.partial", file_name));

    let result = match tokio::fs::write(&partial, data).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&partial).await {
            debug!("Could not remove {}: {}", partial.display(), e);
        }
    }
    result
}
