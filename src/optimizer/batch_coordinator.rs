//! # Batch Coordinator
//!
//! Orchestratore principale: trova i messaggi, avvia un task per ciascuno
//! e attende l'intero batch.
//!
//! ## Responsabilità:
//! - Discovery dei `.eml` e creazione della directory di output
//! - Avviso all'avvio se qpdf non è disponibile (mai fatale)
//! - Un task `MessageProcessor` per messaggio, tutti avviati subito
//! - Raccolta dei risultati: il fallimento di un messaggio non tocca gli altri
//! - Statistiche finali (log o JSON)

use crate::{
    config::Config,
    error::CompressError,
    file_manager::FileManager,
    json_output::{JsonConfig, JsonMessage},
    optimizer::{
        message_processor::{MessageProcessor, MessageReport},
        part_dispatcher::PartContext,
        path_resolver::PathResolver,
        progress_tracker::ProgressTracker,
    },
    platform::PlatformCommands,
    progress::BatchStats,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Orchestratore del batch
pub struct BatchCoordinator {
    config: Config,
    context: Arc<PartContext>,
}

impl BatchCoordinator {
    /// Crea il coordinatore; fallisce solo per configurazione non valida
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let context = Arc::new(PartContext::from_config(&config));
        Ok(Self { config, context })
    }

    /// Compresses every message in `input_dir` and returns the batch statistics.
    pub async fn run(&self, input_dir: &Path) -> Result<BatchStats> {
        let start_time = std::time::Instant::now();

        if !input_dir.is_dir() {
            return Err(anyhow::anyhow!("Input directory does not exist: {}", input_dir.display()));
        }

        let files = FileManager::find_eml_files(input_dir)?;
        let output_dir = self.config.output_dir_for(input_dir);

        self.emit_start_message(input_dir, &output_dir, &files);
        self.check_dependencies();

        if files.is_empty() {
            let stats = BatchStats::new();
            self.print_final_stats(&stats, start_time.elapsed().as_secs_f64());
            return Ok(stats);
        }

        PathResolver::ensure_dir(&output_dir).await?;

        let progress_tracker = ProgressTracker::new(files.len(), self.config.json_output);
        let stats = self.process_messages(files, output_dir, progress_tracker.clone()).await;

        progress_tracker.finish(&stats.format_summary());
        self.print_final_stats(&stats, start_time.elapsed().as_secs_f64());

        Ok(stats)
    }

    fn emit_start_message(&self, input_dir: &Path, output_dir: &Path, files: &[PathBuf]) {
        if self.config.json_output {
            JsonMessage::start(
                input_dir.to_path_buf(),
                output_dir.to_path_buf(),
                files.len(),
                JsonConfig::new(&self.config, self.context.pdf_optimizer.engine().map(Path::to_path_buf)),
            )
            .emit();
        } else {
            info!("Starting attachment compression in: {}", input_dir.display());
            info!("Output directory: {}", output_dir.display());
            info!("Part timeout: {}s", self.config.part_timeout_secs);
            info!("Found {} message(s) to process", files.len());
        }
    }

    /// qpdf is optional: PDF parts fail individually when it is missing
    fn check_dependencies(&self) {
        match self.context.pdf_optimizer.engine() {
            Some(engine) => info!("Using qpdf: {}", engine.display()),
            None => {
                warn!("qpdf not found, PDF attachments will be left unchanged");
                warn!("{}", PlatformCommands::instance().get_tools_report().trim_end());
            }
        }
    }

    /// Un task per messaggio, tutti avviati subito
    async fn process_messages(
        &self,
        files: Vec<PathBuf>,
        output_dir: PathBuf,
        progress_tracker: ProgressTracker,
    ) -> BatchStats {
        let mut tasks: Vec<tokio::task::JoinHandle<Result<MessageReport, CompressError>>> = Vec::new();

        for (index, file_path) in files.into_iter().enumerate() {
            let context = Arc::clone(&self.context);
            let output_dir = output_dir.clone();
            let progress = progress_tracker.clone();

            let task = tokio::spawn(async move {
                progress.message_started(&file_path, index);

                let mut processor = MessageProcessor::new(context, output_dir);
                let result = processor.process(&file_path).await;

                progress.handle_message_completion(&file_path, &result).await;
                result
            });

            tasks.push(task);
        }

        let mut stats = BatchStats::new();
        for joined in futures::future::join_all(tasks).await {
            match joined {
                Ok(Ok(report)) => stats.add_message(&report),
                Ok(Err(_)) => stats.add_failure(),
                Err(e) => {
                    error!("Message task panicked: {}", e);
                    stats.add_failure();
                }
            }
        }

        stats
    }

    fn print_final_stats(&self, stats: &BatchStats, duration: f64) {
        if self.config.json_output {
            JsonMessage::complete(stats, duration).emit();
        } else {
            info!("=== Compression Complete ===");
            info!("Messages processed: {}", stats.messages_processed);
            info!("Messages written: {}", stats.messages_written);
            info!("Messages failed: {}", stats.messages_failed);
            info!(
                "Parts compressed: {} (failed: {}, unchanged: {})",
                stats.parts_compressed, stats.parts_failed, stats.parts_unchanged
            );
            info!("Bytes saved: {}", FileManager::format_size(stats.bytes_saved()));
            info!("Average reduction: {:.2}%", stats.overall_reduction_percent());
            info!("Duration: {:.2}s", duration);
        }
    }
}
