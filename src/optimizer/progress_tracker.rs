//! # Progress Tracking Module
//!
//! Tracker thread-safe condiviso dai task dei messaggi.
//! Gestisce sia l'output JSON che la progress bar tradizionale.

use crate::{
    error::CompressError,
    file_manager::FileManager,
    json_output::JsonMessage,
    optimizer::message_processor::MessageReport,
    progress::ProgressManager,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Tracker progress unificato
#[derive(Clone)]
pub struct ProgressTracker {
    pub total_messages: usize,
    json_output: bool,
    completed: Arc<Mutex<usize>>,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(total_messages: usize, json_output: bool) -> Self {
        let progress_manager = if json_output {
            ProgressManager::hidden()
        } else {
            ProgressManager::new(total_messages as u64)
        };

        Self {
            total_messages,
            json_output,
            completed: Arc::new(Mutex::new(0)),
            progress_manager,
        }
    }

    /// Annuncia l'inizio di un messaggio
    pub fn message_started(&self, path: &Path, index: usize) {
        if self.json_output {
            JsonMessage::message_start(path.to_path_buf(), index, self.total_messages).emit();
        } else {
            info!("Processing: {}", display_name(path));
        }
    }

    /// Gestisce completamento messaggio con eventi JSON automatici
    pub async fn handle_message_completion(&self, path: &Path, result: &Result<MessageReport, CompressError>) {
        {
            let mut completed = self.completed.lock().await;
            *completed += 1;
        }

        let name = display_name(path);
        match result {
            Ok(report) => {
                if self.json_output {
                    JsonMessage::message_complete(report).emit();
                }
                let reduction = FileManager::calculate_reduction(report.original_size, report.output_size);
                self.progress_manager
                    .update(&format!("[OK] {}: {:.1}% saved", name, reduction.max(0.0)));
            }
            Err(e) => {
                error!("Failed to process {}: {}", name, e);
                if self.json_output {
                    JsonMessage::message_failed(path.to_path_buf(), e.to_string()).emit();
                }
                self.progress_manager.update(&format!("[ERROR] {}", name));
            }
        }
    }

    pub async fn completed(&self) -> usize {
        *self.completed.lock().await
    }

    /// Finalizza progress bar
    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_completion_counts_success_and_failure() {
        let tracker = ProgressTracker::new(2, true);
        let report = MessageReport {
            input: PathBuf::from("a.eml"),
            output: PathBuf::from("a_compressed.eml"),
            original_size: 10,
            output_size: 5,
            parts_compressed: 1,
            parts_failed: 0,
            parts_unchanged: 0,
        };

        tracker.handle_message_completion(Path::new("a.eml"), &Ok(report)).await;
        tracker
            .handle_message_completion(
                Path::new("b.eml"),
                &Err(CompressError::Load {
                    path: PathBuf::from("b.eml"),
                    reason: "input is empty".to_string(),
                }),
            )
            .await;

        assert_eq!(tracker.completed().await, 2);
    }
}
