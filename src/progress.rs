//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di compressione.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time (nascosta in modalità JSON)
//! - Tracking statistiche del batch (messaggi scritti/falliti, parti compresse/fallite)
//! - Calcolo percentuali di riduzione e byte risparmiati
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce la progress bar dei messaggi
//! - `BatchStats`: Traccia statistiche cumulative
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================================] 12/12 (100%) [OK] holiday.eml: 61.3% saved
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let progress = ProgressManager::new(total_messages);
//! let mut stats = BatchStats::new();
//!
//! stats.add_message(&report);
//! progress.update("holiday.eml");
//!
//! progress.finish(&stats.format_summary());
//! ```

use crate::file_manager::FileManager;
use crate::optimizer::message_processor::MessageReport;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages progress reporting for a batch of messages
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_messages: u64) -> Self {
        let bar = ProgressBar::new(total_messages);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that never draws (JSON mode)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for a batch run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub messages_processed: usize,
    pub messages_written: usize,
    pub messages_failed: usize,
    pub parts_compressed: usize,
    pub parts_failed: usize,
    pub parts_unchanged: usize,
    pub total_original_size: u64,
    pub total_output_size: u64,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, report: &MessageReport) {
        self.messages_processed += 1;
        self.messages_written += 1;
        self.parts_compressed += report.parts_compressed;
        self.parts_failed += report.parts_failed;
        self.parts_unchanged += report.parts_unchanged;
        self.total_original_size += report.original_size;
        self.total_output_size += report.output_size;
    }

    pub fn add_failure(&mut self) {
        self.messages_processed += 1;
        self.messages_failed += 1;
    }

    /// Bytes saved over written messages; growth counts as zero
    pub fn bytes_saved(&self) -> u64 {
        self.total_original_size.saturating_sub(self.total_output_size)
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        FileManager::calculate_reduction(self.total_original_size, self.total_output_size).max(0.0)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Messages: {} | Written: {} | Failed: {} | Parts compressed: {} (failed: {}, unchanged: {}) | Total saved: {} ({:.2}%)",
            self.messages_processed,
            self.messages_written,
            self.messages_failed,
            self.parts_compressed,
            self.parts_failed,
            self.parts_unchanged,
            FileManager::format_size(self.bytes_saved()),
            self.overall_reduction_percent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(original: u64, output: u64, compressed: usize) -> MessageReport {
        MessageReport {
            input: PathBuf::from("a.eml"),
            output: PathBuf::from("a_compressed.eml"),
            original_size: original,
            output_size: output,
            parts_compressed: compressed,
            parts_failed: 1,
            parts_unchanged: 0,
        }
    }

    #[test]
    fn test_batch_stats_totals() {
        let mut stats = BatchStats::new();
        stats.add_message(&report(1000, 400, 2));
        stats.add_message(&report(1000, 600, 1));
        stats.add_failure();

        assert_eq!(stats.messages_processed, 3);
        assert_eq!(stats.messages_written, 2);
        assert_eq!(stats.messages_failed, 1);
        assert_eq!(stats.parts_compressed, 3);
        assert_eq!(stats.parts_failed, 2);
        assert_eq!(stats.bytes_saved(), 1000);
        assert!((stats.overall_reduction_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_growth_is_not_negative_saving() {
        let mut stats = BatchStats::new();
        stats.add_message(&report(100, 150, 1));
        assert_eq!(stats.bytes_saved(), 0);
        assert_eq!(stats.overall_reduction_percent(), 0.0);
        assert!(stats.format_summary().contains("Written: 1"));
    }
}
