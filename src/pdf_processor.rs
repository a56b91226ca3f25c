//! # PDF Optimization Module
//!
//! Questo modulo ottimizza i PDF allegati delegando il lavoro a `qpdf`.
//!
//! ## Responsabilità:
//! - Scrive il PDF in una directory di scratch dedicata all'invocazione
//! - Esegue `qpdf` con un set di opzioni fisso
//! - Rilegge il file ottimizzato e rimuove sempre lo scratch (anche su errore o timeout)
//!
//! ## Opzioni di qpdf:
//! - `--optimize-images` / `--keep-inline-images`
//! - `--compression-level=9` / `--recompress-flate` / `--compress-streams=y`
//! - `--linearize` / `--remove-unreferenced-resources=yes` / `--no-warn`
//!
//! ## Codici di uscita:
//! - `0`: successo
//! - `3`: successo con warning
//! - `2`: errore; se qpdf ha comunque prodotto un output viene usato, altrimenti
//!   `OptimizationFailed` con la diagnostica di qpdf
//!
//! ## Nomi di scratch:
//! `<stem>_<contatore>_<token casuale>/` sotto la scratch root condivisa: il contatore
//! di processo e il token di `tempfile` evitano collisioni tra task concorrenti.
//!
//! ## Esempio:
//! ```rust,ignore
//! let optimizer = PdfOptimizer::new(&config);
//! let smaller = optimizer.optimize(&bytes, "report.pdf").await?;
//! ```

use crate::args;
use crate::config::{Config, COMPRESSION_LEVEL};
use crate::error::CompressError;
use crate::platform::PlatformCommands;
use crate::utils::sanitize_filename;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;
use tracing::{debug, warn};

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Longest stem kept in scratch directory names
const MAX_STEM_LEN: usize = 48;

/// Runs `qpdf` over in-memory PDF documents
#[derive(Debug, Clone)]
pub struct PdfOptimizer {
    engine: Option<PathBuf>,
    scratch_root: PathBuf,
}

impl PdfOptimizer {
    /// Engine from the configuration, else resolved from the environment
    pub fn new(config: &Config) -> Self {
        let engine = config
            .qpdf_path
            .clone()
            .or_else(|| PlatformCommands::instance().get_tool_path("qpdf"));
        Self::with_engine(engine, config.scratch_root())
    }

    pub fn with_engine(engine: Option<PathBuf>, scratch_root: PathBuf) -> Self {
        Self { engine, scratch_root }
    }

    pub fn engine(&self) -> Option<&Path> {
        self.engine.as_deref()
    }

    /// Optimizes one document; `hint_name` only seeds the scratch directory name.
    pub async fn optimize(&self, bytes: &[u8], hint_name: &str) -> Result<Vec<u8>, CompressError> {
        let engine = self.engine.as_ref().ok_or_else(|| {
            CompressError::MissingDependency(
                "qpdf not found (install it, or set QPDF_PATH / --qpdf)".to_string(),
            )
        })?;

        tokio::fs::create_dir_all(&self.scratch_root).await?;
        // Removed on drop, whichever way this function is left
        let scratch = tempfile::Builder::new()
            .prefix(&Self::scratch_prefix(hint_name))
            .tempdir_in(&self.scratch_root)?;
        let input = scratch.path().join("input.pdf");
        let output = scratch.path().join("output.pdf");

        tokio::fs::write(&input, bytes).await?;

        let args = Self::engine_args(&input, &output);
        debug!("Running {} {:?}", engine.display(), args);

        let start_time = std::time::Instant::now();
        let result = Command::new(engine)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;
        let elapsed = start_time.elapsed();

        let produced = tokio::fs::read(&output)
            .await
            .ok()
            .filter(|optimized| !optimized.is_empty());

        match (result.status.code(), produced) {
            (Some(0), Some(optimized)) => {
                debug!("qpdf finished {} in {:?}", hint_name, elapsed);
                Ok(optimized)
            }
            (Some(3), Some(optimized)) => {
                debug!("qpdf finished {} with warnings in {:?}", hint_name, elapsed);
                Ok(optimized)
            }
            (_, Some(optimized)) => {
                warn!(
                    "qpdf reported an error for {} ({}) but produced output, using it: {}",
                    hint_name,
                    result.status,
                    Self::diagnostics(&result)
                );
                Ok(optimized)
            }
            (_, None) => Err(CompressError::OptimizationFailed(Self::diagnostics(&result))),
        }
    }

    fn engine_args(input: &Path, output: &Path) -> Vec<String> {
        args![
            "--optimize-images",
            "--keep-inline-images",
            format!("--compression-level={}", COMPRESSION_LEVEL),
            "--recompress-flate",
            "--compress-streams=y",
            "--linearize",
            "--no-warn",
            "--remove-unreferenced-resources=yes",
            input.display(),
            output.display(),
        ]
    }

    fn scratch_prefix(hint_name: &str) -> String {
        let sanitized = sanitize_filename(Some(hint_name), "document");
        let stem = Path::new(&sanitized)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(sanitized);
        let stem: String = stem
            .chars()
            .filter(|c| !c.is_whitespace())
            .take(MAX_STEM_LEN)
            .collect();
        let counter = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        format!("{}_{}_", stem, counter)
    }

    fn diagnostics(output: &std::process::Output) -> String {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stderr.trim().is_empty() {
            stderr.trim().to_string()
        } else if !stdout.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            format!("qpdf {} without output", output.status)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Writes an executable stand-in for qpdf into `dir`
    #[cfg(unix)]
    pub(crate) fn fake_qpdf(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("qpdf");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Copies its second-to-last argument onto the last one, prefixed with a marker
    #[cfg(unix)]
    pub(crate) const COPY_SCRIPT: &str = r#"in=""; out=""
for arg in "$@"; do in="$out"; out="$arg"; done
printf 'optimized:' > "$out"
cat "$in" >> "$out""#;

    #[cfg(unix)]
    pub(crate) const FAIL_SCRIPT: &str = r#"echo "qpdf: input.pdf: not a PDF file" >&2
exit 2"#;

    fn scratch_is_empty(root: &Path) -> bool {
        std::fs::read_dir(root).map(|mut d| d.next().is_none()).unwrap_or(true)
    }

    #[tokio::test]
    async fn test_missing_engine() {
        let temp_dir = TempDir::new().unwrap();
        let optimizer = PdfOptimizer::with_engine(None, temp_dir.path().join("scratch"));

        let err = optimizer.optimize(b"%PDF-1.4", "a.pdf").await.unwrap_err();
        assert!(matches!(err, CompressError::MissingDependency(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_returns_output_and_cleans_scratch() {
        let temp_dir = TempDir::new().unwrap();
        let engine = fake_qpdf(temp_dir.path(), COPY_SCRIPT);
        let scratch = temp_dir.path().join("scratch");
        let optimizer = PdfOptimizer::with_engine(Some(engine), scratch.clone());

        let optimized = optimizer.optimize(b"%PDF-1.4 body", "Report 2024.pdf").await.unwrap();
        assert_eq!(optimized, b"optimized:%PDF-1.4 body");
        assert!(scratch_is_empty(&scratch));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_warnings_exit_code_is_success() {
        let temp_dir = TempDir::new().unwrap();
        let engine = fake_qpdf(temp_dir.path(), &format!("{}\nexit 3", COPY_SCRIPT));
        let optimizer = PdfOptimizer::with_engine(Some(engine), temp_dir.path().join("scratch"));

        let optimized = optimizer.optimize(b"%PDF", "w.pdf").await.unwrap();
        assert_eq!(optimized, b"optimized:%PDF");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_error_with_output_still_uses_output() {
        let temp_dir = TempDir::new().unwrap();
        let engine = fake_qpdf(temp_dir.path(), &format!("{}\nexit 2", COPY_SCRIPT));
        let optimizer = PdfOptimizer::with_engine(Some(engine), temp_dir.path().join("scratch"));

        let optimized = optimizer.optimize(b"%PDF", "e.pdf").await.unwrap();
        assert_eq!(optimized, b"optimized:%PDF");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_reports_diagnostics_and_cleans_scratch() {
        let temp_dir = TempDir::new().unwrap();
        let engine = fake_qpdf(temp_dir.path(), FAIL_SCRIPT);
        let scratch = temp_dir.path().join("scratch");
        let optimizer = PdfOptimizer::with_engine(Some(engine), scratch.clone());

        match optimizer.optimize(b"not a pdf", "broken.pdf").await {
            Err(CompressError::OptimizationFailed(diagnostics)) => {
                assert!(diagnostics.contains("not a PDF file"));
            }
            other => panic!("expected OptimizationFailed, got {:?}", other),
        }
        assert!(scratch_is_empty(&scratch));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrent_runs_use_distinct_scratch_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let engine = fake_qpdf(temp_dir.path(), COPY_SCRIPT);
        let optimizer = PdfOptimizer::with_engine(Some(engine), temp_dir.path().join("scratch"));

        let runs = (0..8).map(|i| {
            let optimizer = optimizer.clone();
            tokio::spawn(async move {
                let body = format!("%PDF-{}", i);
                let optimized = optimizer.optimize(body.as_bytes(), "same.pdf").await.unwrap();
                (body, optimized)
            })
        });

        for (body, optimized) in futures::future::join_all(runs).await.into_iter().map(Result::unwrap) {
            assert_eq!(optimized, format!("optimized:{}", body).into_bytes());
        }
    }

    #[test]
    fn test_scratch_prefix_is_unique_and_sanitized() {
        let first = PdfOptimizer::scratch_prefix("../weird name?.pdf");
        let second = PdfOptimizer::scratch_prefix("../weird name?.pdf");
        assert_ne!(first, second);
        assert!(!first.contains('/'));
        assert!(!first.contains(' '));
        assert!(first.ends_with('_'));
    }

    #[test]
    fn test_engine_args() {
        let args = PdfOptimizer::engine_args(Path::new("/s/in.pdf"), Path::new("/s/out.pdf"));
        assert!(args.contains(&"--compression-level=9".to_string()));
        assert!(args.contains(&"--linearize".to_string()));
        assert_eq!(&args[args.len() - 2..], ["/s/in.pdf", "/s/out.pdf"]);
    }
}
