//! # EML Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione della configurazione (file JSON opzionale + override da CLI)
//! - Avvio del `BatchCoordinator` sulla directory di input
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory, output, timeout, qpdf, etc.)
//! 2. Configura il logging (`RUST_LOG`, altrimenti INFO o DEBUG a seconda del flag verbose)
//! 3. Carica la configurazione e applica gli override
//! 4. Comprime ogni `.eml` della directory in `<input>/../output/`
//!
//! ## Esempio di utilizzo:
//! ```bash
//! compress-eml /path/to/mails --timeout 120 --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use eml_compressor::json_output::JsonMessage;
use eml_compressor::platform::PlatformCommands;
use eml_compressor::{BatchCoordinator, Config};

#[derive(Parser)]
#[command(name = "compress-eml")]
#[command(about = "Shrink .eml messages by recompressing their image, PDF and zip attachments")]
struct Args {
    /// Directory containing the .eml files to compress
    input_dir: Option<PathBuf>,

    /// Output directory (default: `output/` next to the input directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Timeout for a single attachment, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Path to the qpdf executable
    #[arg(long)]
    qpdf: Option<PathBuf>,

    /// Scratch directory for PDF optimization
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Output progress and status as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Report the external tools that were found and exit
    #[arg(long)]
    check_tools: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for JSON lines
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    debug!("Platform: {}", PlatformCommands::system_info());

    if args.check_tools {
        let platform = PlatformCommands::instance();
        print!("{}", platform.get_tools_report());
        if !platform.is_tool_available("qpdf") {
            return Err(anyhow::anyhow!("qpdf is not available"));
        }
        return Ok(());
    }

    let json_output = args.json;
    let result = run(args).await;

    if let Err(ref e) = result {
        if json_output {
            JsonMessage::error(e.to_string(), Some(format!("{:?}", e))).emit();
        }
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let input_dir = args
        .input_dir
        .ok_or_else(|| anyhow::anyhow!("Missing input directory"))?;

    if !input_dir.is_dir() {
        return Err(anyhow::anyhow!("Input directory does not exist: {}", input_dir.display()));
    }

    let mut config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    if args.output.is_some() {
        config.output_path = args.output;
    }
    if let Some(timeout) = args.timeout {
        config.part_timeout_secs = timeout;
    }
    if args.qpdf.is_some() {
        config.qpdf_path = args.qpdf;
    }
    if args.scratch_dir.is_some() {
        config.scratch_dir = args.scratch_dir;
    }
    config.json_output = config.json_output || args.json;

    let coordinator = BatchCoordinator::new(config)?;
    coordinator.run(&input_dir).await?;

    Ok(())
}
