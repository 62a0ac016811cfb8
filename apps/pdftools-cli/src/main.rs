//! pdftools binary
//!
//! Entry point for the CLI and the JSON-lines stdio transport.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pdftools_cli::{commands, stdio};
use pdftools_worker::{PdfToolsClient, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdftools")]
#[command(version, about = "Compress, merge, split and convert PDFs with Ghostscript")]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ghostscript executable (overrides config and PDFTOOLS_GS_BINARY)
    #[arg(long, global = true)]
    gs: Option<PathBuf>,

    /// Directory results are written to
    #[arg(long, global = true, default_value = ".")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reduce file size (quality 1 = screen .. 4 = prepress)
    Compress {
        file: PathBuf,
        #[arg(short, long, default_value_t = 2)]
        quality: i64,
    },
    /// Concatenate files in the order given
    Merge {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
        #[arg(long)]
        no_compression: bool,
        #[arg(short, long, default_value_t = 2)]
        quality: i64,
    },
    /// One file per page
    Split {
        file: PathBuf,
        /// Save every page in a single <name>_pages.zip
        #[arg(long)]
        zip: bool,
    },
    /// Keep pages FIRST..=LAST (LAST defaults to the final page)
    Extract {
        file: PathBuf,
        #[arg(long)]
        first: i64,
        #[arg(long)]
        last: Option<i64>,
    },
    /// Convert to grayscale
    Grayscale { file: PathBuf },
    /// Fit pages to a paper size
    Resize {
        file: PathBuf,
        #[arg(long, default_value = "a4")]
        paper: String,
    },
    /// Print the number of pages (Ctrl-C cancels)
    PageCount { file: PathBuf },
    /// Serve JSON envelopes on stdin/stdout, one per line
    Stdio,
}

fn load_config(args: &Args) -> anyhow::Result<WorkerConfig> {
    let config = match &args.config {
        Some(path) => WorkerConfig::from_file(path)?,
        None => WorkerConfig::default(),
    };
    let mut config = config
        .with_env_overrides()
        .context("Invalid environment override")?;
    if let Some(gs) = &args.gs {
        config.interpreter.binary = gs.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout is reserved for results and the stdio protocol
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&args)?;
    tracing::debug!("Using Ghostscript at {}", config.interpreter.binary.display());
    let client = PdfToolsClient::from_config(&config);
    let out_dir = args.out_dir.as_path();

    match &args.command {
        Command::Compress { file, quality } => {
            commands::compress(&client, file, *quality, out_dir).await
        }
        Command::Merge {
            files,
            no_compression,
            quality,
        } => commands::merge(&client, files, !no_compression, *quality, out_dir).await,
        Command::Split { file, zip } => commands::split(&client, file, *zip, out_dir).await,
        Command::Extract { file, first, last } => {
            commands::extract(&client, file, *first, *last, commands::PAGE_COUNT_WAIT, out_dir)
                .await
        }
        Command::Grayscale { file } => commands::grayscale(&client, file, out_dir).await,
        Command::Resize { file, paper } => commands::resize(&client, file, paper, out_dir).await,
        Command::PageCount { file } => commands::page_count(&client, file).await,
        Command::Stdio => {
            tracing::info!("Starting pdftools v{}", env!("CARGO_PKG_VERSION"));
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            stdio::run_stdio(&client, stdin.lock(), stdout.lock()).await
        }
    }
}
