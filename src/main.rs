//! # lexcorpus CLI
//!
//! ## Usage
//!
//! ```bash
//! lexcorpus --config ./config/lexcorpus.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lexcorpus build [ROOT] [DB_NAME]` | Extract, chunk, embed and persist an index |
//! | `lexcorpus scan [ROOT] [--extract]` | Dry run: list the files a build would ingest |
//! | `lexcorpus stats <DB_NAME>` | Summarize a persisted index |
//! | `lexcorpus doctor` | Check OCR tools and embedding configuration |

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lexcorpus::config::{self, DEFAULT_CONFIG_PATH};
use lexcorpus::progress::ProgressMode;
use lexcorpus::{doctor, ingest, stats};

/// lexcorpus: build a retrieval corpus from a folder of legal documents.
#[derive(Parser)]
#[command(
    name = "lexcorpus",
    about = "Build a vector index from a folder of legal documents (PDF and text)",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the default path does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Progress output on stderr. Defaults to `human` on a terminal, `off` otherwise.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and persist a vector index.
    ///
    /// Missing arguments are prompted for on stdin.
    Build {
        /// Folder to ingest recursively.
        root: Option<PathBuf>,
        /// Index name; written to `<store.root>/<DB_NAME>/`.
        db_name: Option<String>,
    },

    /// List the files a build would ingest. Writes nothing.
    Scan {
        /// Folder to scan recursively.
        root: Option<PathBuf>,
        /// Also extract text and estimate the chunk count.
        #[arg(long)]
        extract: bool,
    },

    /// Show a summary of a persisted index.
    Stats {
        /// Index name under the store root.
        db_name: String,
    },

    /// Check that pdftoppm and tesseract are available.
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexcorpus=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Build { root, db_name } => {
            let root = match root {
                Some(root) => root,
                None => PathBuf::from(prompt("Folder to ingest: ")?),
            };
            let db_name = match db_name {
                Some(name) => name,
                None => prompt("Index name: ")?,
            };
            ingest::run_build(&cfg, &root, &db_name, progress.reporter()).await?;
        }
        Commands::Scan { root, extract } => {
            let root = match root {
                Some(root) => root,
                None => PathBuf::from(prompt("Folder to scan: ")?),
            };
            ingest::run_scan(&cfg, &root, extract, progress.reporter()).await?;
        }
        Commands::Stats { db_name } => {
            stats::run_stats(&cfg, &db_name).await?;
        }
        Commands::Doctor => {
            doctor::run_doctor(&cfg)?;
        }
    }

    Ok(())
}

/// Read one trimmed line from stdin.
fn prompt(label: &str) -> Result<String> {
    let mut out = std::io::stdout().lock();
    out.write_all(label.as_bytes())?;
    out.flush()?;

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("no input for '{}'", label.trim_end_matches([':', ' ']));
    }
    Ok(line.trim().to_string())
}
