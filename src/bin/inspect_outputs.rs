//! CLI binary for the exam2json Inspector.
//!
//! Prints `{count}\t{year}-{exam_number}\t{source}` for every file in the
//! output directory and stops at the first file that cannot be summarised.

use anyhow::{Context, Result};
use clap::Parser;
use exam2json::inspect::{list_outputs, summarize, write_manifest};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Print a one-line summary per generated exam JSON file.
#[derive(Parser, Debug)]
#[command(
    name = "inspect-outputs",
    version,
    about = "Print a one-line summary per generated exam JSON file"
)]
struct Cli {
    /// Directory containing the generated JSON files.
    #[arg(env = "EXAM2JSON_OUTPUT_DIR", default_value = "./json")]
    dir: PathBuf,

    /// Also write a JSON array of the file names (quiz source list) here.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" })),
        )
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outputs =
        list_outputs(&cli.dir, cli.manifest.as_deref()).context("Failed to list output directory")?;
    for path in outputs {
        let line = summarize(&path).with_context(|| format!("Failed to inspect {}", path.display()))?;
        writeln!(out, "{line}").context("Failed to write to stdout")?;
    }

    if let Some(ref manifest) = cli.manifest {
        let n = write_manifest(&cli.dir, manifest).context("Failed to write manifest")?;
        eprintln!("Wrote {n} entries to {}", manifest.display());
    }

    Ok(())
}
