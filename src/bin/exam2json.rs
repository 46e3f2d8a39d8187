//! CLI binary for the exam2json Extractor.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractorConfig` and prints per-file results.

use anyhow::{Context, Result};
use clap::Parser;
use exam2json::{BatchProgressCallback, Extractor, ExtractorConfig, GeminiService, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar over the files of the batch
/// plus one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the file currently being processed.
    file_start: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            file_start: Mutex::new(None),
        })
    }

    fn elapsed(&self) -> String {
        let secs = self
            .file_start
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} input files"))
        ));
    }

    fn on_file_start(&self, index: usize, total: usize, input: &Path) {
        if let Ok(mut t) = self.file_start.lock() {
            *t = Some(Instant::now());
        }
        self.bar
            .set_message(format!("{index}/{total} {}", display_name(input)));
    }

    fn on_file_skipped(&self, index: usize, total: usize, output: &Path) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            dim("↷"),
            index,
            total,
            dim(&format!("{} exists, skipped", display_name(output))),
            self.elapsed(),
        ));
        self.bar.inc(1);
    }

    fn on_file_converted(&self, index: usize, total: usize, output: &Path, records: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<8}  {}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{records:>3} records")),
            display_name(output),
            self.elapsed(),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, kind: &str, error: &str) {
        // Keep the bar tidy; the full error is in the log and the JSON report.
        let first_line = error.lines().next().unwrap_or_default();
        let msg: String = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            red(kind),
            msg,
            self.elapsed(),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, converted: usize, skipped: usize, failed: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} converted, {} skipped, {} failed",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&converted.to_string()),
            skipped,
            if failed == 0 {
                failed.to_string()
            } else {
                red(&failed.to_string())
            },
        );
    }
}

/// Plain-text callback used with `--no-progress`: one line per event.
struct PlainProgressCallback;

impl BatchProgressCallback for PlainProgressCallback {
    fn on_file_start(&self, index: usize, total: usize, input: &Path) {
        eprintln!("Processing {index}/{total}: {}", input.display());
    }

    fn on_file_skipped(&self, _index: usize, _total: usize, output: &Path) {
        eprintln!("  output {} already exists - skipped", output.display());
    }

    fn on_file_converted(&self, _index: usize, _total: usize, output: &Path, records: usize) {
        eprintln!("  {records} records saved to {}", output.display());
    }

    fn on_file_error(&self, _index: usize, _total: usize, kind: &str, error: &str) {
        eprintln!("  {kind}: {error}");
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF in ./pdfs into ./json (skips files already converted)
  exam2json

  # Custom directories and a stronger model
  exam2json --input-dir scans --output-dir out --model gemini-2.5-flash

  # Machine-readable batch summary
  exam2json --json > report.json

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY / GEMINI_API_KEY   Gemini API key
  EXAM2JSON_INPUT_DIR               Input directory (default ./pdfs)
  EXAM2JSON_OUTPUT_DIR              Output directory (default ./json)
  EXAM2JSON_MODEL                   Model ID (default gemini-2.5-flash-lite)
  RUST_LOG                          Log filter, overrides -v / -q

Output files are named <input-stem>_structured_output.json. Delete an output
file to have its PDF converted again on the next run.
"#;

/// Convert scanned exam PDFs into validated JSON question sets.
#[derive(Parser, Debug)]
#[command(
    name = "exam2json",
    version,
    about = "Convert scanned exam PDFs into validated JSON question sets",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the exam PDFs.
    #[arg(long, env = "EXAM2JSON_INPUT_DIR", default_value = "./pdfs")]
    input_dir: PathBuf,

    /// Directory receiving the JSON files (created if missing).
    #[arg(long, env = "EXAM2JSON_OUTPUT_DIR", default_value = "./json")]
    output_dir: PathBuf,

    /// Gemini model ID.
    #[arg(long, env = "EXAM2JSON_MODEL", default_value = GeminiService::DEFAULT_MODEL)]
    model: String,

    /// API base URL.
    #[arg(long, env = "EXAM2JSON_BASE_URL", default_value = GeminiService::DEFAULT_BASE_URL)]
    base_url: String,

    /// Gemini API key (falls back to GOOGLE_API_KEY / GEMINI_API_KEY).
    #[arg(long, env = "EXAM2JSON_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds (default: wait indefinitely).
    #[arg(long, env = "EXAM2JSON_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Process files in raw directory-listing order instead of by name.
    #[arg(long)]
    listing_order: bool,

    /// Print a JSON batch summary on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "EXAM2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports every file; only errors are logged
    // while it is active.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if cli.quiet {
        None
    } else if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        Some(Arc::new(PlainProgressCallback))
    };

    let config = build_config(&cli, progress)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let extractor = Extractor::new(config).context("Failed to set up extractor")?;
    let report = extractor.run().await.context("Batch failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report.summary())
            .context("Failed to serialise batch summary")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        eprintln!(
            "Done: {} converted ({} records), {} skipped, {} failed in {}ms",
            report.converted(),
            report.records(),
            report.skipped(),
            report.failed(),
            report.total_duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractorConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder()
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .model(&cli.model)
        .base_url(&cli.base_url)
        .sort_inputs(!cli.listing_order);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
