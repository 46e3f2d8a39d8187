//! # exam2json
//!
//! Batch-convert scanned exam PDFs into structured JSON question sets using a
//! structured-output LLM.
//!
//! Each PDF is sent as-is to the model together with an instruction and a
//! JSON Schema. The returned JSON is parsed, validated field by field and
//! written next to its siblings as `<stem>_structured_output.json`. Files
//! whose output already exists are skipped, so a batch can be re-run after
//! failures without redoing finished work.
//!
//! ## Pipeline Overview
//!
//! ```text
//! pdfs/examA.pdf
//!  │
//!  ├─ 1. Skip    output exists? → done
//!  ├─ 2. Read    raw PDF bytes
//!  ├─ 3. Encode  base64 inline document
//!  ├─ 4. Call    one generateContent request (instruction + schema)
//!  ├─ 5. Check   JSON decode, schema validation with field paths
//!  └─ 6. Write   json/examA_structured_output.json (atomic, no clobber)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exam2json::{Extractor, ExtractorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key taken from GOOGLE_API_KEY / GEMINI_API_KEY
//!     let config = ExtractorConfig::builder()
//!         .input_dir("./pdfs")
//!         .output_dir("./json")
//!         .build()?;
//!     let report = Extractor::new(config)?.run().await?;
//!     eprintln!(
//!         "{} converted, {} skipped, {} failed",
//!         report.converted(),
//!         report.skipped(),
//!         report.failed()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `exam2json` and `inspect-outputs` binaries |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod inspect;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorConfig, ExtractorConfigBuilder};
pub use convert::{convert_dir, Extractor};
pub use error::{Exam2JsonError, FileError, InspectError, SchemaViolation, ServiceError};
pub use inspect::{summarize, summarize_dir, write_manifest, SummaryLine, MANIFEST_FILE_NAME};
pub use output::{BatchReport, BatchSummary, FileOutcome, FileReport};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use schema::{validate, ExamCollection, ExamRecord, OptionSet, Subject};
pub use service::{ExtractionRequest, ExtractionService, GeminiService};
