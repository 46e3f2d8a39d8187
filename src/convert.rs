//! Batch conversion: the Extractor.
//!
//! [`Extractor::convert`] handles one file end to end; [`Extractor::run`]
//! walks the input directory and calls it for each entry, one at a time.
//! A per-file failure is logged, reported and recorded, never propagated:
//! only problems that stop the batch from starting at all are returned as
//! `Err`.
//!
//! The presence of the output file is the whole cache. There is no
//! invalidation; delete an output file to have it regenerated.

use crate::config::ExtractorConfig;
use crate::error::{Exam2JsonError, FileError};
use crate::output::{BatchReport, FileOutcome, FileReport};
use crate::pipeline::{input, llm, persist};
use crate::progress::{BatchProgressCallback, NoopProgressCallback};
use crate::schema::ExamCollection;
use crate::service::ExtractionService;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Number of questions previewed in the debug log after a conversion.
const PREVIEW_QUESTIONS: usize = 2;
const PREVIEW_QUESTION_CHARS: usize = 30;

/// Converts exam PDFs into validated JSON files.
pub struct Extractor {
    config: ExtractorConfig,
    service: Arc<dyn ExtractionService>,
    progress: Arc<dyn BatchProgressCallback>,
}

impl Extractor {
    /// Create an Extractor, resolving the extraction service up front so a
    /// missing API key fails before any file is touched.
    pub fn new(config: ExtractorConfig) -> Result<Self, Exam2JsonError> {
        let service = config.resolve_service()?;
        let progress = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));
        info!(
            "Extractor ready: {} → {} using {} ({})",
            config.input_dir.display(),
            config.output_dir.display(),
            service.name(),
            service.model()
        );
        Ok(Self {
            config,
            service,
            progress,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Output path for `input` under the configured output directory.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        input::output_path_for(input, &self.config.output_dir, &self.config.output_suffix)
    }

    /// Convert every entry of the input directory, sequentially.
    ///
    /// # Errors
    /// Only fatal errors: the output directory cannot be created or the input
    /// directory cannot be listed. Per-file failures are in the report.
    pub async fn run(&self) -> Result<BatchReport, Exam2JsonError> {
        let start = Instant::now();

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| Exam2JsonError::OutputDirCreateFailed {
                path: self.config.output_dir.clone(),
                source,
            })?;

        let inputs = input::list_entries(&self.config.input_dir, self.config.sort_inputs).await?;
        let total = inputs.len();
        info!("Found {} input files in {}", total, self.config.input_dir.display());
        self.progress.on_batch_start(total);

        let mut files = Vec::with_capacity(total);
        for (i, path) in inputs.into_iter().enumerate() {
            let index = i + 1;
            info!("Processing {}/{}: {}", index, total, path.display());
            self.progress.on_file_start(index, total, &path);

            let file_start = Instant::now();
            let outcome = self.convert(&path).await;
            self.report(index, total, &outcome);

            files.push(FileReport {
                index,
                input: path,
                outcome,
                duration_ms: file_start.elapsed().as_millis() as u64,
            });
        }

        let report = BatchReport {
            files,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Batch complete: {} converted, {} skipped, {} failed in {}ms",
            report.converted(),
            report.skipped(),
            report.failed(),
            report.total_duration_ms
        );
        self.progress
            .on_batch_complete(report.converted(), report.skipped(), report.failed());
        Ok(report)
    }

    /// Convert a single input file.
    ///
    /// Never returns an error: failures are folded into
    /// [`FileOutcome::Failed`] and logged here.
    pub async fn convert(&self, path: &Path) -> FileOutcome {
        match self.try_convert(path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{}: {}", path.display(), e);
                FileOutcome::Failed(e)
            }
        }
    }

    async fn try_convert(&self, path: &Path) -> Result<FileOutcome, FileError> {
        let input_exists =
            tokio::fs::try_exists(path)
                .await
                .map_err(|source| FileError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                })?;
        if !input_exists {
            return Err(FileError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        // An output path that cannot be checked fails before the remote call.
        let output = self.output_path_for(path);
        let output_exists =
            tokio::fs::try_exists(&output)
                .await
                .map_err(|source| FileError::OutputWriteFailed {
                    path: output.clone(),
                    source,
                })?;
        if output_exists {
            info!("Output {} already exists, skipping", output.display());
            return Ok(FileOutcome::Skipped { output });
        }

        let file_name = input::file_name(path);
        let bytes = input::read_document(path).await?;
        let request = llm::build_request(&file_name, &bytes);
        drop(bytes);

        info!(
            "{}: asking {} to extract questions (this can take minutes)",
            file_name,
            self.service.model()
        );
        let collection = llm::extract_collection(self.service.as_ref(), path, &request).await?;
        log_preview(&file_name, &collection);

        persist::write_collection(&output, &collection).await?;
        info!(
            "{}: {} records saved to {}",
            file_name,
            collection.len(),
            output.display()
        );

        Ok(FileOutcome::Converted {
            output,
            records: collection.len(),
        })
    }

    fn report(&self, index: usize, total: usize, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Converted { output, records } => {
                self.progress.on_file_converted(index, total, output, *records)
            }
            FileOutcome::Skipped { output } => self.progress.on_file_skipped(index, total, output),
            FileOutcome::Failed(e) => {
                self.progress
                    .on_file_error(index, total, e.kind(), &e.to_string())
            }
        }
    }
}

/// Convert a whole directory with the given configuration.
///
/// Shorthand for `Extractor::new(config)?.run().await`.
pub async fn convert_dir(config: ExtractorConfig) -> Result<BatchReport, Exam2JsonError> {
    Extractor::new(config)?.run().await
}

fn log_preview(file_name: &str, collection: &ExamCollection) {
    for record in collection.problems.iter().take(PREVIEW_QUESTIONS) {
        let snippet: String = record.question.chars().take(PREVIEW_QUESTION_CHARS).collect();
        debug!(
            "{}: question {}: {}… → answer {}",
            file_name, record.number, snippet, record.answer
        );
    }
}
